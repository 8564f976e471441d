//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Reconnection strategy trait and metrics.
//!
//! A strategy decides whether a failed connection attempt is retried and how
//! long to wait before the next one. Nodes consult it when an outbound peer
//! has to be re-dialled; the poll client consults it between failed polls.

use crate::transport::TransportError;
use async_trait::async_trait;
use std::time::Duration;

/// Pluggable policy for re-establishing connections.
///
/// # Example
///
/// ```
/// use xrpc::reconnection::{FixedDelay, ReconnectionStrategy};
/// use std::time::Duration;
///
/// let strategy = FixedDelay::builder()
///     .delay(Duration::from_millis(250))
///     .max_attempts(Some(3))
///     .build();
/// assert_eq!(strategy.name(), "FixedDelay");
/// ```
#[async_trait]
pub trait ReconnectionStrategy: Send + Sync {
    /// Determine if another attempt should be made.
    ///
    /// `attempt` counts the failed attempts so far, starting at 0.
    async fn should_reconnect(&self, attempt: u32, last_error: &TransportError) -> bool;

    /// Delay before attempt number `attempt + 1`.
    async fn next_delay(&self, attempt: u32) -> Duration;

    /// Called when a connection is established.
    fn on_connected(&self);

    /// Called when an attempt fails or an established connection drops.
    fn on_disconnected(&self, error: &TransportError);

    /// Human-readable name, used in logs.
    fn name(&self) -> &str;
}

/// Counters describing past reconnection attempts.
#[derive(Debug, Clone, Default)]
pub struct ReconnectionMetrics {
    /// Total number of connection attempts
    pub total_attempts: u64,
    /// Number of successful connections
    pub successful_reconnections: u64,
    /// Number of failed attempts
    pub failed_reconnections: u64,
    /// Failures since the last success
    pub consecutive_failures: u32,
    /// Last error encountered
    pub last_error: Option<String>,
}

impl ReconnectionMetrics {
    /// Create a new metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a connection attempt.
    pub fn record_attempt(&mut self) {
        self.total_attempts += 1;
    }

    /// Record a successful connection.
    pub fn record_success(&mut self) {
        self.successful_reconnections += 1;
        self.consecutive_failures = 0;
        self.last_error = None;
    }

    /// Record a failed attempt.
    pub fn record_failure(&mut self, error: &TransportError) {
        self.failed_reconnections += 1;
        self.consecutive_failures += 1;
        self.last_error = Some(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = ReconnectionMetrics::new();
        assert_eq!(metrics.total_attempts, 0);
        assert_eq!(metrics.successful_reconnections, 0);
        assert_eq!(metrics.failed_reconnections, 0);
        assert_eq!(metrics.consecutive_failures, 0);
        assert!(metrics.last_error.is_none());
    }

    #[test]
    fn test_metrics_success_clears_failures() {
        let mut metrics = ReconnectionMetrics::new();
        metrics.record_failure(&TransportError::connection_failed("ws://a"));
        metrics.record_failure(&TransportError::connection_failed("ws://a"));
        assert_eq!(metrics.consecutive_failures, 2);

        metrics.record_success();
        assert_eq!(metrics.successful_reconnections, 1);
        assert_eq!(metrics.consecutive_failures, 0);
        assert!(metrics.last_error.is_none());
    }
}
