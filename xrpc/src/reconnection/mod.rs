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

//! Reconnection strategies.
//!
//! # Using Fixed Delay
//!
//! ```
//! use xrpc::reconnection::FixedDelay;
//! use std::time::Duration;
//!
//! let strategy = FixedDelay::new(Duration::from_secs(5));
//! ```
//!
//! # Disabling Reconnection
//!
//! ```
//! use xrpc::reconnection::NoReconnect;
//!
//! let strategy = NoReconnect::new();
//! ```

mod fixed;
mod no_reconnect;
mod traits;

pub use fixed::{DEFAULT_RECONNECT_DELAY, FixedDelay, FixedDelayBuilder};
pub use no_reconnect::NoReconnect;
pub use traits::{ReconnectionMetrics, ReconnectionStrategy};

use crate::transport::{Connection, Connector, TransportError};
use tracing::{info, warn};

/// Dials `connector` until it succeeds or `strategy` gives up.
///
/// # Errors
///
/// Returns the last connection error once the strategy stops retrying.
pub async fn connect_with_retry(
    connector: &dyn Connector,
    strategy: &dyn ReconnectionStrategy,
) -> Result<Box<dyn Connection>, TransportError> {
    let mut attempt = 0;
    loop {
        match connector.connect().await {
            Ok(connection) => {
                strategy.on_connected();
                if attempt > 0 {
                    info!(target_addr = connector.target(), attempt, "reconnected");
                }
                return Ok(connection);
            }
            Err(error) => {
                strategy.on_disconnected(&error);
                if !strategy.should_reconnect(attempt, &error).await {
                    warn!(
                        target_addr = connector.target(),
                        strategy = strategy.name(),
                        attempt,
                        error = %error,
                        "giving up on connection"
                    );
                    return Err(error);
                }
                let delay = strategy.next_delay(attempt).await;
                warn!(
                    target_addr = connector.target(),
                    attempt,
                    ?delay,
                    error = %error,
                    "connection attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryConnection;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Fails a fixed number of times, then hands out memory connections.
    struct Flaky {
        failures_left: AtomicU32,
    }

    #[async_trait]
    impl Connector for Flaky {
        async fn connect(&self) -> Result<Box<dyn Connection>, TransportError> {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(TransportError::connection_failed("memory://flaky"));
            }
            let (connection, _peer) = MemoryConnection::pair(1);
            Ok(Box::new(connection))
        }

        fn target(&self) -> &str {
            "memory://flaky"
        }
    }

    #[tokio::test]
    async fn test_retries_until_connected() {
        let connector = Flaky {
            failures_left: AtomicU32::new(2),
        };
        let strategy = FixedDelay::new(Duration::from_millis(1));
        connect_with_retry(&connector, &strategy).await.unwrap();

        let metrics = strategy.metrics();
        assert_eq!(metrics.failed_reconnections, 2);
        assert_eq!(metrics.successful_reconnections, 1);
    }

    #[tokio::test]
    async fn test_gives_up() {
        let connector = Flaky {
            failures_left: AtomicU32::new(5),
        };
        let err = connect_with_retry(&connector, &NoReconnect::new())
            .await
            .err()
            .expect("should give up");
        assert!(matches!(err, TransportError::ConnectionFailed { .. }));
    }

    #[test]
    fn test_strategy_names_unique() {
        assert_ne!(FixedDelay::default().name(), NoReconnect::new().name());
    }
}
