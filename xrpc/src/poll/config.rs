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

//! Poll-mode configuration.

use crate::backpressure::BackpressurePolicy;
use crate::reconnection::{FixedDelay, ReconnectionStrategy};
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How long the server holds a poll open before answering 418.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(20);

/// How long a relayed call waits for the polling client's reply.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(35);

/// Calls queued per client before the backpressure policy applies.
pub const DEFAULT_QUEUE_CAPACITY: usize = 20;

/// Configuration for a [`PollServer`](super::PollServer).
///
/// # Examples
///
/// ```rust
/// use xrpc::backpressure::BackpressurePolicy;
/// use xrpc::poll::PollServerConfig;
///
/// let config = PollServerConfig::default()
///     .with_queue_capacity(5)
///     .with_backpressure(BackpressurePolicy::Reject);
/// assert_eq!(config.queue_capacity, 5);
/// ```
#[derive(Debug, Clone)]
pub struct PollServerConfig {
    /// Caller id the server uses for calls it originates.
    ///
    /// Default: `xrpc-server`
    pub server_id: String,

    /// Default: 20 seconds
    pub poll_timeout: Duration,

    /// Covers queueing the call and waiting for its reply.
    ///
    /// Default: 35 seconds
    pub reply_timeout: Duration,

    /// Default: 20
    pub queue_capacity: usize,

    /// Applied when a client's queue is full.
    ///
    /// Default: [`BackpressurePolicy::Block`]
    pub backpressure: BackpressurePolicy,

    /// Answer CORS preflights from any origin.
    ///
    /// Default: false
    pub permissive_cors: bool,
}

impl Default for PollServerConfig {
    fn default() -> Self {
        Self {
            server_id: "xrpc-server".to_string(),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            backpressure: BackpressurePolicy::default(),
            permissive_cors: false,
        }
    }
}

impl PollServerConfig {
    /// Set the server's caller id.
    pub fn with_server_id(mut self, server_id: impl Into<String>) -> Self {
        self.server_id = server_id.into();
        self
    }

    /// Set the poll timeout.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the reply timeout.
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// Set the per-client queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the backpressure policy.
    pub fn with_backpressure(mut self, policy: BackpressurePolicy) -> Self {
        self.backpressure = policy;
        self
    }

    /// Enable or disable permissive CORS.
    pub fn with_permissive_cors(mut self, enabled: bool) -> Self {
        self.permissive_cors = enabled;
        self
    }
}

/// Configuration for a [`PollClient`](super::PollClient).
#[derive(Clone)]
pub struct PollClientConfig {
    /// Identifies the client to the server; calls for this id are delivered
    /// to its polls.
    ///
    /// Default: 16 random hex digits
    pub client_id: String,

    /// HTTP timeout of one poll. Must exceed the server's poll timeout.
    ///
    /// Default: 22 seconds
    pub poll_request_timeout: Duration,

    /// HTTP timeout of a call posted to the server.
    ///
    /// Default: 35 seconds
    pub call_timeout: Duration,

    /// HTTP timeout of posting a result back.
    ///
    /// Default: 10 seconds
    pub receive_timeout: Duration,

    /// Consulted between failed polls.
    ///
    /// Default: [`FixedDelay`] of one second, retrying forever
    pub retry: Arc<dyn ReconnectionStrategy>,
}

impl Default for PollClientConfig {
    fn default() -> Self {
        Self {
            client_id: format!("{:016x}", rand::thread_rng().r#gen::<u64>()),
            poll_request_timeout: Duration::from_secs(22),
            call_timeout: Duration::from_secs(35),
            receive_timeout: Duration::from_secs(10),
            retry: Arc::new(FixedDelay::default()),
        }
    }
}

impl PollClientConfig {
    /// Set the client id.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set the poll request timeout.
    pub fn with_poll_request_timeout(mut self, timeout: Duration) -> Self {
        self.poll_request_timeout = timeout;
        self
    }

    /// Set the call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set the receive timeout.
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Set the retry strategy for failed polls.
    pub fn with_retry(mut self, strategy: Arc<dyn ReconnectionStrategy>) -> Self {
        self.retry = strategy;
        self
    }
}

impl fmt::Debug for PollClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollClientConfig")
            .field("client_id", &self.client_id)
            .field("poll_request_timeout", &self.poll_request_timeout)
            .field("call_timeout", &self.call_timeout)
            .field("receive_timeout", &self.receive_timeout)
            .field("retry", &self.retry.name())
            .finish()
    }
}
