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

//! Exchanger configuration.

use std::time::Duration;

/// Default time a caller waits for a reply.
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// How the read loop runs inbound calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InboundDispatch {
    /// One call at a time per connection, in arrival order. Replies to this
    /// side's own calls keep flowing while a handler runs, so a handler may
    /// call back over the same connection.
    #[default]
    Serial,
    /// Each inbound call runs on its own task.
    Concurrent,
}

/// Configuration for an [`Exchanger`](crate::exchanger::Exchanger).
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use xrpc::exchanger::{ExchangerConfig, InboundDispatch};
///
/// let config = ExchangerConfig::default()
///     .with_timeout(Duration::from_secs(3))
///     .with_inbound_dispatch(InboundDispatch::Concurrent);
/// assert_eq!(config.timeout, Duration::from_secs(3));
/// ```
#[derive(Debug, Clone)]
pub struct ExchangerConfig {
    /// How long [`exchange`](crate::exchanger::Exchanger::exchange) waits for a reply.
    pub timeout: Duration,
    /// How inbound calls are scheduled.
    pub inbound_dispatch: InboundDispatch,
}

impl Default for ExchangerConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_EXCHANGE_TIMEOUT,
            inbound_dispatch: InboundDispatch::Serial,
        }
    }
}

impl ExchangerConfig {
    /// Sets the reply timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the inbound dispatch mode.
    #[must_use]
    pub fn with_inbound_dispatch(mut self, inbound_dispatch: InboundDispatch) -> Self {
        self.inbound_dispatch = inbound_dispatch;
        self
    }
}
