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

//! Node configuration.

use crate::exchanger::ExchangerConfig;
use crate::reconnection::{DEFAULT_RECONNECT_DELAY, FixedDelay, ReconnectionStrategy};
#[cfg(feature = "websocket")]
use crate::transport::WebSocketConfig;
use rand::Rng;
use std::fmt;
use std::sync::Arc;

/// Consecutive failed dials after which a lazy reconnect gives up and the
/// call fails.
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 3;

/// Configuration for a [`Node`](super::Node).
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use xrpc::exchanger::ExchangerConfig;
/// use xrpc::node::NodeConfig;
///
/// let config = NodeConfig::default()
///     .with_node_id("billing")
///     .with_exchanger(ExchangerConfig::default().with_timeout(Duration::from_secs(3)));
/// assert_eq!(config.node_id, "billing");
/// ```
#[derive(Clone)]
pub struct NodeConfig {
    /// Identifies this node to its peers. Sent as the caller id of every call
    /// and announced when dialling a WebSocket peer.
    ///
    /// Default: `node-` followed by a random hex suffix
    pub node_id: String,

    /// Applied to every exchanger the node creates.
    pub exchanger: ExchangerConfig,

    /// Used by [`Node::serve`](super::Node::serve) and
    /// [`Node::connect`](super::Node::connect).
    #[cfg(feature = "websocket")]
    pub websocket: WebSocketConfig,

    /// Governs re-dialling outbound peers whose connection dropped.
    ///
    /// Default: [`FixedDelay`] of one second, giving up after
    /// [`DEFAULT_RECONNECT_ATTEMPTS`] failures
    pub reconnection: Arc<dyn ReconnectionStrategy>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: format!("node-{:012x}", rand::thread_rng().gen_range(0..1u64 << 48)),
            exchanger: ExchangerConfig::default(),
            #[cfg(feature = "websocket")]
            websocket: WebSocketConfig::default(),
            reconnection: Arc::new(
                FixedDelay::builder()
                    .delay(DEFAULT_RECONNECT_DELAY)
                    .max_attempts(Some(DEFAULT_RECONNECT_ATTEMPTS))
                    .build(),
            ),
        }
    }
}

impl NodeConfig {
    /// Set the node id.
    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = node_id.into();
        self
    }

    /// Set the exchanger configuration.
    pub fn with_exchanger(mut self, exchanger: ExchangerConfig) -> Self {
        self.exchanger = exchanger;
        self
    }

    /// Set the WebSocket configuration.
    #[cfg(feature = "websocket")]
    pub fn with_websocket(mut self, websocket: WebSocketConfig) -> Self {
        self.websocket = websocket;
        self
    }

    /// Set the reconnection strategy.
    pub fn with_reconnection(mut self, strategy: Arc<dyn ReconnectionStrategy>) -> Self {
        self.reconnection = strategy;
        self
    }
}

impl fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeConfig")
            .field("node_id", &self.node_id)
            .field("exchanger", &self.exchanger)
            .field("reconnection", &self.reconnection.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_node_ids_differ() {
        let a = NodeConfig::default();
        let b = NodeConfig::default();
        assert!(a.node_id.starts_with("node-"));
        assert_ne!(a.node_id, b.node_id);
        assert_eq!(a.reconnection.name(), "FixedDelay");
    }
}
