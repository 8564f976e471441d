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

use crate::error::XrpcError;
use crate::exchanger::Exchanger;
use crate::executor::Executor;
use crate::node::NodeConfig;
use crate::node::peers::{PeerTable, Upstream};
#[cfg(feature = "websocket")]
use crate::transport::{WebSocketConnector, WebSocketListener};
use crate::transport::{Connection, Connector};
use crate::wire::{CallPayload, CallerInfo, ReplyPayload};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
#[cfg(feature = "websocket")]
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Invoked with the peer id when a peer rejects this node's token.
pub type AuthenticationFailedHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Per-call overrides for [`Node::call_with`].
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Token to send instead of the node's stored token.
    pub token: Option<String>,

    /// Execution deadline the remote executor applies to the handler.
    pub time_to_live: Option<Duration>,

    /// How long to wait for the reply, instead of the exchanger's timeout.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    /// Set the token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the remote execution deadline.
    pub fn with_time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    /// Set the reply timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// One participant in a mesh of peers that call each other.
///
/// A node owns an [`Executor`] that answers calls from any peer, and a table
/// of exchangers through which it originates calls. The role split between
/// client and server only concerns who dials: once connected, both ends call
/// and answer over the same connection.
///
/// - [`serve`](Self::serve) accepts WebSocket peers, registered under the id
///   they announce
/// - [`connect`](Self::connect) dials a peer and registers it under a chosen
///   id; if the connection drops it is re-dialled on the next call
/// - [`add_peer_connection`](Self::add_peer_connection) registers any
///   [`Connection`], e.g. one half of an in-memory pair
///
/// When both an inbound and an upstream entry exist for the same id, calls go
/// to the inbound one.
///
/// Cloning a node yields another handle to the same node.
///
/// # Example
///
/// ```rust
/// use xrpc::executor::Executor;
/// use xrpc::node::{Node, NodeConfig};
/// use xrpc::registry::{MethodDescriptor, Registry};
/// use xrpc::transport::MemoryConnection;
/// use xrpc::CallerInfo;
///
/// # async fn example() -> Result<(), xrpc::XrpcError> {
/// let registry = Registry::new();
/// registry.register_method(MethodDescriptor::new(
///     "Calc.Double",
///     |_: CallerInfo, x: i64| async move { Ok::<_, String>(x * 2) },
/// ))?;
/// let server = Node::with_config(
///     Executor::new(registry),
///     NodeConfig::default().with_node_id("server"),
/// );
/// let client = Node::with_config(
///     Executor::new(Registry::new()),
///     NodeConfig::default().with_node_id("client"),
/// );
///
/// let (a, b) = MemoryConnection::pair_default();
/// client.add_peer_connection("server", Box::new(a));
/// server.add_peer_connection("client", Box::new(b));
///
/// let doubled: i64 = client.call("server", "Calc.Double", &21).await?;
/// assert_eq!(doubled, 42);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

struct NodeInner {
    config: NodeConfig,
    executor: Executor,
    peers: PeerTable,
    token: RwLock<String>,
    on_authentication_failed: RwLock<Option<AuthenticationFailedHandler>>,
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

impl Node {
    /// Creates a node with the default configuration.
    pub fn new(executor: Executor) -> Self {
        Self::with_config(executor, NodeConfig::default())
    }

    /// Creates a node with a custom configuration.
    pub fn with_config(executor: Executor, config: NodeConfig) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                config,
                executor,
                peers: PeerTable::default(),
                token: RwLock::new(String::new()),
                on_authentication_failed: RwLock::new(None),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// This node's id.
    pub fn id(&self) -> &str {
        &self.inner.config.node_id
    }

    /// The configuration this node was built with.
    pub fn config(&self) -> &NodeConfig {
        &self.inner.config
    }

    /// The executor answering inbound calls.
    pub fn executor(&self) -> &Executor {
        &self.inner.executor
    }

    /// Sets the token sent with every call.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.inner.token.write() = token.into();
    }

    /// The token sent with every call. Empty if none is set.
    pub fn token(&self) -> String {
        self.inner.token.read().clone()
    }

    /// Installs a callback for replies flagged `AuthenticationInvalid`.
    ///
    /// Before the callback runs, the stored token is cleared so that a stale
    /// token is not sent again.
    pub fn on_authentication_failed<F>(&self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *self.inner.on_authentication_failed.write() = Some(Arc::new(handler));
    }

    /// Accepts WebSocket peers on `addr` until [`shutdown`](Self::shutdown).
    ///
    /// Each peer is registered under the id it announces in the
    /// [`PEER_ID_HEADER`](crate::transport::PEER_ID_HEADER) header or `?id=`
    /// query; peers that announce nothing get a generated id.
    ///
    /// Returns the bound address, useful with port `0`.
    ///
    /// # Errors
    ///
    /// Fails if the address cannot be bound.
    #[cfg(feature = "websocket")]
    pub async fn serve(&self, addr: &str) -> Result<SocketAddr, XrpcError> {
        let listener = WebSocketListener::bind(addr, self.inner.config.websocket.clone()).await?;
        let local_addr = listener.local_addr()?;
        let node = Arc::downgrade(&self.inner);

        let task = tokio::spawn(accept_loop(listener, node));
        self.inner.listeners.lock().push(task);
        info!(node_id = %self.id(), %local_addr, "serving websocket peers");
        Ok(local_addr)
    }

    /// Registers an established connection to `peer_id` and starts answering
    /// its calls.
    ///
    /// An existing inbound entry for the same id is replaced and closed.
    pub fn add_peer_connection(&self, peer_id: &str, connection: Box<dyn Connection>) -> Exchanger {
        self.inner.add_inbound(peer_id, connection)
    }

    /// Dials `url` and registers the connection as upstream peer `peer_id`,
    /// announcing this node's id.
    ///
    /// # Errors
    ///
    /// Fails once the reconnection strategy gives up on the first dial.
    #[cfg(feature = "websocket")]
    pub async fn connect(&self, peer_id: &str, url: &str) -> Result<(), XrpcError> {
        let connector = WebSocketConnector::new(
            url,
            self.id(),
            self.inner.config.websocket.clone(),
        );
        self.connect_with(peer_id, Arc::new(connector)).await
    }

    /// Like [`connect`](Self::connect) with any [`Connector`].
    ///
    /// # Errors
    ///
    /// Fails once the reconnection strategy gives up on the first dial.
    pub async fn connect_with(
        &self,
        peer_id: &str,
        connector: Arc<dyn Connector>,
    ) -> Result<(), XrpcError> {
        let upstream = Arc::new(Upstream::new(connector));
        if let Some(previous) = self.inner.peers.insert_upstream(peer_id, upstream.clone()) {
            previous.close().await;
        }
        self.inner.upstream_exchanger(peer_id, &upstream).await?;
        info!(node_id = %self.id(), peer_id, target_addr = upstream.target(), "connected to peer");
        Ok(())
    }

    /// Returns the exchanger calls to `peer_id` would use, re-dialling an
    /// upstream peer if its connection dropped.
    ///
    /// # Errors
    ///
    /// [`XrpcError::UnknownPeer`] if no entry exists, or the dial error.
    pub async fn exchanger(&self, peer_id: &str) -> Result<Exchanger, XrpcError> {
        if let Some(exchanger) = self.inner.peers.inbound(peer_id) {
            return Ok(exchanger);
        }
        match self.inner.peers.upstream(peer_id) {
            Some(upstream) => Ok(self.inner.upstream_exchanger(peer_id, &upstream).await?),
            None => Err(XrpcError::UnknownPeer(peer_id.to_string())),
        }
    }

    /// Calls `method` on `peer_id` and decodes its result.
    ///
    /// # Errors
    ///
    /// [`XrpcError::Business`] if the handler failed; any other variant if
    /// the call could not be delivered or dispatched.
    pub async fn call<A, R>(&self, peer_id: &str, method: &str, args: &A) -> Result<R, XrpcError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call_with(peer_id, method, args, CallOptions::default())
            .await
    }

    /// Like [`call`](Self::call) with per-call options.
    ///
    /// # Errors
    ///
    /// See [`call`](Self::call).
    pub async fn call_with<A, R>(
        &self,
        peer_id: &str,
        method: &str,
        args: &A,
        options: CallOptions,
    ) -> Result<R, XrpcError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let token = options.token.unwrap_or_else(|| self.token());
        let mut caller_info = CallerInfo::new(self.id()).with_token(token);
        if let Some(ttl) = options.time_to_live {
            caller_info = caller_info.with_time_to_live(ttl);
        }
        let request = serde_json::to_vec(&CallPayload::new(caller_info, method, args)?)?;

        let exchanger = self.exchanger(peer_id).await?;

        let response = match options.timeout {
            Some(timeout) => exchanger.exchange_with_timeout(&request, timeout).await?,
            None => exchanger.exchange(&request).await?,
        };
        let reply: ReplyPayload = serde_json::from_slice(&response)?;
        if reply.authentication_invalid {
            self.inner.authentication_failed(peer_id);
        }
        reply.into_result()
    }

    /// Sorted ids of every registered peer.
    pub fn peer_ids(&self) -> Vec<String> {
        self.inner.peers.ids()
    }

    /// Returns `true` if calls to `peer_id` can currently be routed without
    /// dialling.
    pub fn is_connected(&self, peer_id: &str) -> bool {
        self.inner.peers.inbound(peer_id).is_some()
            || self
                .inner
                .peers
                .upstream(peer_id)
                .and_then(|u| u.current())
                .is_some()
    }

    /// Forgets `peer_id` and closes its connections.
    ///
    /// Returns `false` if the peer was unknown.
    pub async fn disconnect(&self, peer_id: &str) -> bool {
        let (inbound, upstream) = self.inner.peers.remove(peer_id);
        let known = inbound.is_some() || upstream.is_some();
        if let Some(exchanger) = inbound {
            exchanger.close().await;
        }
        if let Some(upstream) = upstream {
            upstream.close().await;
        }
        if known {
            info!(node_id = %self.id(), peer_id, "peer disconnected");
        }
        known
    }

    /// Stops accepting peers and closes every connection.
    pub async fn shutdown(&self) {
        for task in self.inner.listeners.lock().drain(..) {
            task.abort();
        }
        let (inbound, upstreams) = self.inner.peers.drain();
        for exchanger in inbound {
            exchanger.close().await;
        }
        for upstream in upstreams {
            upstream.close().await;
        }
        info!(node_id = %self.id(), "node shut down");
    }
}

impl NodeInner {
    fn attach(self: &Arc<Self>, connection: Box<dyn Connection>) -> Exchanger {
        let exchanger = Exchanger::new(connection, self.config.exchanger.clone());
        self.executor.attach(&exchanger);
        exchanger
    }

    fn add_inbound(self: &Arc<Self>, peer_id: &str, connection: Box<dyn Connection>) -> Exchanger {
        let exchanger = self.attach(connection);

        let node: Weak<NodeInner> = Arc::downgrade(self);
        let id = peer_id.to_string();
        exchanger.set_disconnect_handler(move |metadata, error| {
            if let Some(node) = node.upgrade() {
                if node.peers.remove_inbound_if(&id, metadata.id) {
                    info!(node_id = %node.config.node_id, peer_id = %id, %error, "inbound peer dropped");
                }
            }
        });

        if let Some(previous) = self.peers.insert_inbound(peer_id, exchanger.clone()) {
            debug!(peer_id, "replacing inbound peer connection");
            tokio::spawn(async move { previous.close().await });
        }
        debug!(node_id = %self.config.node_id, peer_id, transport = %exchanger.metadata().id, "peer added");
        exchanger
    }

    async fn upstream_exchanger(
        self: &Arc<Self>,
        peer_id: &str,
        upstream: &Upstream,
    ) -> Result<Exchanger, XrpcError> {
        let exchanger = upstream
            .exchanger(self.config.reconnection.as_ref(), |connection| {
                let exchanger = self.attach(connection);
                let id = peer_id.to_string();
                exchanger.set_disconnect_handler(move |_, error| {
                    info!(peer_id = %id, %error, "upstream peer dropped, will re-dial on next call");
                });
                exchanger
            })
            .await?;
        Ok(exchanger)
    }

    fn authentication_failed(&self, peer_id: &str) {
        warn!(node_id = %self.config.node_id, peer_id, "peer rejected our token");
        self.token.write().clear();
        let handler = self.on_authentication_failed.read().clone();
        if let Some(handler) = handler {
            handler(peer_id);
        }
    }
}

#[cfg(feature = "websocket")]
async fn accept_loop(listener: WebSocketListener, node: Weak<NodeInner>) {
    loop {
        let accepted = listener.accept_pending().await;
        let Some(inner) = node.upgrade() else {
            return;
        };
        match accepted {
            Ok(pending) => {
                // Upgrades run on their own task so a silent client cannot
                // hold up the next accept.
                let node = node.clone();
                tokio::spawn(async move {
                    let peer_addr = pending.peer_addr();
                    match pending.handshake().await {
                        Ok(connection) => {
                            let Some(inner) = node.upgrade() else {
                                return;
                            };
                            let peer_id = connection.metadata().peer_id.clone().unwrap_or_else(
                                || format!("anonymous-{}", connection.metadata().id.as_u64()),
                            );
                            inner.add_inbound(&peer_id, Box::new(connection));
                        }
                        Err(e) => {
                            warn!(%peer_addr, error = %e, "websocket handshake failed");
                        }
                    }
                });
            }
            Err(e) => {
                warn!(node_id = %inner.config.node_id, error = %e, "failed to accept peer");
            }
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id())
            .field("peers", &self.peer_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::StaticTokens;
    use crate::registry::{MethodDescriptor, Registry};
    use crate::transport::{MemoryConnection, TransportError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn echo_executor() -> Executor {
        let registry = Registry::new();
        registry
            .register_method(MethodDescriptor::new(
                "Echo.Say",
                |info: CallerInfo, text: String| async move {
                    Ok::<_, String>(format!("{}: {}", info.caller_id, text))
                },
            ))
            .unwrap();
        Executor::new(registry)
    }

    fn node(id: &str, executor: Executor) -> Node {
        Node::with_config(executor, NodeConfig::default().with_node_id(id))
    }

    fn link(a: &Node, b: &Node) {
        let (left, right) = MemoryConnection::pair_default();
        a.add_peer_connection(b.id(), Box::new(left));
        b.add_peer_connection(a.id(), Box::new(right));
    }

    #[tokio::test]
    async fn test_calls_both_directions() {
        let server = node("server", echo_executor());
        let client = node("client", echo_executor());
        link(&server, &client);

        let reply: String = client.call("server", "Echo.Say", "hi").await.unwrap();
        assert_eq!(reply, "client: hi");
        let reply: String = server.call("client", "Echo.Say", "yo").await.unwrap();
        assert_eq!(reply, "server: yo");
    }

    #[tokio::test]
    async fn test_unknown_peer() {
        let client = node("client", echo_executor());
        let err = client.call::<_, String>("nobody", "Echo.Say", "x").await.unwrap_err();
        assert!(matches!(err, XrpcError::UnknownPeer(ref id) if id == "nobody"));
        assert!(err.is_transport_error());
    }

    #[tokio::test]
    async fn test_dropped_inbound_peer_is_removed() {
        let server = node("server", echo_executor());
        let (left, right) = MemoryConnection::pair_default();
        server.add_peer_connection("client", Box::new(left));
        assert_eq!(server.peer_ids(), vec!["client".to_string()]);

        drop(right);
        for _ in 0..100 {
            if server.peer_ids().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(server.peer_ids().is_empty());
    }

    #[tokio::test]
    async fn test_authentication_failure_clears_token() {
        let server = node(
            "server",
            echo_executor().with_authenticator(StaticTokens::new(["good"])),
        );
        let client = node("client", echo_executor());
        link(&server, &client);

        let failures = Arc::new(AtomicUsize::new(0));
        let counter = failures.clone();
        client.on_authentication_failed(move |peer| {
            assert_eq!(peer, "server");
            counter.fetch_add(1, Ordering::SeqCst);
        });

        client.set_token("bad");
        let err = client.call::<_, String>("server", "Echo.Say", "x").await.unwrap_err();
        assert!(err.is_authentication_invalid());
        assert_eq!(failures.load(Ordering::SeqCst), 1);
        assert!(client.token().is_empty());

        let options = CallOptions::default().with_token("good");
        let reply: String = client
            .call_with("server", "Echo.Say", "x", options)
            .await
            .unwrap();
        assert_eq!(reply, "client: x");
    }

    /// Hands out one half of a fresh memory pair per dial and keeps the other
    /// half attached to a serving node.
    struct MemoryDialer {
        server: Node,
        dials: AtomicUsize,
    }

    #[async_trait]
    impl Connector for MemoryDialer {
        async fn connect(&self) -> Result<Box<dyn Connection>, TransportError> {
            let n = self.dials.fetch_add(1, Ordering::SeqCst);
            let (left, right) = MemoryConnection::pair_default();
            self.server
                .add_peer_connection(&format!("dialer-{n}"), Box::new(right));
            Ok(Box::new(left))
        }

        fn target(&self) -> &str {
            "memory://server"
        }
    }

    #[tokio::test]
    async fn test_upstream_redialled_after_drop() {
        let server = node("server", echo_executor());
        let client = node("client", echo_executor());
        let dialer = Arc::new(MemoryDialer {
            server: server.clone(),
            dials: AtomicUsize::new(0),
        });

        client.connect_with("server", dialer.clone()).await.unwrap();
        let reply: String = client.call("server", "Echo.Say", "one").await.unwrap();
        assert_eq!(reply, "client: one");

        assert!(server.disconnect("dialer-0").await);
        for _ in 0..100 {
            if !client.is_connected("server") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let reply: String = client.call("server", "Echo.Say", "two").await.unwrap();
        assert_eq!(reply, "client: two");
        assert_eq!(dialer.dials.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shutdown_forgets_peers() {
        let server = node("server", echo_executor());
        let client = node("client", echo_executor());
        link(&server, &client);

        server.shutdown().await;
        assert!(server.peer_ids().is_empty());
        assert!(server.call::<_, String>("client", "Echo.Say", "x").await.is_err());
    }
}
