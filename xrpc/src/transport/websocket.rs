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

//! WebSocket connections.
//!
//! Frames travel as binary WebSocket messages, one frame per message. A
//! connecting client announces its peer id in the [`PEER_ID_HEADER`] request
//! header (or, for clients that cannot set headers, in an `id` query
//! parameter); the listener records it in the accepted connection's
//! [`TransportMetadata::peer_id`].
//!
//! # Examples
//!
//! ## Client
//!
//! ```rust,no_run
//! use xrpc::transport::{Connector, WebSocketConfig, WebSocketConnector};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let connector = WebSocketConnector::new("ws://localhost:8080/xrpc", "client-1", WebSocketConfig::default());
//! let connection = connector.connect().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Listener
//!
//! ```rust,no_run
//! use xrpc::transport::{Connection, WebSocketConfig, WebSocketListener};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let listener = WebSocketListener::bind("127.0.0.1:8080", WebSocketConfig::default()).await?;
//!
//! loop {
//!     let connection = listener.accept().await?;
//!     println!("peer {:?} connected", connection.metadata().peer_id);
//! }
//! # }
//! ```

use crate::transport::{
    Connection, Connector, FrameReader, FrameWriter, TransportError, TransportId,
    TransportMetadata,
};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig as TungsteniteConfig;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, accept_hdr_async_with_config, connect_async_with_config,
    tungstenite::Message,
};
use tracing::{debug, warn};

/// Request header carrying the connecting peer's id.
pub const PEER_ID_HEADER: &str = "X-Xrpc-Peer-Id";

/// Configuration for WebSocket connections.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Maximum size of a single WebSocket frame (default: 16 MB)
    pub max_frame_size: usize,

    /// Maximum size of a complete message (default: 64 MB)
    pub max_message_size: usize,

    /// Time allowed for the TCP connect plus handshake (default: 10s)
    pub connect_timeout: Duration,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_frame_size: 16 * 1024 * 1024,
            max_message_size: 64 * 1024 * 1024,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl WebSocketConfig {
    fn protocol_config(&self) -> TungsteniteConfig {
        let mut config = TungsteniteConfig::default();
        config.max_frame_size = Some(self.max_frame_size);
        config.max_message_size = Some(self.max_message_size);
        config
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An established WebSocket connection.
#[derive(Debug)]
pub struct WebSocketConnection {
    stream: WsStream,
    metadata: TransportMetadata,
}

impl WebSocketConnection {
    fn new(stream: WsStream, peer_id: Option<String>) -> Self {
        let mut metadata = TransportMetadata::new(TransportId::next(), "websocket");
        if let MaybeTlsStream::Plain(tcp) = stream.get_ref() {
            if let Ok(addr) = tcp.peer_addr() {
                metadata = metadata.with_peer_addr(addr);
            }
            if let Ok(addr) = tcp.local_addr() {
                metadata = metadata.with_local_addr(addr);
            }
        }
        if let Some(peer_id) = peer_id {
            metadata = metadata.with_peer_id(peer_id);
        }
        Self { stream, metadata }
    }

    /// Dials `url`, announcing `peer_id` in the handshake.
    ///
    /// # Errors
    ///
    /// Fails if the URL is invalid, the peer id is not a valid header value,
    /// the handshake fails, or it does not finish within
    /// [`WebSocketConfig::connect_timeout`].
    pub async fn connect(
        url: &str,
        peer_id: &str,
        config: &WebSocketConfig,
    ) -> Result<Self, TransportError> {
        let mut request = url.into_client_request()?;
        if !peer_id.is_empty() {
            let value =
                HeaderValue::from_str(peer_id).map_err(|e| TransportError::InvalidConfiguration {
                    reason: format!("peer id {peer_id:?} is not a valid header value: {e}"),
                })?;
            request.headers_mut().insert(PEER_ID_HEADER, value);
        }

        let handshake =
            connect_async_with_config(request, Some(config.protocol_config()), true);
        let (stream, _response) = tokio::time::timeout(config.connect_timeout, handshake)
            .await
            .map_err(|_| TransportError::Timeout {
                duration: config.connect_timeout,
            })?
            .map_err(|e| TransportError::ConnectionFailed {
                address: url.to_string(),
                reason: e.to_string(),
            })?;

        debug!(url, peer_id, "websocket connected");
        Ok(Self::new(stream, None))
    }
}

impl Connection for WebSocketConnection {
    fn metadata(&self) -> &TransportMetadata {
        &self.metadata
    }

    fn split(self: Box<Self>) -> (Box<dyn FrameReader>, Box<dyn FrameWriter>) {
        let (sink, stream) = self.stream.split();
        (
            Box::new(WebSocketReader { stream }),
            Box::new(WebSocketWriter { sink }),
        )
    }
}

struct WebSocketReader {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl FrameReader for WebSocketReader {
    async fn read_frame(&mut self) -> Result<Vec<u8>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(data),
                // Pongs are queued by tungstenite and flushed with the next write.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Text(text))) => {
                    warn!(len = text.len(), "ignoring text message on binary connection");
                }
                Some(Ok(Message::Close(_))) => {
                    return Err(TransportError::ConnectionLost {
                        reason: "peer closed connection".to_string(),
                        source: None,
                    });
                }
                Some(Err(e)) => return Err(TransportError::WebSocket(e)),
                None => {
                    return Err(TransportError::ConnectionLost {
                        reason: "stream closed".to_string(),
                        source: None,
                    });
                }
            }
        }
    }
}

struct WebSocketWriter {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameWriter for WebSocketWriter {
    async fn write_frame(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        self.sink.send(Message::Binary(frame)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sink.close().await?;
        Ok(())
    }
}

/// Listens for incoming WebSocket connections.
pub struct WebSocketListener {
    listener: TcpListener,
    config: WebSocketConfig,
}

impl WebSocketListener {
    /// Binds to a local address.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::BindFailed`] if the address is unavailable.
    pub async fn bind(
        addr: impl Into<String>,
        config: WebSocketConfig,
    ) -> Result<Self, TransportError> {
        let address = addr.into();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| TransportError::BindFailed { address, source })?;
        Ok(Self { listener, config })
    }

    /// Waits for the next client and completes its handshake.
    ///
    /// The handshake holds up the next accept. Servers with many clients
    /// should use [`accept_pending`](Self::accept_pending) and finish each
    /// handshake on its own task.
    ///
    /// # Errors
    ///
    /// Fails if accepting the TCP connection or the WebSocket handshake fails.
    /// A failed handshake does not affect the listener.
    pub async fn accept(&self) -> Result<WebSocketConnection, TransportError> {
        self.accept_pending().await?.handshake().await
    }

    /// Waits for the next TCP connection without reading from it.
    ///
    /// # Errors
    ///
    /// Fails if accepting the TCP connection fails.
    pub async fn accept_pending(&self) -> Result<PendingHandshake, TransportError> {
        let (stream, addr) = self.listener.accept().await?;
        Ok(PendingHandshake {
            stream,
            addr,
            config: self.config.clone(),
        })
    }

    /// Returns the local address this listener is bound to.
    #[allow(clippy::result_large_err)]
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }
}

/// An accepted TCP connection whose WebSocket upgrade has not run yet.
#[derive(Debug)]
pub struct PendingHandshake {
    stream: TcpStream,
    addr: SocketAddr,
    config: WebSocketConfig,
}

impl PendingHandshake {
    /// Address of the connecting client.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Runs the server side of the upgrade, bounded by
    /// [`WebSocketConfig::connect_timeout`].
    ///
    /// # Errors
    ///
    /// [`TransportError::Timeout`] if the client does not finish the upgrade
    /// in time, [`TransportError::WebSocketHandshakeFailed`] if it fails.
    pub async fn handshake(self) -> Result<WebSocketConnection, TransportError> {
        let Self {
            stream,
            addr,
            config,
        } = self;

        let mut peer_id = None;
        let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            peer_id = announced_peer_id(request);
            Ok(response)
        };

        let upgrade = accept_hdr_async_with_config(
            MaybeTlsStream::Plain(stream),
            callback,
            Some(config.protocol_config()),
        );
        let stream = tokio::time::timeout(config.connect_timeout, upgrade)
            .await
            .map_err(|_| TransportError::Timeout {
                duration: config.connect_timeout,
            })?
            .map_err(|e| TransportError::WebSocketHandshakeFailed {
                reason: format!("{addr}: {e}"),
            })?;

        debug!(%addr, peer_id = ?peer_id, "websocket accepted");
        Ok(WebSocketConnection::new(stream, peer_id))
    }
}

/// Reads the peer id from the handshake header, falling back to `?id=`.
fn announced_peer_id(request: &Request) -> Option<String> {
    if let Some(value) = request.headers().get(PEER_ID_HEADER) {
        if let Ok(id) = value.to_str() {
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
    }
    request
        .uri()
        .query()?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, value)| *key == "id" && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Dials one fixed WebSocket URL.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
    peer_id: String,
    config: WebSocketConfig,
}

impl WebSocketConnector {
    /// Creates a connector that announces `peer_id` to `url`.
    pub fn new(url: impl Into<String>, peer_id: impl Into<String>, config: WebSocketConfig) -> Self {
        Self {
            url: url.into(),
            peer_id: peer_id.into(),
            config,
        }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>, TransportError> {
        let connection = WebSocketConnection::connect(&self.url, &self.peer_id, &self.config).await?;
        Ok(Box::new(connection))
    }

    fn target(&self) -> &str {
        &self.url
    }
}
