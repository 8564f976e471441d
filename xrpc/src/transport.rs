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

//! Transport layer abstractions.
//!
//! An [`Exchanger`](crate::exchanger::Exchanger) runs on top of a
//! [`Connection`]: a full-duplex, message-delimited link that splits into a
//! [`FrameReader`] and a [`FrameWriter`]. This module provides:
//!
//! - [`WebSocketConnection`]: binary WebSocket messages over TCP (requires the
//!   `websocket` feature), with [`WebSocketListener`] and [`WebSocketConnector`]
//! - [`MemoryConnection`]: crossed in-process channels for tests and benchmarks
//!
//! # Architecture
//!
//! - **Framing**: a connection delivers whole frames; correlation ids are added
//!   one layer up by [`codec`](crate::codec)
//! - **Metadata**: every connection exposes a [`TransportMetadata`], including
//!   the peer id announced during the handshake
//! - **Dialing**: a [`Connector`] re-opens a connection to a fixed target, so
//!   nodes can reconnect after a failure
//!
//! # Examples
//!
//! ```rust
//! use xrpc::transport::{Connection, FrameReader, FrameWriter, MemoryConnection};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (client, server) = MemoryConnection::pair(16);
//! let (_client_reader, mut client_writer) = Box::new(client).split();
//! let (mut server_reader, _server_writer) = Box::new(server).split();
//!
//! client_writer.write_frame(b"Hello".to_vec()).await?;
//! assert_eq!(server_reader.read_frame().await?, b"Hello");
//! # Ok(())
//! # }
//! ```

mod error;
mod memory;
mod traits;
mod types;
#[cfg(feature = "websocket")]
mod websocket;

pub use self::error::TransportError;
pub use self::memory::{DEFAULT_BUFFER_SIZE, MemoryConnection};
pub use self::traits::{Connection, Connector, FrameReader, FrameWriter};
pub use self::types::{TransportId, TransportMetadata};
#[cfg(feature = "websocket")]
pub use self::websocket::{
    PEER_ID_HEADER, PendingHandshake, WebSocketConfig, WebSocketConnection, WebSocketConnector,
    WebSocketListener,
};
