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

use crate::transport::{TransportError, TransportMetadata};
use async_trait::async_trait;

/// A message-delimited, full-duplex connection.
///
/// Every call to [`FrameWriter::write_frame`] on one end arrives as exactly
/// one [`FrameReader::read_frame`] result on the other end. The exchanger
/// relies on this to skip length prefixes.
///
/// A connection is split once, when an [`Exchanger`](crate::exchanger::Exchanger)
/// takes ownership of it: the read half moves into the exchanger's read loop,
/// the write half sits behind the exchanger's write lock.
///
/// # Implementing a custom connection
///
/// ```rust
/// use async_trait::async_trait;
/// use xrpc::transport::{
///     Connection, FrameReader, FrameWriter, TransportError, TransportId, TransportMetadata,
/// };
///
/// struct Loopback {
///     metadata: TransportMetadata,
///     tx: tokio::sync::mpsc::Sender<Vec<u8>>,
///     rx: tokio::sync::mpsc::Receiver<Vec<u8>>,
/// }
///
/// struct Reader(tokio::sync::mpsc::Receiver<Vec<u8>>);
/// struct Writer(tokio::sync::mpsc::Sender<Vec<u8>>);
///
/// #[async_trait]
/// impl FrameReader for Reader {
///     async fn read_frame(&mut self) -> Result<Vec<u8>, TransportError> {
///         self.0.recv().await.ok_or(TransportError::Closed)
///     }
/// }
///
/// #[async_trait]
/// impl FrameWriter for Writer {
///     async fn write_frame(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
///         self.0.send(frame).await.map_err(|_| TransportError::Closed)
///     }
///
///     async fn close(&mut self) -> Result<(), TransportError> {
///         Ok(())
///     }
/// }
///
/// impl Connection for Loopback {
///     fn metadata(&self) -> &TransportMetadata {
///         &self.metadata
///     }
///
///     fn split(self: Box<Self>) -> (Box<dyn FrameReader>, Box<dyn FrameWriter>) {
///         (Box::new(Reader(self.rx)), Box::new(Writer(self.tx)))
///     }
/// }
/// ```
pub trait Connection: Send + 'static {
    /// Returns metadata about this connection.
    fn metadata(&self) -> &TransportMetadata;

    /// Splits the connection into its read and write halves.
    fn split(self: Box<Self>) -> (Box<dyn FrameReader>, Box<dyn FrameWriter>);
}

/// Read half of a [`Connection`].
#[async_trait]
pub trait FrameReader: Send {
    /// Waits for the next frame.
    ///
    /// An error ends the connection; the caller will not read again.
    async fn read_frame(&mut self) -> Result<Vec<u8>, TransportError>;
}

/// Write half of a [`Connection`].
#[async_trait]
pub trait FrameWriter: Send {
    /// Sends one frame.
    async fn write_frame(&mut self, frame: Vec<u8>) -> Result<(), TransportError>;

    /// Closes the connection. Called at most once by the exchanger.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Dials new connections to one fixed remote peer.
///
/// Nodes keep the connector of every outbound peer so that a dropped
/// connection can be re-established on the next call.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new connection.
    async fn connect(&self) -> Result<Box<dyn Connection>, TransportError>;

    /// Human-readable target, used in logs.
    fn target(&self) -> &str;
}
