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

//! In-memory connection for tests and benchmarks.
//!
//! A [`MemoryConnection`] pair is two crossed Tokio `mpsc` channels. Frames
//! keep their boundaries, so the pair behaves like a WebSocket connection
//! without any network I/O.

use crate::transport::{
    Connection, FrameReader, FrameWriter, TransportError, TransportId, TransportMetadata,
};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

/// Default number of frames buffered in each direction.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// One end of an in-memory connection.
///
/// # Examples
///
/// ```rust
/// use xrpc::transport::{Connection, FrameReader, FrameWriter, MemoryConnection};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (left, right) = MemoryConnection::pair(16);
/// let (_left_reader, mut left_writer) = Box::new(left).split();
/// let (mut right_reader, _right_writer) = Box::new(right).split();
///
/// left_writer.write_frame(b"hello".to_vec()).await?;
/// assert_eq!(right_reader.read_frame().await?, b"hello");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryConnection {
    metadata: TransportMetadata,
    tx: mpsc::Sender<Vec<u8>>,
    rx: mpsc::Receiver<Vec<u8>>,
}

impl MemoryConnection {
    /// Creates two connected ends.
    ///
    /// `buffer_size` bounds how many frames may be in flight per direction
    /// before writers wait.
    pub fn pair(buffer_size: usize) -> (Self, Self) {
        let (tx1, rx1) = mpsc::channel(buffer_size.max(1));
        let (tx2, rx2) = mpsc::channel(buffer_size.max(1));

        let left = Self {
            metadata: TransportMetadata::new(TransportId::next(), "memory"),
            tx: tx1,
            rx: rx2,
        };
        let right = Self {
            metadata: TransportMetadata::new(TransportId::next(), "memory"),
            tx: tx2,
            rx: rx1,
        };
        debug!(left = %left.metadata.id, right = %right.metadata.id, "created memory connection pair");
        (left, right)
    }

    /// Creates a pair with [`DEFAULT_BUFFER_SIZE`].
    pub fn pair_default() -> (Self, Self) {
        Self::pair(DEFAULT_BUFFER_SIZE)
    }

    /// Sets the peer id this end reports in its metadata.
    pub fn with_peer_id(mut self, peer_id: impl Into<String>) -> Self {
        self.metadata = self.metadata.with_peer_id(peer_id);
        self
    }
}

impl Connection for MemoryConnection {
    fn metadata(&self) -> &TransportMetadata {
        &self.metadata
    }

    fn split(self: Box<Self>) -> (Box<dyn FrameReader>, Box<dyn FrameWriter>) {
        (
            Box::new(MemoryReader { rx: self.rx }),
            Box::new(MemoryWriter { tx: Some(self.tx) }),
        )
    }
}

struct MemoryReader {
    rx: mpsc::Receiver<Vec<u8>>,
}

#[async_trait]
impl FrameReader for MemoryReader {
    async fn read_frame(&mut self) -> Result<Vec<u8>, TransportError> {
        self.rx.recv().await.ok_or_else(|| TransportError::ConnectionLost {
            reason: "peer dropped memory connection".to_string(),
            source: None,
        })
    }
}

struct MemoryWriter {
    tx: Option<mpsc::Sender<Vec<u8>>>,
}

#[async_trait]
impl FrameWriter for MemoryWriter {
    async fn write_frame(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(frame)
            .await
            .map_err(|_| TransportError::ConnectionLost {
                reason: "peer dropped memory connection".to_string(),
                source: None,
            })
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        // Dropping the sender ends the peer's reader.
        self.tx = None;
        Ok(())
    }
}
