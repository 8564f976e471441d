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

//! Correlation framing for exchanger messages.
//!
//! Every message travelling over a duplex connection carries a signed 64-bit
//! correlation id in front of its payload:
//!
//! ```text
//! +-------------------------------+---------------------+
//! | Correlation id (8 bytes, BE)  | Payload (N bytes)   |
//! +-------------------------------+---------------------+
//! ```
//!
//! - A **positive** id marks a new call.
//! - A **negative** id marks the reply to the call whose id is its magnitude.
//!
//! There is no length field. The connections this crate runs over (WebSocket
//! binary messages, in-memory channels) already deliver one frame per message.
//! A raw byte-stream transport would need an extra length prefix on top.
//!
//! # Examples
//!
//! ```rust
//! use xrpc::codec::{self, FrameKind};
//!
//! let frame = codec::encode(42, b"hello");
//! assert_eq!(frame.len(), codec::CORRELATION_ID_SIZE + 5);
//!
//! let decoded = codec::decode(&frame).unwrap();
//! assert_eq!(decoded.correlation_id, 42);
//! assert_eq!(decoded.kind(), FrameKind::Call);
//! assert_eq!(decoded.payload, b"hello");
//! ```

use thiserror::Error;

/// Size of the correlation id prefix in bytes.
pub const CORRELATION_ID_SIZE: usize = 8;

/// Errors produced while decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The frame is shorter than the correlation id prefix.
    #[error("frame too short: {len} bytes, need at least {CORRELATION_ID_SIZE}")]
    TooShort {
        /// Length of the rejected frame
        len: usize,
    },

    /// The correlation id is zero or has no positive counterpart.
    #[error("invalid correlation id {id}")]
    InvalidCorrelationId {
        /// The rejected id
        id: i64,
    },
}

/// Direction of a frame, derived from the sign of its correlation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// A new call originated by the peer.
    Call,
    /// A reply to a call originated locally.
    Reply,
}

/// A decoded frame borrowing its payload from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// The signed correlation id as it appeared on the wire.
    pub correlation_id: i64,
    /// Payload bytes following the prefix.
    pub payload: &'a [u8],
}

impl Frame<'_> {
    /// Returns whether this frame is a call or a reply.
    #[must_use]
    pub const fn kind(&self) -> FrameKind {
        if self.correlation_id < 0 {
            FrameKind::Reply
        } else {
            FrameKind::Call
        }
    }

    /// Returns the magnitude of the correlation id, which identifies the call
    /// regardless of direction.
    #[must_use]
    pub const fn call_id(&self) -> i64 {
        self.correlation_id.abs()
    }
}

/// Encodes a correlation id and payload into a single frame.
#[must_use]
pub fn encode(correlation_id: i64, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(CORRELATION_ID_SIZE + payload.len());
    frame.extend_from_slice(&correlation_id.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Encodes the reply to `call_id`, which is framed with the negated id.
#[must_use]
pub fn encode_reply(call_id: i64, payload: &[u8]) -> Vec<u8> {
    encode(-call_id, payload)
}

/// Decodes a frame into its correlation id and payload.
///
/// # Errors
///
/// Returns [`FrameError::TooShort`] if the frame cannot hold the prefix, and
/// [`FrameError::InvalidCorrelationId`] for id `0` and `i64::MIN`.
pub fn decode(frame: &[u8]) -> Result<Frame<'_>, FrameError> {
    let (prefix, payload) = frame
        .split_first_chunk::<CORRELATION_ID_SIZE>()
        .ok_or(FrameError::TooShort { len: frame.len() })?;

    let correlation_id = i64::from_be_bytes(*prefix);
    if correlation_id == 0 || correlation_id == i64::MIN {
        return Err(FrameError::InvalidCorrelationId { id: correlation_id });
    }

    Ok(Frame {
        correlation_id,
        payload,
    })
}
