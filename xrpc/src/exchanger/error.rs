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

//! Exchanger error types.

use crate::codec::FrameError;
use crate::transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`Exchanger`](crate::exchanger::Exchanger) operations.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// No reply arrived in time. The pending entry has been removed, so a late
    /// reply is dropped by the read loop.
    #[error("call {correlation_id} timed out after {duration:?}")]
    Timeout {
        /// The abandoned call's correlation id
        correlation_id: i64,
        /// How long the caller waited
        duration: Duration,
    },

    /// The exchanger was closed locally.
    #[error("exchanger is closed")]
    Closed,

    /// The connection failed while the call was outstanding.
    #[error("connection lost: {reason}")]
    ConnectionLost {
        /// Why the read loop stopped
        reason: String,
    },

    /// Writing the call failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be decoded.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl ExchangeError {
    /// Returns `true` if the call may succeed when retried, possibly on a new
    /// connection.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::ConnectionLost { .. } => true,
            Self::Transport(e) => e.is_recoverable(),
            Self::Closed | Self::Frame(_) => false,
        }
    }

    /// Returns `true` if the exchanger can no longer carry calls.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Closed | Self::ConnectionLost { .. } => true,
            Self::Transport(e) => e.should_close_transport(),
            Self::Timeout { .. } | Self::Frame(_) => false,
        }
    }
}
