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

//! Poll-mode errors.

use crate::error::DispatchError;
use std::time::Duration;
use thiserror::Error;

/// Why a poll-mode call failed.
#[derive(Debug, Error)]
pub enum PollError {
    /// The HTTP request itself failed (connect, timeout, body).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a status the protocol does not expect.
    #[error("unexpected http status {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// The server could not parse or route the call.
    #[error("{0}")]
    Dispatch(DispatchError),

    /// The polling client did not answer a relayed call in time.
    #[error("call {method} on client timed out")]
    ReplyTimeout {
        /// The relayed method
        method: String,
    },

    /// The target client's queue was full and its policy refused the call.
    #[error("call queue for client {client_id} is full")]
    QueueFull {
        /// The target client
        client_id: String,
    },

    /// A poll stayed open until the server's poll timeout. Poll again.
    #[error("poll timed out after {duration:?}")]
    PollTimedOut {
        /// How long the poll was held open
        duration: Duration,
    },

    /// The server stopped before the call completed.
    #[error("poll server closed")]
    Closed,

    /// The server URL cannot be parsed.
    #[error("invalid server url {url}: {reason}")]
    InvalidUrl {
        /// The rejected URL
        url: String,
        /// Parser message
        reason: String,
    },
}

impl PollError {
    /// Returns `true` if a reply or poll timed out.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout(),
            Self::ReplyTimeout { .. } | Self::PollTimedOut { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if retrying may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            Self::Status { status, .. } => *status >= 500,
            Self::ReplyTimeout { .. } | Self::QueueFull { .. } | Self::PollTimedOut { .. } => true,
            Self::Dispatch(_) | Self::Closed | Self::InvalidUrl { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let err = PollError::ReplyTimeout {
            method: "A.B".into(),
        };
        assert!(err.is_timeout());
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "call A.B on client timed out");

        let err = PollError::Dispatch(DispatchError::malformed_call("eof"));
        assert!(!err.is_timeout());
        assert!(!err.is_recoverable());

        let err = PollError::Status {
            status: 502,
            message: "bad gateway".into(),
        };
        assert!(err.is_recoverable());
    }
}
