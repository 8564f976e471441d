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

//! Transport layer error types.
//!
//! Transport errors are the lowest level of the error hierarchy and describe
//! failures of the physical connection underneath an
//! [`Exchanger`](crate::exchanger::Exchanger).
//!
//! # Error Categories
//!
//! - **Connection errors**: failed to establish or lost a connection
//! - **I/O errors**: socket-level failures
//! - **Configuration errors**: invalid transport configuration
//! - **Timeout errors**: connecting took too long
//!
//! A connection error terminates the exchanger that owns the connection.
//! Re-establishing it is up to the owning [`Node`](crate::node::Node).

use std::io;
use thiserror::Error;

/// Errors that can occur in the transport layer.
///
/// # Examples
///
/// ```rust
/// use xrpc::transport::TransportError;
///
/// let error = TransportError::ConnectionFailed {
///     address: "ws://127.0.0.1:8080".to_string(),
///     reason: "connection refused".to_string(),
/// };
///
/// if error.is_recoverable() {
///     println!("Can retry connection");
/// }
/// ```
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to establish a connection to the remote peer.
    ///
    /// May be retried through a
    /// [`ReconnectionStrategy`](crate::reconnection::ReconnectionStrategy).
    #[error("failed to connect to {address}: {reason}")]
    ConnectionFailed {
        /// The address that failed to connect
        address: String,
        /// Why the attempt failed
        reason: String,
    },

    /// Connection was lost during operation.
    #[error("connection lost: {reason}")]
    ConnectionLost {
        /// Description of why the connection was lost
        reason: String,
        /// The underlying I/O error, if available
        #[source]
        source: Option<io::Error>,
    },

    /// Connecting exceeded its time limit.
    #[error("operation timed out after {duration:?}")]
    Timeout {
        /// The duration that was exceeded
        duration: std::time::Duration,
    },

    /// Invalid transport configuration.
    ///
    /// Not recoverable; indicates a programming error.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
    },

    /// The connection was closed locally.
    #[error("transport is closed")]
    Closed,

    /// Failed to bind to the specified address.
    #[error("failed to bind to {address}: {source}")]
    BindFailed {
        /// The address that failed to bind
        address: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// An unexpected I/O error occurred.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// WebSocket protocol error.
    #[cfg(feature = "websocket")]
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The WebSocket handshake could not be completed.
    #[cfg(feature = "websocket")]
    #[error("WebSocket handshake failed: {reason}")]
    WebSocketHandshakeFailed {
        /// Description of why the handshake failed
        reason: String,
    },
}

impl TransportError {
    /// Returns `true` if this error is potentially recoverable by reconnecting.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use xrpc::transport::TransportError;
    ///
    /// let error = TransportError::ConnectionLost {
    ///     reason: "peer closed".to_string(),
    ///     source: None,
    /// };
    /// assert!(error.is_recoverable());
    /// assert!(!TransportError::Closed.is_recoverable());
    /// ```
    pub fn is_recoverable(&self) -> bool {
        match self {
            TransportError::ConnectionFailed { .. }
            | TransportError::ConnectionLost { .. }
            | TransportError::Timeout { .. } => true,

            TransportError::Io { source } => matches!(
                source.kind(),
                io::ErrorKind::Interrupted
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
            ),

            #[cfg(feature = "websocket")]
            TransportError::WebSocket(e) => {
                use tokio_tungstenite::tungstenite::Error as WsError;
                matches!(
                    e,
                    WsError::Io(_) | WsError::ConnectionClosed | WsError::AlreadyClosed
                )
            }

            #[cfg(feature = "websocket")]
            TransportError::WebSocketHandshakeFailed { .. } => true,

            TransportError::InvalidConfiguration { .. }
            | TransportError::Closed
            | TransportError::BindFailed { .. } => false,
        }
    }

    /// Returns `true` if the connection is unusable after this error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use xrpc::transport::TransportError;
    ///
    /// assert!(TransportError::Closed.should_close_transport());
    /// ```
    pub fn should_close_transport(&self) -> bool {
        match self {
            TransportError::ConnectionFailed { .. } | TransportError::BindFailed { .. } => false,

            TransportError::Io { source } => !matches!(
                source.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
            ),

            _ => true,
        }
    }

    /// Create a connection failed error for testing.
    #[cfg(test)]
    pub fn connection_failed(address: impl Into<String>) -> Self {
        TransportError::ConnectionFailed {
            address: address.into(),
            reason: "connection refused".to_string(),
        }
    }

    /// Create a connection lost error for testing.
    #[cfg(test)]
    pub fn connection_lost(reason: impl Into<String>) -> Self {
        TransportError::ConnectionLost {
            reason: reason.into(),
            source: None,
        }
    }

    /// Create an invalid configuration error for testing.
    #[cfg(test)]
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        TransportError::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(error: io::Error) -> Self {
        TransportError::Io { source: error }
    }
}
