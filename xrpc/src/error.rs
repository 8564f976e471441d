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

//! Top-level error types.
//!
//! Errors are layered the same way calls are:
//!
//! 1. **Transport layer**: connection failures ([`TransportError`])
//! 2. **Exchange layer**: correlation failures such as reply timeouts
//!    ([`ExchangeError`])
//! 3. **Dispatch layer**: the remote executor could not run the method
//!    ([`DispatchError`]), e.g. unknown method or rejected token
//! 4. **Business layer**: the handler ran and returned an error
//!
//! [`XrpcError`] composes these layers. Callers usually only need one
//! question answered: did the method run and fail on its own terms
//! ([`XrpcError::is_business_error`]), or did the call not go through
//! ([`XrpcError::is_transport_error`])? Exactly one of the two is true for
//! every error.
//!
//! # Examples
//!
//! ```rust
//! use xrpc::XrpcError;
//! use xrpc::transport::TransportError;
//!
//! let err: XrpcError = TransportError::Closed.into();
//! assert!(err.is_transport_error());
//!
//! let err = XrpcError::Business("insufficient funds".to_string());
//! assert!(err.is_business_error());
//! assert!(!err.is_transport_error());
//! ```

use crate::exchanger::ExchangeError;
#[cfg(feature = "poll")]
use crate::poll::PollError;
use crate::registry::RegistryError;
use crate::transport::TransportError;
use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for calls and node operations.
#[derive(Debug)]
pub enum XrpcError {
    /// The underlying connection failed.
    Transport(TransportError),

    /// The call could not be correlated with a reply (timeout, closed exchanger,
    /// lost connection).
    Exchange(ExchangeError),

    /// The remote executor refused or could not run the method.
    Dispatch(DispatchError),

    /// The handler ran and returned an error.
    ///
    /// This is the only variant that is not a transport error.
    Business(String),

    /// Arguments or results could not be encoded or decoded.
    Serialization(serde_json::Error),

    /// No connection is known for the requested peer id.
    UnknownPeer(String),

    /// Method registration failed.
    Registry(RegistryError),

    /// The long-poll transport failed.
    #[cfg(feature = "poll")]
    Poll(PollError),
}

impl XrpcError {
    /// Returns `true` if the call did not go through.
    ///
    /// Every error except [`XrpcError::Business`] is a transport error.
    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        !self.is_business_error()
    }

    /// Returns `true` if the handler ran and returned an error.
    #[must_use]
    pub const fn is_business_error(&self) -> bool {
        matches!(self, Self::Business(_))
    }

    /// Returns `true` if the call timed out, locally or on the remote side.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use xrpc::{DispatchError, XrpcError};
    ///
    /// let err = XrpcError::Dispatch(DispatchError::execution_timed_out());
    /// assert!(err.is_timeout());
    /// ```
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Exchange(e) => matches!(e, ExchangeError::Timeout { .. }),
            Self::Dispatch(e) => e.is_execution_timeout(),
            #[cfg(feature = "poll")]
            Self::Poll(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if the remote executor rejected the caller's token.
    #[must_use]
    pub fn is_authentication_invalid(&self) -> bool {
        match self {
            Self::Dispatch(e) => e.authentication_invalid,
            #[cfg(feature = "poll")]
            Self::Poll(PollError::Dispatch(e)) => e.authentication_invalid,
            _ => false,
        }
    }

    /// Returns `true` if retrying the call may succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_recoverable(),
            Self::Exchange(e) => e.is_recoverable(),
            Self::UnknownPeer(_) => true,
            #[cfg(feature = "poll")]
            Self::Poll(e) => e.is_recoverable(),
            Self::Dispatch(_) | Self::Business(_) | Self::Serialization(_) | Self::Registry(_) => {
                false
            }
        }
    }
}

impl fmt::Display for XrpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::Exchange(e) => write!(f, "exchange error: {}", e),
            Self::Dispatch(e) => write!(f, "{}", e),
            Self::Business(message) => write!(f, "{}", message),
            Self::Serialization(e) => write!(f, "serialization error: {}", e),
            Self::UnknownPeer(id) => write!(f, "unknown peer: {}", id),
            Self::Registry(e) => write!(f, "registry error: {}", e),
            #[cfg(feature = "poll")]
            Self::Poll(e) => write!(f, "poll error: {}", e),
        }
    }
}

impl StdError for XrpcError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Exchange(e) => Some(e),
            Self::Dispatch(e) => Some(e),
            Self::Serialization(e) => Some(e),
            Self::Registry(e) => Some(e),
            #[cfg(feature = "poll")]
            Self::Poll(e) => Some(e),
            Self::Business(_) | Self::UnknownPeer(_) => None,
        }
    }
}

impl From<TransportError> for XrpcError {
    fn from(error: TransportError) -> Self {
        Self::Transport(error)
    }
}

impl From<ExchangeError> for XrpcError {
    fn from(error: ExchangeError) -> Self {
        Self::Exchange(error)
    }
}

impl From<DispatchError> for XrpcError {
    fn from(error: DispatchError) -> Self {
        Self::Dispatch(error)
    }
}

impl From<serde_json::Error> for XrpcError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error)
    }
}

impl From<RegistryError> for XrpcError {
    fn from(error: RegistryError) -> Self {
        Self::Registry(error)
    }
}

#[cfg(feature = "poll")]
impl From<PollError> for XrpcError {
    fn from(error: PollError) -> Self {
        Self::Poll(error)
    }
}

/// Why an executor could not run a method.
///
/// Travels to the caller in the reply's `TransportError` field, together with
/// the `AuthenticationInvalid` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchError {
    /// Human-readable reason.
    pub message: String,
    /// Set when the caller's token was rejected.
    pub authentication_invalid: bool,
}

const EXECUTION_TIMED_OUT: &str = "execution timed out";

impl DispatchError {
    /// Creates a dispatch error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            authentication_invalid: false,
        }
    }

    /// No method with this name is registered.
    pub fn no_method(name: &str) -> Self {
        Self::new(format!("no method registered: {name}"))
    }

    /// The caller's token was rejected.
    pub fn authentication_invalid() -> Self {
        Self {
            message: "authentication invalid".to_string(),
            authentication_invalid: true,
        }
    }

    /// The handler exceeded the caller's time-to-live.
    pub fn execution_timed_out() -> Self {
        Self::new(EXECUTION_TIMED_OUT)
    }

    /// The call payload could not be decoded.
    pub fn malformed_call(reason: impl fmt::Display) -> Self {
        Self::new(format!("malformed call: {reason}"))
    }

    /// The handler's arguments did not match its declared type.
    pub fn invalid_arguments(method: &str, reason: impl fmt::Display) -> Self {
        Self::new(format!("invalid arguments for {method}: {reason}"))
    }

    /// The handler's result could not be encoded.
    pub fn unencodable_result(method: &str, reason: impl fmt::Display) -> Self {
        Self::new(format!("could not encode result of {method}: {reason}"))
    }

    /// The handler panicked.
    pub fn handler_panicked(method: &str) -> Self {
        Self::new(format!("handler for {method} panicked"))
    }

    /// Returns `true` for errors built by [`execution_timed_out`](Self::execution_timed_out).
    pub fn is_execution_timeout(&self) -> bool {
        self.message == EXECUTION_TIMED_OUT
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for DispatchError {}
