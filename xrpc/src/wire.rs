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

//! JSON envelopes exchanged between peers.
//!
//! A call travels as a [`CallPayload`] and is answered with a
//! [`ReplyPayload`]. Field names on the wire are PascalCase so that peers
//! written against the same protocol in other languages interoperate:
//!
//! ```text
//! {"CallerInfo":{"CallerID":"c1","Token":"t","TimeToLiveSeconds":5},"Method":"Calc.Product","Args":{"A":3,"B":4}}
//! {"Result":{"Sum":12},"Error":"","TransportError":"","AuthenticationInvalid":false}
//! ```
//!
//! Arguments and results are kept as [`serde_json::Value`] until the
//! registry knows the concrete handler types.

use crate::cancel::CancellationToken;
use crate::error::{DispatchError, XrpcError};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::time::Duration;

/// Metadata about the caller, optionally passed to a handler as its first
/// argument.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallerInfo {
    /// Identifies the caller.
    #[serde(rename = "CallerID", default)]
    pub caller_id: String,

    /// Authentication token, checked by the executor's authenticator.
    #[serde(rename = "Token", default, skip_serializing_if = "String::is_empty")]
    pub token: String,

    /// Execution deadline for the handler in seconds. Zero means no deadline.
    #[serde(
        rename = "TimeToLiveSeconds",
        default,
        skip_serializing_if = "is_zero"
    )]
    pub time_to_live_seconds: f64,

    /// Cancelled by the executor when the deadline passes. Never serialized.
    #[serde(skip)]
    pub cancellation: CancellationToken,
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

impl CallerInfo {
    /// Creates caller info for the given caller id.
    pub fn new(caller_id: impl Into<String>) -> Self {
        Self {
            caller_id: caller_id.into(),
            ..Default::default()
        }
    }

    /// Sets the authentication token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Sets the execution deadline.
    pub fn with_time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live_seconds = ttl.as_secs_f64();
        self
    }

    /// Returns the execution deadline, if one was requested.
    ///
    /// Non-finite and non-positive values mean no deadline.
    pub fn time_to_live(&self) -> Option<Duration> {
        if self.time_to_live_seconds > 0.0 {
            Duration::try_from_secs_f64(self.time_to_live_seconds).ok()
        } else {
            None
        }
    }
}

/// A call envelope: which method to run, with which arguments, for whom.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallPayload {
    /// Caller metadata.
    #[serde(rename = "CallerInfo", default)]
    pub caller_info: CallerInfo,

    /// Fully qualified method name, `TypeName.MethodName`.
    #[serde(rename = "Method", default)]
    pub method: String,

    /// Undecoded arguments.
    #[serde(rename = "Args", default)]
    pub args: Value,
}

impl CallPayload {
    /// Builds a call envelope, serializing `args`.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if `args` cannot be represented as JSON.
    pub fn new<A: Serialize + ?Sized>(
        caller_info: CallerInfo,
        method: impl Into<String>,
        args: &A,
    ) -> Result<Self, XrpcError> {
        Ok(Self {
            caller_info,
            method: method.into(),
            args: serde_json::to_value(args)?,
        })
    }
}

/// The answer to a [`CallPayload`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplyPayload {
    /// Encoded result, `None` if the handler declares no result or failed.
    #[serde(rename = "Result", default)]
    pub result: Option<Value>,

    /// Business error returned by the handler.
    #[serde(rename = "Error", default)]
    pub error: String,

    /// Why the call could not be dispatched at all.
    #[serde(rename = "TransportError", default)]
    pub transport_error: String,

    /// Set when the caller's token was rejected.
    #[serde(rename = "AuthenticationInvalid", default)]
    pub authentication_invalid: bool,
}

impl ReplyPayload {
    /// A successful reply carrying `result`.
    pub fn success(result: Option<Value>) -> Self {
        Self {
            result,
            ..Default::default()
        }
    }

    /// A reply carrying a business error.
    pub fn business_error(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            ..Default::default()
        }
    }

    /// A reply describing a dispatch failure.
    pub fn dispatch_error(error: &DispatchError) -> Self {
        Self {
            transport_error: error.message.clone(),
            authentication_invalid: error.authentication_invalid,
            ..Default::default()
        }
    }

    /// Returns `true` if neither a business nor a transport error is set.
    pub fn is_success(&self) -> bool {
        self.error.is_empty() && self.transport_error.is_empty()
    }

    /// Converts the reply into the caller-facing result.
    ///
    /// A transport error wins over a business error. An absent result decodes
    /// as JSON `null`, which yields `()` for methods without a result.
    ///
    /// # Errors
    ///
    /// [`XrpcError::Dispatch`] for transport errors, [`XrpcError::Business`]
    /// for handler errors, and a serialization error if the result does not
    /// decode as `R`.
    pub fn into_result<R: DeserializeOwned>(self) -> Result<R, XrpcError> {
        if !self.transport_error.is_empty() {
            return Err(XrpcError::Dispatch(DispatchError {
                message: self.transport_error,
                authentication_invalid: self.authentication_invalid,
            }));
        }
        if !self.error.is_empty() {
            return Err(XrpcError::Business(self.error));
        }
        Ok(serde_json::from_value(self.result.unwrap_or(Value::Null))?)
    }
}

/// Argument type for methods that take no meaningful input.
///
/// Deserializes from any JSON value and serializes as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unused;

impl Serialize for Unused {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        serializer.serialize_map(Some(0))?.end()
    }
}

impl<'de> Deserialize<'de> for Unused {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer).map(|_| Unused)
    }
}
