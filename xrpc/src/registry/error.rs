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

//! Registry error types.

use std::fmt;
use thiserror::Error;

/// Errors raised while building or querying a [`Registry`](crate::registry::Registry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A method with this qualified name is already registered.
    ///
    /// This is a configuration error; nothing from the offending service was
    /// registered.
    #[error("method already registered: {name}")]
    DuplicateMethod {
        /// The conflicting qualified name
        name: String,
    },

    /// No method with this name is registered.
    #[error("no method registered: {name}")]
    MethodNotFound {
        /// The requested qualified name
        name: String,
    },
}

/// Errors produced while invoking a handler.
///
/// Only [`InvokeError::Business`] means the handler itself failed; the other
/// variants are reported to the caller as transport errors.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// No method with this name is registered.
    #[error("no method registered: {name}")]
    NotFound {
        /// The requested qualified name
        name: String,
    },

    /// The arguments did not decode into the handler's argument type.
    #[error("invalid arguments for {method}: {source}")]
    Decode {
        /// Qualified method name
        method: String,
        /// The decoding failure
        #[source]
        source: serde_json::Error,
    },

    /// The handler's result could not be encoded.
    #[error("could not encode result of {method}: {source}")]
    Encode {
        /// Qualified method name
        method: String,
        /// The encoding failure
        #[source]
        source: serde_json::Error,
    },

    /// The handler returned an error.
    #[error("{0}")]
    Business(String),
}

impl InvokeError {
    /// Wraps any displayable handler error.
    pub fn business(error: impl fmt::Display) -> Self {
        Self::Business(error.to_string())
    }

    /// Returns `true` if the handler ran and returned an error.
    #[must_use]
    pub const fn is_business(&self) -> bool {
        matches!(self, Self::Business(_))
    }
}
