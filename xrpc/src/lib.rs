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

#![doc = include_str!("../../README.md")]
#![allow(clippy::module_inception)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! ## Architecture
//!
//! xrpc is organized in layers, leaves first:
//!
//! - **[`codec`]**: correlation-id framing of individual messages
//! - **[`transport`]**: message-oriented connections (WebSocket, in-memory)
//! - **[`exchanger`]**: correlated calls in both directions over one connection
//! - **[`registry`]**: name-to-handler table with typed argument decoding
//! - **[`executor`]**: authentication, deadlines and dispatch of one call
//! - **[`node`]**: peers that both call and answer, addressed by id
//! - **[`poll`]**: HTTP long-poll fallback for clients without a duplex connection
//! - **[`backpressure`]**: bounded queues with explicit overflow policies
//! - **[`reconnection`]**: retry strategies for dropped connections

pub mod backpressure;
pub mod cancel;
pub mod codec;
pub mod error;
pub mod exchanger;
pub mod executor;
pub mod node;
#[cfg(feature = "poll")]
pub mod poll;
pub mod reconnection;
pub mod registry;
pub mod transport;
pub mod wire;

pub use error::{DispatchError, XrpcError};
pub use wire::{CallPayload, CallerInfo, ReplyPayload, Unused};

/// Generates the [`Service`](registry::Service) implementation for an `impl`
/// block.
///
/// See the [crate documentation](crate) for the accepted method shapes.
#[cfg(feature = "macros")]
pub use xrpc_macros::service;
