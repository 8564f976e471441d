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

//! Correlated calls over one duplex connection.
//!
//! The [`Exchanger`] is the core of the protocol. It frames outgoing calls
//! with a fresh correlation id (see [`codec`](crate::codec)), waits on a
//! private reply channel for the matching reply, and answers inbound calls
//! from the peer on the same connection.
//!
//! # Components
//!
//! - [`Exchanger`]: the connection owner and its read loop
//! - [`PendingReplies`]: outstanding calls keyed by correlation id
//! - [`CorrelationIdGenerator`]: random 63-bit call ids
//! - [`ExchangerConfig`]: reply timeout and inbound scheduling
//!
//! # Ordering
//!
//! Replies are matched by id, never by arrival order, so concurrent calls on
//! one connection may complete in any order. Inbound calls run one at a time
//! per connection under [`InboundDispatch::Serial`] and on separate tasks
//! under [`InboundDispatch::Concurrent`].

mod config;
mod correlation;
mod error;
#[allow(clippy::module_inception)]
mod exchanger;
mod pending;

pub use config::{DEFAULT_EXCHANGE_TIMEOUT, ExchangerConfig, InboundDispatch};
pub use correlation::CorrelationIdGenerator;
pub use error::ExchangeError;
pub use exchanger::{DisconnectHandler, Exchanger, InboundHandler};
pub use pending::PendingReplies;
