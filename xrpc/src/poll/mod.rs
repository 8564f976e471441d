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

//! HTTP long-poll fallback for peers without a duplex connection.
//!
//! A [`PollServer`] exposes calls over plain HTTP. Clients that cannot be
//! reached by the server open a long poll instead; calls addressed to them
//! are queued per client and handed out one per poll. The client runs the
//! call on its own executor and posts the reply back:
//!
//! ```text
//! caller          PollServer                    PollClient "c1"
//!   | POST /xrpc {ToID:c1} |                          |
//!   |--------------------->| queue[c1] <- call #7     |
//!   |                      |<------ GET /xrpcPoll?id=c1
//!   |                      |------- call #7 --------->|
//!   |                      |                          | execute
//!   |                      |<-- POST /xrpcReceive #7 -|
//!   |<------ reply --------|                          |
//! ```
//!
//! Polls that see no call within the poll timeout are answered with
//! `418 I'm a teapot`, so intermediaries do not cut long-idle requests; the
//! client simply polls again.

mod client;
mod config;
mod error;
mod payload;
mod server;

pub use client::PollClient;
pub use config::{
    DEFAULT_POLL_TIMEOUT, DEFAULT_QUEUE_CAPACITY, DEFAULT_REPLY_TIMEOUT, PollClientConfig,
    PollServerConfig,
};
pub use error::PollError;
pub use payload::{PollCallPayload, PollReplyPayload};
pub use server::PollServer;

/// Header carrying the id of the client making a request.
pub const CLIENT_ID_HEADER: &str = "X-Xrpc-Client-Id";
