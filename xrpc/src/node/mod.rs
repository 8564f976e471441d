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

//! Peers that both originate and answer calls.
//!
//! A [`Node`] combines one [`Executor`](crate::executor::Executor) with any
//! number of [`Exchanger`](crate::exchanger::Exchanger)s, one per connected
//! peer. Calls are addressed by peer id; the node picks the right connection,
//! re-dialling outbound peers when theirs dropped.

mod config;
mod node;
mod peers;

pub use config::{DEFAULT_RECONNECT_ATTEMPTS, NodeConfig};
pub use node::{AuthenticationFailedHandler, CallOptions, Node};
