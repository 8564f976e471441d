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

//! Dispatch of inbound calls: lookup, authentication, deadline, encoding.

mod auth;
mod config;
#[allow(clippy::module_inception)]
mod executor;

pub use auth::{Authenticator, StaticTokens};
pub use config::{ExecutorConfig, TimeoutPolicy};
pub(crate) use executor::encode_reply;
pub use executor::{ErrorHandler, Executor};
