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

//! Method registry: named handlers with typed arguments.
//!
//! A [`Registry`] maps fully qualified names (`TypeName.MethodName`) to
//! [`MethodDescriptor`]s. Each descriptor owns a type-erased handler that
//! decodes the call's JSON arguments into the method's argument type only
//! once the method is resolved, runs it, and encodes its result.
//!
//! Services are registered through the [`Service`] trait, which the
//! [`service`](crate::service) attribute implements for an `impl` block.

mod descriptor;
mod error;
#[allow(clippy::module_inception)]
mod registry;
mod service;

pub use descriptor::{MethodDescriptor, MethodHandler};
pub use error::{InvokeError, RegistryError};
pub use registry::Registry;
pub use service::{Service, SkippedMethod};
