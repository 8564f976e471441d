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

//! The [`Service`] trait implemented by `#[service]` impl blocks.

use crate::registry::MethodDescriptor;
use std::sync::Arc;

/// A method that was not registered, and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedMethod {
    /// Rust method name
    pub name: &'static str,
    /// Why its signature was not suitable
    pub reason: &'static str,
}

/// A set of methods registered together under one type name.
///
/// Usually generated by the [`service`](crate::service) attribute. A
/// hand-written implementation looks like this:
///
/// ```rust
/// use std::sync::Arc;
/// use xrpc::registry::{MethodDescriptor, Registry, Service};
/// use xrpc::CallerInfo;
///
/// struct Echo;
///
/// impl Service for Echo {
///     fn service_name(&self) -> &'static str {
///         "Echo"
///     }
///
///     fn methods(self: Arc<Self>) -> Vec<MethodDescriptor> {
///         vec![MethodDescriptor::new("Echo.Say", |_: CallerInfo, text: String| async move {
///             Ok::<_, String>(text)
///         })]
///     }
/// }
///
/// let registry = Registry::new();
/// registry.register(Echo).unwrap();
/// assert!(registry.lookup("Echo.Say").is_some());
/// ```
pub trait Service: Send + Sync + 'static {
    /// Type name used as the prefix of every qualified method name.
    fn service_name(&self) -> &'static str;

    /// Descriptors for every suitable method, bound to this instance.
    fn methods(self: Arc<Self>) -> Vec<MethodDescriptor>;

    /// Public methods whose shape did not qualify for registration.
    fn skipped_methods(&self) -> &'static [SkippedMethod] {
        &[]
    }
}
