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

use crate::registry::{InvokeError, MethodDescriptor, RegistryError, Service};
use crate::wire::CallerInfo;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Name-to-handler table for dispatching calls.
///
/// Services are registered at startup; afterwards the table is only read.
/// Lookups and registration may happen from any task.
///
/// # Example
///
/// ```rust
/// use xrpc::registry::{MethodDescriptor, Registry};
/// use xrpc::CallerInfo;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = Registry::new();
/// registry.register_method(MethodDescriptor::new("Calc.Negate", |_: CallerInfo, x: i64| async move {
///     Ok::<_, String>(-x)
/// }))?;
///
/// let result = registry
///     .invoke("Calc.Negate", CallerInfo::default(), serde_json::json!(5))
///     .await?;
/// assert_eq!(result, Some(serde_json::json!(-5)));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    methods: RwLock<HashMap<String, Arc<MethodDescriptor>>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every suitable method of `service`.
    ///
    /// Methods the service reports as skipped are logged and ignored.
    /// Returns the number of methods registered.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateMethod`] if any qualified name is already
    /// taken; in that case no method of `service` is registered.
    pub fn register<S: Service>(&self, service: S) -> Result<usize, RegistryError> {
        self.register_arc(Arc::new(service))
    }

    /// Like [`register`](Self::register) for a shared instance.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub fn register_arc<S: Service>(&self, service: Arc<S>) -> Result<usize, RegistryError> {
        let service_name = service.service_name();
        for skipped in service.skipped_methods() {
            warn!(
                service = service_name,
                method = skipped.name,
                reason = skipped.reason,
                "method not registered"
            );
        }

        let descriptors = service.methods();
        let mut methods = self.methods.write();

        let mut seen = HashSet::new();
        for descriptor in &descriptors {
            if methods.contains_key(descriptor.name()) || !seen.insert(descriptor.name()) {
                return Err(RegistryError::DuplicateMethod {
                    name: descriptor.name().to_string(),
                });
            }
        }

        let count = descriptors.len();
        for descriptor in descriptors {
            debug!(method = descriptor.name(), "registered method");
            methods.insert(descriptor.name().to_string(), Arc::new(descriptor));
        }
        Ok(count)
    }

    /// Registers a single hand-built method.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateMethod`] if the name is taken.
    pub fn register_method(&self, descriptor: MethodDescriptor) -> Result<(), RegistryError> {
        let mut methods = self.methods.write();
        if methods.contains_key(descriptor.name()) {
            return Err(RegistryError::DuplicateMethod {
                name: descriptor.name().to_string(),
            });
        }
        debug!(method = descriptor.name(), "registered method");
        methods.insert(descriptor.name().to_string(), Arc::new(descriptor));
        Ok(())
    }

    /// Finds a method by qualified name.
    pub fn lookup(&self, name: &str) -> Option<Arc<MethodDescriptor>> {
        self.methods.read().get(name).cloned()
    }

    /// Looks up and invokes a method.
    ///
    /// # Errors
    ///
    /// [`InvokeError::NotFound`] if `name` is unknown, otherwise as
    /// [`MethodDescriptor::invoke`].
    pub async fn invoke(
        &self,
        name: &str,
        caller_info: CallerInfo,
        args: Value,
    ) -> Result<Option<Value>, InvokeError> {
        let descriptor = self.lookup(name).ok_or_else(|| InvokeError::NotFound {
            name: name.to_string(),
        })?;
        descriptor.invoke(caller_info, args).await
    }

    /// Turns authentication on or off for one method.
    ///
    /// # Errors
    ///
    /// [`RegistryError::MethodNotFound`] if no such method is registered.
    pub fn set_requires_authentication(
        &self,
        name: &str,
        requires_authentication: bool,
    ) -> Result<(), RegistryError> {
        let mut methods = self.methods.write();
        let descriptor = methods
            .get_mut(name)
            .ok_or_else(|| RegistryError::MethodNotFound {
                name: name.to_string(),
            })?;
        Arc::make_mut(descriptor).set_requires_authentication(requires_authentication);
        Ok(())
    }

    /// Sorted list of registered method names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.methods.read().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.methods.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SkippedMethod;
    use serde_json::json;

    struct Calc;

    impl Service for Calc {
        fn service_name(&self) -> &'static str {
            "Calc"
        }

        fn methods(self: Arc<Self>) -> Vec<MethodDescriptor> {
            vec![
                MethodDescriptor::new("Calc.Add", |_: CallerInfo, (a, b): (i64, i64)| async move {
                    Ok::<_, String>(a + b)
                }),
                MethodDescriptor::new("Calc.Neg", |_: CallerInfo, a: i64| async move {
                    Ok::<_, String>(-a)
                }),
            ]
        }

        fn skipped_methods(&self) -> &'static [SkippedMethod] {
            &[SkippedMethod {
                name: "helper",
                reason: "takes no argument",
            }]
        }
    }

    /// Shares one name with `Calc` and introduces a new one.
    struct Clash;

    impl Service for Clash {
        fn service_name(&self) -> &'static str {
            "Calc"
        }

        fn methods(self: Arc<Self>) -> Vec<MethodDescriptor> {
            vec![
                MethodDescriptor::new("Calc.Mul", |_: CallerInfo, a: i64| async move {
                    Ok::<_, String>(a)
                }),
                MethodDescriptor::new("Calc.Add", |_: CallerInfo, a: i64| async move {
                    Ok::<_, String>(a)
                }),
            ]
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = Registry::new();
        assert_eq!(registry.register(Calc).unwrap(), 2);
        assert_eq!(registry.names(), vec!["Calc.Add", "Calc.Neg"]);
        assert!(registry.lookup("Calc.Add").is_some());
        assert!(registry.lookup("Calc.helper").is_none());
    }

    #[test]
    fn test_duplicate_registration_is_atomic() {
        let registry = Registry::new();
        registry.register(Calc).unwrap();

        let err = registry.register(Clash).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateMethod {
                name: "Calc.Add".into()
            }
        );
        assert!(registry.lookup("Calc.Mul").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_invoke_by_name() {
        let registry = Registry::new();
        registry.register(Calc).unwrap();

        let result = registry
            .invoke("Calc.Add", CallerInfo::default(), json!([3, 4]))
            .await
            .unwrap();
        assert_eq!(result, Some(json!(7)));

        let err = registry
            .invoke("Calc.Nope", CallerInfo::default(), Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::NotFound { .. }));
    }

    #[test]
    fn test_set_requires_authentication() {
        let registry = Registry::new();
        registry.register(Calc).unwrap();

        registry
            .set_requires_authentication("Calc.Neg", false)
            .unwrap();
        assert!(!registry.lookup("Calc.Neg").unwrap().requires_authentication());
        assert!(registry.lookup("Calc.Add").unwrap().requires_authentication());

        assert!(matches!(
            registry.set_requires_authentication("Calc.Nope", false),
            Err(RegistryError::MethodNotFound { .. })
        ));
    }
}
