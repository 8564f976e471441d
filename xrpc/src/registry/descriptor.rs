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

//! Method descriptors: one registered, callable method each.

use crate::registry::InvokeError;
use crate::wire::CallerInfo;
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Type-erased handler: decodes arguments, runs the method, encodes the result.
pub type MethodHandler = Arc<
    dyn Fn(CallerInfo, Value) -> BoxFuture<'static, Result<Option<Value>, InvokeError>>
        + Send
        + Sync,
>;

/// A registered method.
///
/// Built either by the [`service`](crate::service) attribute or by hand:
///
/// ```rust
/// use xrpc::registry::MethodDescriptor;
/// use xrpc::CallerInfo;
///
/// let descriptor = MethodDescriptor::new("Calc.Square", |_: CallerInfo, x: i64| async move {
///     Ok::<_, String>(x * x)
/// });
/// assert_eq!(descriptor.name(), "Calc.Square");
/// assert_eq!(descriptor.argument_type(), "i64");
/// assert!(descriptor.requires_authentication());
/// ```
#[derive(Clone)]
pub struct MethodDescriptor {
    name: String,
    argument_type: &'static str,
    result_type: Option<&'static str>,
    requires_caller_info: bool,
    requires_authentication: bool,
    handler: MethodHandler,
}

impl MethodDescriptor {
    /// Describes a method that returns a result.
    pub fn new<A, R, E, F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + 'static,
        E: fmt::Display + 'static,
        F: Fn(CallerInfo, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let name = name.into();
        let method = name.clone();
        let handler = Arc::new(handler);
        let erased: MethodHandler = Arc::new(move |caller_info, args| {
            let method = method.clone();
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                let args: A = decode_arguments(&method, args)?;
                let result = (*handler)(caller_info, args)
                    .await
                    .map_err(InvokeError::business)?;
                serde_json::to_value(&result)
                    .map(Some)
                    .map_err(|source| InvokeError::Encode { method, source })
            })
        });

        Self {
            name,
            argument_type: type_name::<A>(),
            result_type: Some(type_name::<R>()),
            requires_caller_info: false,
            requires_authentication: true,
            handler: erased,
        }
    }

    /// Describes a method that only reports success or failure.
    ///
    /// Its replies carry no `Result`.
    pub fn without_result<A, E, F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        E: fmt::Display + 'static,
        F: Fn(CallerInfo, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        let name = name.into();
        let method = name.clone();
        let handler = Arc::new(handler);
        let erased: MethodHandler = Arc::new(move |caller_info, args| {
            let method = method.clone();
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                let args: A = decode_arguments(&method, args)?;
                (*handler)(caller_info, args)
                    .await
                    .map_err(InvokeError::business)?;
                Ok(None)
            })
        });

        Self {
            name,
            argument_type: type_name::<A>(),
            result_type: None,
            requires_caller_info: false,
            requires_authentication: true,
            handler: erased,
        }
    }

    /// Records whether the handler takes [`CallerInfo`] as its first argument.
    #[must_use]
    pub fn with_caller_info(mut self, requires_caller_info: bool) -> Self {
        self.requires_caller_info = requires_caller_info;
        self
    }

    /// Sets whether calls must carry a valid token.
    #[must_use]
    pub fn with_authentication(mut self, requires_authentication: bool) -> Self {
        self.requires_authentication = requires_authentication;
        self
    }

    /// Fully qualified name, `TypeName.MethodName`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust type name of the argument.
    pub fn argument_type(&self) -> &'static str {
        self.argument_type
    }

    /// Rust type name of the result, `None` for methods without a result.
    pub fn result_type(&self) -> Option<&'static str> {
        self.result_type
    }

    /// Whether the handler receives the caller's [`CallerInfo`].
    pub fn requires_caller_info(&self) -> bool {
        self.requires_caller_info
    }

    /// Whether the executor checks the caller's token before dispatch.
    pub fn requires_authentication(&self) -> bool {
        self.requires_authentication
    }

    pub(crate) fn set_requires_authentication(&mut self, requires_authentication: bool) {
        self.requires_authentication = requires_authentication;
    }

    /// Decodes `args`, runs the handler and encodes its result.
    ///
    /// # Errors
    ///
    /// [`InvokeError::Decode`] or [`InvokeError::Encode`] for (de)serialization
    /// failures, [`InvokeError::Business`] when the handler returns an error.
    pub async fn invoke(
        &self,
        caller_info: CallerInfo,
        args: Value,
    ) -> Result<Option<Value>, InvokeError> {
        (self.handler)(caller_info, args).await
    }

    /// Returns a `'static` future running this method, for spawning.
    pub(crate) fn invoke_owned(
        &self,
        caller_info: CallerInfo,
        args: Value,
    ) -> BoxFuture<'static, Result<Option<Value>, InvokeError>> {
        (self.handler)(caller_info, args)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("argument_type", &self.argument_type)
            .field("result_type", &self.result_type)
            .field("requires_caller_info", &self.requires_caller_info)
            .field("requires_authentication", &self.requires_authentication)
            .finish_non_exhaustive()
    }
}

/// Decodes arguments, giving absent ones an empty form.
///
/// `null` is tried as-is first (so `Option<T>`, `()` and `Unused` accept it),
/// then as `[]` and `{}`, so that collections and all-default structs arrive
/// empty rather than failing.
fn decode_arguments<A: DeserializeOwned>(method: &str, args: Value) -> Result<A, InvokeError> {
    if !args.is_null() {
        return serde_json::from_value(args).map_err(|source| InvokeError::Decode {
            method: method.to_string(),
            source,
        });
    }

    match serde_json::from_value(Value::Null) {
        Ok(args) => Ok(args),
        Err(source) => serde_json::from_value(Value::Array(Vec::new()))
            .or_else(|_| serde_json::from_value(Value::Object(serde_json::Map::new())))
            .map_err(|_| InvokeError::Decode {
                method: method.to_string(),
                source,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::HashMap;

    #[derive(Debug, Deserialize, PartialEq, Default)]
    #[serde(default)]
    struct Options {
        verbose: bool,
        limit: u32,
    }

    #[test]
    fn test_decode_null_into_containers() {
        let v: Vec<i32> = decode_arguments("T.M", Value::Null).unwrap();
        assert!(v.is_empty());

        let m: HashMap<String, i32> = decode_arguments("T.M", Value::Null).unwrap();
        assert!(m.is_empty());

        let o: Options = decode_arguments("T.M", Value::Null).unwrap();
        assert_eq!(o, Options::default());

        let none: Option<i32> = decode_arguments("T.M", Value::Null).unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn test_decode_null_into_scalar_fails() {
        let err = decode_arguments::<i32>("T.M", Value::Null).unwrap_err();
        assert!(matches!(err, InvokeError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_invoke_with_result() {
        let descriptor =
            MethodDescriptor::new("Calc.Double", |_: CallerInfo, x: i32| async move {
                Ok::<_, String>(x * 2)
            });
        let result = descriptor
            .invoke(CallerInfo::default(), json!(21))
            .await
            .unwrap();
        assert_eq!(result, Some(json!(42)));
        assert_eq!(descriptor.result_type(), Some("i32"));
    }

    #[tokio::test]
    async fn test_invoke_without_result() {
        let descriptor =
            MethodDescriptor::without_result("Log.Write", |_: CallerInfo, _line: String| async {
                Ok::<_, String>(())
            });
        let result = descriptor
            .invoke(CallerInfo::default(), json!("hello"))
            .await
            .unwrap();
        assert_eq!(result, None);
        assert_eq!(descriptor.result_type(), None);
    }

    #[tokio::test]
    async fn test_invoke_business_error() {
        let descriptor = MethodDescriptor::new("Calc.Fail", |_: CallerInfo, _: i32| async {
            Err::<i32, _>("boom")
        });
        let err = descriptor
            .invoke(CallerInfo::default(), json!(1))
            .await
            .unwrap_err();
        assert!(err.is_business());
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_invoke_decode_error() {
        let descriptor = MethodDescriptor::new("Calc.Double", |_: CallerInfo, x: i32| async move {
            Ok::<_, String>(x * 2)
        });
        let err = descriptor
            .invoke(CallerInfo::default(), json!("not a number"))
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::Decode { ref method, .. } if method == "Calc.Double"));
    }

    #[tokio::test]
    async fn test_caller_info_reaches_handler() {
        let descriptor = MethodDescriptor::new("Who.Ami", |info: CallerInfo, _: Value| async move {
            Ok::<_, String>(info.caller_id)
        })
        .with_caller_info(true);
        assert!(descriptor.requires_caller_info());

        let result = descriptor
            .invoke(CallerInfo::new("alice"), Value::Null)
            .await
            .unwrap();
        assert_eq!(result, Some(json!("alice")));
    }
}
