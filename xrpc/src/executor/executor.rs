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

use crate::cancel::CancellationToken;
use crate::error::DispatchError;
use crate::exchanger::Exchanger;
use crate::executor::{Authenticator, ExecutorConfig, TimeoutPolicy};
use crate::registry::{InvokeError, Registry, RegistryError, Service};
use crate::wire::{CallPayload, ReplyPayload};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Invoked with the method name for every call that could not be dispatched.
pub type ErrorHandler = Arc<dyn Fn(&str, &DispatchError) + Send + Sync>;

/// Turns call payloads into reply payloads.
///
/// For every call the executor, in order:
///
/// 1. resolves the method, answering `no method registered: <name>` if unknown
/// 2. checks the caller's token if the method requires authentication and an
///    [`Authenticator`] is configured
/// 3. runs the handler on its own task, racing it against the caller's
///    time-to-live (or the configured default deadline)
/// 4. encodes the result or the handler's business error
///
/// Cloning an executor is cheap; clones share the registry.
///
/// # Example
///
/// ```rust
/// use xrpc::executor::Executor;
/// use xrpc::registry::{MethodDescriptor, Registry};
/// use xrpc::{CallPayload, CallerInfo};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let executor = Executor::new(Registry::new());
/// executor.registry().register_method(MethodDescriptor::new(
///     "Calc.Square",
///     |_: CallerInfo, x: i64| async move { Ok::<_, String>(x * x) },
/// ))?;
///
/// let call = CallPayload::new(CallerInfo::new("me"), "Calc.Square", &7)?;
/// let reply = executor.execute(call).await;
/// assert_eq!(reply.into_result::<i64>()?, 49);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Executor {
    registry: Arc<Registry>,
    authenticator: Option<Arc<dyn Authenticator>>,
    error_handler: Option<ErrorHandler>,
    config: ExecutorConfig,
}

impl Executor {
    /// Creates an executor over `registry` with authentication disabled.
    pub fn new(registry: Registry) -> Self {
        Self::with_registry(Arc::new(registry))
    }

    /// Creates an executor over a shared registry.
    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            authenticator: None,
            error_handler: None,
            config: ExecutorConfig::default(),
        }
    }

    /// Enables authentication.
    #[must_use]
    pub fn with_authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticator = Some(Arc::new(authenticator));
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Installs a callback observing every dispatch failure.
    #[must_use]
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &DispatchError) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Registers a service with the underlying registry.
    ///
    /// # Errors
    ///
    /// See [`Registry::register`].
    pub fn register<S: Service>(&self, service: S) -> Result<usize, RegistryError> {
        self.registry.register(service)
    }

    /// Lets `method` be called without a valid token.
    ///
    /// # Errors
    ///
    /// [`RegistryError::MethodNotFound`] if `method` is not registered.
    pub fn set_auth_not_needed(&self, method: &str) -> Result<(), RegistryError> {
        self.registry.set_requires_authentication(method, false)
    }

    /// The registry this executor dispatches into.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The executor's configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Runs one call and produces its reply. Never fails; every problem is
    /// reported inside the reply.
    pub async fn execute(&self, call: CallPayload) -> ReplyPayload {
        let started = Instant::now();
        let CallPayload {
            mut caller_info,
            method,
            args,
        } = call;

        let Some(descriptor) = self.registry.lookup(&method) else {
            return self.fail(&method, DispatchError::no_method(&method));
        };

        if descriptor.requires_authentication() {
            if let Some(authenticator) = &self.authenticator {
                if !authenticator.is_token_valid(&caller_info.token).await {
                    return self.fail(&method, DispatchError::authentication_invalid());
                }
            }
        }

        let deadline = caller_info
            .time_to_live()
            .or(self.config.default_deadline);
        let cancellation = CancellationToken::new();
        caller_info.cancellation = cancellation.clone();
        let caller_id = caller_info.caller_id.clone();

        let mut task = tokio::spawn(descriptor.invoke_owned(caller_info, args));
        let joined = match deadline {
            None => (&mut task).await,
            Some(deadline) => match tokio::time::timeout(deadline, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    cancellation.cancel();
                    if self.config.timeout_policy == TimeoutPolicy::Abort {
                        task.abort();
                    }
                    warn!(
                        method = %method,
                        caller_id = %caller_id,
                        ?deadline,
                        policy = ?self.config.timeout_policy,
                        "execution timed out"
                    );
                    return self.fail(&method, DispatchError::execution_timed_out());
                }
            },
        };

        let reply = match joined {
            Ok(Ok(result)) => ReplyPayload::success(result),
            Ok(Err(InvokeError::Business(message))) => {
                debug!(method = %method, caller_id = %caller_id, error = %message, "handler returned error");
                ReplyPayload::business_error(message)
            }
            Ok(Err(InvokeError::Decode { method, source })) => {
                self.fail(&method, DispatchError::invalid_arguments(&method, source))
            }
            Ok(Err(InvokeError::Encode { method, source })) => {
                self.fail(&method, DispatchError::unencodable_result(&method, source))
            }
            Ok(Err(InvokeError::NotFound { name })) => {
                self.fail(&name, DispatchError::no_method(&name))
            }
            Err(join_error) => {
                error!(method = %method, error = %join_error, "handler task failed");
                self.fail(&method, DispatchError::handler_panicked(&method))
            }
        };

        let elapsed = started.elapsed();
        if let Some(threshold) = self.config.slow_call_threshold {
            if elapsed > threshold {
                warn!(method = %method, caller_id = %caller_id, ?elapsed, "slow call");
            }
        }
        reply
    }

    /// Decodes a JSON call, executes it and encodes the reply.
    pub async fn execute_bytes(&self, payload: &[u8]) -> Vec<u8> {
        let reply = match serde_json::from_slice::<CallPayload>(payload) {
            Ok(call) => self.execute(call).await,
            Err(e) => self.fail("", DispatchError::malformed_call(e)),
        };
        encode_reply(&reply)
    }

    /// Makes this executor answer the inbound calls of `exchanger`.
    pub fn attach(&self, exchanger: &Exchanger) {
        let executor = self.clone();
        exchanger.set_handler(move |payload: Vec<u8>| {
            let executor = executor.clone();
            async move { executor.execute_bytes(&payload).await }
        });
    }

    fn fail(&self, method: &str, error: DispatchError) -> ReplyPayload {
        debug!(method, error = %error, "call not dispatched");
        if let Some(handler) = &self.error_handler {
            handler(method, &error);
        }
        ReplyPayload::dispatch_error(&error)
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("methods", &self.registry.len())
            .field("authentication", &self.authenticator.is_some())
            .field("config", &self.config)
            .finish()
    }
}

/// Encodes a reply; a reply that cannot be encoded becomes a dispatch error.
pub(crate) fn encode_reply(reply: &ReplyPayload) -> Vec<u8> {
    serde_json::to_vec(reply).unwrap_or_else(|e| {
        error!(error = %e, "could not encode reply");
        let fallback = ReplyPayload::dispatch_error(&DispatchError::new("could not encode reply"));
        serde_json::to_vec(&fallback).unwrap_or_default()
    })
}
