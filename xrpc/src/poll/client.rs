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
use crate::error::{DispatchError, XrpcError};
use crate::executor::Executor;
use crate::poll::{CLIENT_ID_HEADER, PollCallPayload, PollClientConfig, PollError, PollReplyPayload};
use crate::transport::TransportError;
use crate::wire::{CallPayload, CallerInfo, ReplyPayload};
use parking_lot::RwLock;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Client side of poll mode.
///
/// Calls the server (or, through it, another polling client) with plain HTTP
/// requests, and receives calls addressed to its own id by long-polling.
/// Received calls run on the client's [`Executor`]; their replies are posted
/// back to the server.
///
/// # Example
///
/// ```rust,no_run
/// use xrpc::cancel::CancellationToken;
/// use xrpc::executor::Executor;
/// use xrpc::poll::{PollClient, PollClientConfig};
/// use xrpc::registry::Registry;
///
/// # async fn example() -> Result<(), xrpc::XrpcError> {
/// let client = PollClient::new(
///     "http://127.0.0.1:1300",
///     Executor::new(Registry::new()),
///     PollClientConfig::default().with_client_id("kiosk-1"),
/// )?;
///
/// let shutdown = CancellationToken::new();
/// let poller = tokio::spawn({
///     let client = client.clone();
///     let shutdown = shutdown.clone();
///     async move { client.run(shutdown).await }
/// });
///
/// let sum: i64 = client.call("Calc.Sum", &[1, 2, 3]).await?;
/// shutdown.cancel();
/// # let _ = (sum, poller);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PollClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    executor: Executor,
    config: PollClientConfig,
    token: RwLock<String>,
}

impl PollClient {
    /// Creates a client for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Fails if `base_url` is not a valid URL or the HTTP client cannot be
    /// built.
    pub fn new(
        base_url: impl Into<String>,
        executor: Executor,
        config: PollClientConfig,
    ) -> Result<Self, PollError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| PollError::InvalidUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;
        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                executor,
                config,
                token: RwLock::new(String::new()),
            }),
        })
    }

    /// This client's id.
    pub fn id(&self) -> &str {
        &self.inner.config.client_id
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &PollClientConfig {
        &self.inner.config
    }

    /// Sets the token sent with every call.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.inner.token.write() = token.into();
    }

    /// Calls `method` on the server.
    ///
    /// # Errors
    ///
    /// [`XrpcError::Business`] if the handler failed; any other variant if
    /// the call could not be delivered or dispatched.
    pub async fn call<A, R>(&self, method: &str, args: &A) -> Result<R, XrpcError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call_peer("", method, args).await
    }

    /// Calls `method` on the polling client `to_id`, relayed by the server.
    /// An empty `to_id` calls the server itself.
    ///
    /// # Errors
    ///
    /// See [`call`](Self::call).
    pub async fn call_peer<A, R>(&self, to_id: &str, method: &str, args: &A) -> Result<R, XrpcError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let caller_info = CallerInfo::new(self.id()).with_token(self.inner.token.read().clone());
        let call = CallPayload::new(caller_info, method, args)?;
        let reply = self.inner.post_call(PollCallPayload::new(call, to_id)).await?;
        reply.into_result()
    }

    /// Waits once for a call addressed to this client.
    ///
    /// Returns `None` when the server's poll timeout passed without a call.
    ///
    /// # Errors
    ///
    /// Fails if the request fails or the server answers unexpectedly.
    pub async fn poll_once(&self) -> Result<Option<PollCallPayload>, PollError> {
        self.inner.poll_once().await
    }

    /// Runs a received call and posts its reply to the server.
    ///
    /// # Errors
    ///
    /// Fails if the reply cannot be delivered.
    pub async fn handle_call(&self, call: PollCallPayload) -> Result<(), PollError> {
        self.inner.handle_call(call).await
    }

    /// Polls for calls until `shutdown` is cancelled, running each received
    /// call on its own task.
    ///
    /// Failed polls are retried according to the configured strategy.
    ///
    /// # Errors
    ///
    /// Returns the last poll error once the strategy gives up.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), PollError> {
        let strategy = self.inner.config.retry.clone();
        let mut attempt: u32 = 0;
        info!(client_id = %self.id(), server = %self.inner.base_url, "polling for calls");

        loop {
            let polled = tokio::select! {
                polled = self.inner.poll_once() => polled,
                _ = shutdown.cancelled() => break,
            };

            match polled {
                Ok(call) => {
                    if attempt > 0 {
                        strategy.on_connected();
                        attempt = 0;
                    }
                    if let Some(call) = call {
                        let inner = self.inner.clone();
                        tokio::spawn(async move {
                            let method = call.method.clone();
                            if let Err(e) = inner.handle_call(call).await {
                                warn!(method = %method, error = %e, "failed to deliver reply");
                            }
                        });
                    }
                }
                Err(e) => {
                    let failure = TransportError::ConnectionFailed {
                        address: self.inner.base_url.clone(),
                        reason: e.to_string(),
                    };
                    strategy.on_disconnected(&failure);
                    if !e.is_recoverable() || !strategy.should_reconnect(attempt, &failure).await {
                        warn!(client_id = %self.id(), error = %e, attempt, "giving up polling");
                        return Err(e);
                    }
                    let delay = strategy.next_delay(attempt).await;
                    warn!(client_id = %self.id(), error = %e, attempt, ?delay, "poll failed, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.cancelled() => break,
                    }
                    attempt += 1;
                }
            }
        }

        info!(client_id = %self.id(), "stopped polling");
        Ok(())
    }
}

impl fmt::Debug for PollClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollClient")
            .field("base_url", &self.inner.base_url)
            .field("config", &self.inner.config)
            .finish()
    }
}

impl ClientInner {
    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, PollError> {
        let raw = format!("{}/{}", self.base_url, path);
        Url::parse_with_params(&raw, query).map_err(|e| PollError::InvalidUrl {
            url: raw,
            reason: e.to_string(),
        })
    }

    async fn post_call(&self, call: PollCallPayload) -> Result<ReplyPayload, PollError> {
        // The method in the query string only helps reading access logs.
        let url = self.url("xrpc", &[("method", call.method.as_str())])?;
        let response = self
            .http
            .post(url)
            .header(CLIENT_ID_HEADER, &self.config.client_id)
            .timeout(self.config.call_timeout)
            .json(&call)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<ReplyPayload>().await?);
        }
        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::BAD_REQUEST => PollError::Dispatch(DispatchError::new(message)),
            StatusCode::REQUEST_TIMEOUT => PollError::ReplyTimeout { method: call.method },
            StatusCode::SERVICE_UNAVAILABLE if !call.to_id.is_empty() => PollError::QueueFull {
                client_id: call.to_id,
            },
            _ => PollError::Status {
                status: status.as_u16(),
                message,
            },
        })
    }

    async fn poll_once(&self) -> Result<Option<PollCallPayload>, PollError> {
        let url = self.url("xrpcPoll", &[("id", self.config.client_id.as_str())])?;
        let response = self
            .http
            .get(url)
            .header(CLIENT_ID_HEADER, &self.config.client_id)
            .timeout(self.config.poll_request_timeout)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let call = response.json::<PollCallPayload>().await?;
                debug!(method = %call.method, instance_id = call.instance_id, "received call");
                Ok(Some(call))
            }
            StatusCode::IM_A_TEAPOT => {
                debug!("poll timed out, polling again");
                Ok(None)
            }
            status => Err(PollError::Status {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn handle_call(&self, call: PollCallPayload) -> Result<(), PollError> {
        let instance_id = call.instance_id;
        let method = call.method.clone();
        let reply = self.executor.execute(call.into_call()).await;

        let url = self.url("xrpcReceive", &[("method", method.as_str())])?;
        let response = self
            .http
            .post(url)
            .header(CLIENT_ID_HEADER, &self.config.client_id)
            .timeout(self.config.receive_timeout)
            .json(&PollReplyPayload { reply, instance_id })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(PollError::Status {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            })
        }
    }
}
