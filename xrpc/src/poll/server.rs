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

use crate::backpressure::{BoundedQueue, QueueFull, QueueMetrics};
use crate::cancel::CancellationToken;
use crate::error::{DispatchError, XrpcError};
use crate::executor::Executor;
use crate::poll::{CLIENT_ID_HEADER, PollCallPayload, PollError, PollReplyPayload, PollServerConfig};
use crate::transport::TransportError;
use crate::wire::{CallPayload, CallerInfo, ReplyPayload};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// HTTP surface for clients that cannot hold a duplex connection.
///
/// Serves three routes:
///
/// | Route | Purpose |
/// |-------|---------|
/// | `POST /xrpc` | Run a call on this server, or relay it to the client named by `ToID` |
/// | `GET /xrpcPoll?id=<client>` | Long poll for the next call queued for a client; `418` when nothing arrived within the poll timeout |
/// | `POST /xrpcReceive` | Deliver a client's reply, matched by `InstanceID` |
///
/// A relayed call is `Queued` until the target client polls it, then
/// `AwaitingReply` until the client posts its result or the reply timeout
/// expires (`408`). Each client has its own bounded queue; when it is full
/// the configured [`BackpressurePolicy`](crate::backpressure::BackpressurePolicy)
/// applies.
///
/// # Example
///
/// ```rust,no_run
/// use xrpc::executor::Executor;
/// use xrpc::poll::{PollServer, PollServerConfig};
/// use xrpc::registry::Registry;
///
/// # async fn example() -> Result<(), xrpc::XrpcError> {
/// let server = PollServer::new(Executor::new(Registry::new()), PollServerConfig::default());
/// let addr = server.serve("127.0.0.1:0").await?;
/// println!("poll server on http://{addr}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PollServer {
    inner: Arc<ServerInner>,
}

struct ServerInner {
    config: PollServerConfig,
    executor: Executor,
    queues: Mutex<HashMap<String, Arc<BoundedQueue<PollCallPayload>>>>,
    waiting: Mutex<HashMap<i64, oneshot::Sender<ReplyPayload>>>,
    instance_counter: AtomicI64,
    shutdown: CancellationToken,
}

#[derive(Debug, Deserialize)]
struct PollQuery {
    #[serde(default)]
    id: String,
}

impl PollServer {
    /// Creates a server that runs direct calls on `executor`.
    pub fn new(executor: Executor, config: PollServerConfig) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                config,
                executor,
                queues: Mutex::new(HashMap::new()),
                waiting: Mutex::new(HashMap::new()),
                instance_counter: AtomicI64::new(0),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// The configuration this server was built with.
    pub fn config(&self) -> &PollServerConfig {
        &self.inner.config
    }

    /// The executor answering direct calls.
    pub fn executor(&self) -> &Executor {
        &self.inner.executor
    }

    /// Builds the router, for mounting into a larger application.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/xrpc", post(handle_call))
            .route("/xrpcPoll", get(handle_poll))
            .route("/xrpcReceive", post(handle_receive))
            .layer(TraceLayer::new_for_http());
        if self.inner.config.permissive_cors {
            router = router.layer(CorsLayer::permissive());
        }
        router.with_state(self.inner.clone())
    }

    /// Serves the router on `addr` in the background until
    /// [`shutdown`](Self::shutdown).
    ///
    /// Returns the bound address, useful with port `0`.
    ///
    /// # Errors
    ///
    /// Fails if the address cannot be bound.
    pub async fn serve(&self, addr: &str) -> Result<SocketAddr, XrpcError> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::BindFailed {
                address: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(TransportError::from)?;

        let app = self.router();
        let shutdown = self.inner.shutdown.clone();
        tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = served {
                error!(%local_addr, error = %e, "poll server stopped");
            }
        });

        info!(%local_addr, "serving poll clients");
        Ok(local_addr)
    }

    /// Calls `method` on a polling client and decodes its result.
    ///
    /// # Errors
    ///
    /// [`XrpcError::Business`] if the client's handler failed; otherwise a
    /// transport error, e.g. [`PollError::ReplyTimeout`] if the client did not
    /// poll and answer within the reply timeout.
    pub async fn call_client<A, R>(
        &self,
        client_id: &str,
        method: &str,
        args: &A,
    ) -> Result<R, XrpcError>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let caller_info = CallerInfo::new(self.inner.config.server_id.clone());
        let call = CallPayload::new(caller_info, method, args)?;
        let reply = self.inner.relay(client_id, call).await?;
        reply.into_result()
    }

    /// Queues `call` for `client_id` and waits for the client's reply.
    ///
    /// # Errors
    ///
    /// See [`PollError::ReplyTimeout`], [`PollError::QueueFull`] and
    /// [`PollError::Closed`].
    pub async fn relay(&self, client_id: &str, call: CallPayload) -> Result<ReplyPayload, PollError> {
        self.inner.relay(client_id, call).await
    }

    /// Counters of a client's call queue, if the client is known.
    pub fn queue_metrics(&self, client_id: &str) -> Option<QueueMetrics> {
        self.inner.queues.lock().get(client_id).map(|q| q.metrics())
    }

    /// Sorted ids of every client with a live queue: one that is polling, was
    /// called, or has calls waiting to be picked up.
    pub fn client_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.queues.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of relayed calls waiting for a reply.
    pub fn waiting_count(&self) -> usize {
        self.inner.waiting.lock().len()
    }

    /// Stops serving and releases every waiting caller with
    /// [`PollError::Closed`].
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let waiting: Vec<_> = self.inner.waiting.lock().drain().collect();
        let released = waiting.len();
        drop(waiting);
        info!(released, "poll server shut down");
    }
}

impl fmt::Debug for PollServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollServer")
            .field("config", &self.inner.config)
            .field("clients", &self.client_ids())
            .field("waiting", &self.waiting_count())
            .finish()
    }
}

impl ServerInner {
    fn queue(&self, client_id: &str) -> Arc<BoundedQueue<PollCallPayload>> {
        self.queues
            .lock()
            .entry(client_id.to_string())
            .or_insert_with(|| {
                debug!(client_id, "creating call queue");
                Arc::new(BoundedQueue::new(
                    self.config.queue_capacity,
                    self.config.backpressure,
                ))
            })
            .clone()
    }

    /// Forgets `queue` if it is still the one registered for `client_id`,
    /// is empty, and nobody but the caller holds it.
    fn release_idle_queue(
        &self,
        client_id: &str,
        queue: &Arc<BoundedQueue<PollCallPayload>>,
    ) -> bool {
        let mut queues = self.queues.lock();
        let idle = queues
            .get(client_id)
            .is_some_and(|current| Arc::ptr_eq(current, queue))
            && queue.is_empty()
            && Arc::strong_count(queue) == 2;
        if idle {
            queues.remove(client_id);
            debug!(client_id, "dropped idle call queue");
        }
        idle
    }

    async fn relay(&self, client_id: &str, call: CallPayload) -> Result<ReplyPayload, PollError> {
        if self.shutdown.is_cancelled() {
            return Err(PollError::Closed);
        }

        let instance_id = self.instance_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let method = call.method.clone();
        let mut payload = PollCallPayload::new(call, client_id);
        payload.instance_id = instance_id;

        let (tx, rx) = oneshot::channel();
        self.waiting.lock().insert(instance_id, tx);
        let _guard = WaitingGuard {
            waiting: &self.waiting,
            instance_id,
        };

        let queue = self.queue(client_id);
        let delivery = async {
            match queue.push(payload).await {
                Ok(Some(evicted)) => self.evict(client_id, evicted),
                Ok(None) => {}
                Err(QueueFull(_)) => {
                    warn!(client_id, method = %method, "call queue full, rejecting call");
                    return Err(PollError::QueueFull {
                        client_id: client_id.to_string(),
                    });
                }
            }
            rx.await.map_err(|_| PollError::Closed)
        };

        match tokio::time::timeout(self.config.reply_timeout, delivery).await {
            Ok(result) => result,
            Err(_) => {
                warn!(client_id, method = %method, instance_id, "relayed call timed out");
                Err(PollError::ReplyTimeout { method })
            }
        }
    }

    /// Answers a call pushed out of a full queue so its caller stops waiting.
    fn evict(&self, client_id: &str, call: PollCallPayload) {
        warn!(
            client_id,
            method = %call.method,
            instance_id = call.instance_id,
            "call queue full, dropping oldest call"
        );
        if let Some(waiter) = self.waiting.lock().remove(&call.instance_id) {
            let error = DispatchError::new(format!(
                "call dropped: queue for client {client_id} is full"
            ));
            let _ = waiter.send(ReplyPayload::dispatch_error(&error));
        }
    }

    fn deliver(&self, reply: PollReplyPayload) -> bool {
        match self.waiting.lock().remove(&reply.instance_id) {
            Some(waiter) => waiter.send(reply.reply).is_ok(),
            None => false,
        }
    }
}

/// Removes a waiting entry when the relaying future finishes or is dropped.
struct WaitingGuard<'a> {
    waiting: &'a Mutex<HashMap<i64, oneshot::Sender<ReplyPayload>>>,
    instance_id: i64,
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.waiting.lock().remove(&self.instance_id);
    }
}

async fn handle_call(
    State(server): State<Arc<ServerInner>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut call: PollCallPayload = match serde_json::from_slice(&body) {
        Ok(call) => call,
        Err(e) => {
            let error = DispatchError::malformed_call(e);
            return (StatusCode::BAD_REQUEST, error.to_string()).into_response();
        }
    };
    if call.caller_info.caller_id.is_empty() {
        if let Some(id) = headers.get(CLIENT_ID_HEADER).and_then(|v| v.to_str().ok()) {
            call.caller_info.caller_id = id.to_string();
        }
    }

    if call.to_id.is_empty() {
        let reply = server.executor.execute(call.into_call()).await;
        return Json(reply).into_response();
    }

    let to_id = std::mem::take(&mut call.to_id);
    match server.relay(&to_id, call.into_call()).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            let status = match e {
                PollError::ReplyTimeout { .. } => StatusCode::REQUEST_TIMEOUT,
                PollError::QueueFull { .. } | PollError::Closed => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, e.to_string()).into_response()
        }
    }
}

async fn handle_poll(State(server): State<Arc<ServerInner>>, Query(query): Query<PollQuery>) -> Response {
    if query.id.is_empty() {
        return (StatusCode::BAD_REQUEST, "missing client id").into_response();
    }

    let queue = server.queue(&query.id);
    tokio::select! {
        call = queue.pop() => {
            debug!(client_id = %query.id, method = %call.method, instance_id = call.instance_id, "handing call to client");
            Json(call).into_response()
        }
        _ = tokio::time::sleep(server.config.poll_timeout) => {
            debug!(client_id = %query.id, "poll timed out");
            server.release_idle_queue(&query.id, &queue);
            (StatusCode::IM_A_TEAPOT, "poll timed out, so do another").into_response()
        }
        _ = server.shutdown.cancelled() => {
            (StatusCode::SERVICE_UNAVAILABLE, "server shutting down").into_response()
        }
    }
}

async fn handle_receive(State(server): State<Arc<ServerInner>>, body: Bytes) -> Response {
    let reply: PollReplyPayload = match serde_json::from_slice(&body) {
        Ok(reply) => reply,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, format!("malformed reply: {e}")).into_response();
        }
    };

    let instance_id = reply.instance_id;
    if server.deliver(reply) {
        StatusCode::OK.into_response()
    } else {
        warn!(instance_id, "reply for a call nobody is waiting for");
        (
            StatusCode::NOT_FOUND,
            format!("no caller waiting for instance {instance_id}"),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backpressure::BackpressurePolicy;
    use crate::registry::Registry;
    use std::time::Duration;

    fn server(config: PollServerConfig) -> PollServer {
        PollServer::new(Executor::new(Registry::new()), config)
    }

    fn call(method: &str) -> CallPayload {
        CallPayload::new(CallerInfo::new("tester"), method, &()).unwrap()
    }

    #[tokio::test]
    async fn test_relay_delivers_reply() {
        let server = server(PollServerConfig::default());
        let relay = {
            let server = server.clone();
            tokio::spawn(async move { server.relay("c1", call("Echo.Ping")).await })
        };

        let queue = server.inner.queue("c1");
        let queued = queue.pop().await;
        assert_eq!(queued.method, "Echo.Ping");
        assert_eq!(queued.to_id, "c1");
        assert_eq!(server.waiting_count(), 1);

        assert!(server.inner.deliver(PollReplyPayload {
            reply: ReplyPayload::success(Some(serde_json::json!("pong"))),
            instance_id: queued.instance_id,
        }));

        let reply = relay.await.unwrap().unwrap();
        assert_eq!(reply.into_result::<String>().unwrap(), "pong");
        assert_eq!(server.waiting_count(), 0);
    }

    #[tokio::test]
    async fn test_relay_times_out() {
        let server = server(PollServerConfig::default().with_reply_timeout(Duration::from_millis(20)));
        let err = server.relay("idle", call("Echo.Ping")).await.unwrap_err();
        assert!(matches!(err, PollError::ReplyTimeout { ref method } if method == "Echo.Ping"));
        assert_eq!(server.waiting_count(), 0);
    }

    #[tokio::test]
    async fn test_reject_policy() {
        let server = server(
            PollServerConfig::default()
                .with_queue_capacity(1)
                .with_backpressure(BackpressurePolicy::Reject)
                .with_reply_timeout(Duration::from_millis(200)),
        );
        let first = {
            let server = server.clone();
            tokio::spawn(async move { server.relay("c", call("A.First")).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let err = server.relay("c", call("A.Second")).await.unwrap_err();
        assert!(matches!(err, PollError::QueueFull { .. }));
        assert_eq!(server.queue_metrics("c").unwrap().rejected, 1);

        assert!(first.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_drop_oldest_answers_evicted_caller() {
        let server = server(
            PollServerConfig::default()
                .with_queue_capacity(1)
                .with_backpressure(BackpressurePolicy::DropOldest)
                .with_reply_timeout(Duration::from_secs(1)),
        );
        let first = {
            let server = server.clone();
            tokio::spawn(async move { server.relay("c", call("A.First")).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = {
            let server = server.clone();
            tokio::spawn(async move { server.relay("c", call("A.Second")).await })
        };

        let evicted = first.await.unwrap().unwrap();
        assert!(evicted.transport_error.starts_with("call dropped"));

        let queued = server.inner.queue("c").pop().await;
        assert_eq!(queued.method, "A.Second");
        server.inner.deliver(PollReplyPayload {
            reply: ReplyPayload::success(None),
            instance_id: queued.instance_id,
        });
        assert!(second.await.unwrap().unwrap().is_success());
    }

    #[tokio::test]
    async fn test_release_idle_queue() {
        let server = server(PollServerConfig::default());

        let queue = server.inner.queue("idle");
        assert!(server.inner.release_idle_queue("idle", &queue));
        assert!(server.queue_metrics("idle").is_none());

        // Another poller still holds it.
        let queue = server.inner.queue("shared");
        let other = server.inner.queue("shared");
        assert!(!server.inner.release_idle_queue("shared", &queue));
        drop(other);
        assert!(server.inner.release_idle_queue("shared", &queue));

        // Calls are waiting to be picked up.
        let queue = server.inner.queue("busy");
        queue
            .push(PollCallPayload::new(call("A.B"), "busy"))
            .await
            .unwrap();
        assert!(!server.inner.release_idle_queue("busy", &queue));
        assert_eq!(server.client_ids(), vec!["busy".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_instance_not_delivered() {
        let server = server(PollServerConfig::default());
        assert!(!server.inner.deliver(PollReplyPayload {
            reply: ReplyPayload::default(),
            instance_id: 404,
        }));
    }

    #[tokio::test]
    async fn test_shutdown_releases_waiters() {
        let server = server(PollServerConfig::default());
        let relay = {
            let server = server.clone();
            tokio::spawn(async move { server.relay("c", call("A.B")).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        server.shutdown();
        let err = relay.await.unwrap().unwrap_err();
        assert!(matches!(err, PollError::Closed));
        assert!(matches!(
            server.relay("c", call("A.B")).await,
            Err(PollError::Closed)
        ));
    }
}
