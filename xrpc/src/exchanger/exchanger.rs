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
use crate::codec::{self, FrameKind};
use crate::error::DispatchError;
use crate::exchanger::pending::ReplyResult;
use crate::exchanger::{
    CorrelationIdGenerator, ExchangeError, ExchangerConfig, InboundDispatch, PendingReplies,
};
use crate::transport::{Connection, FrameReader, FrameWriter, TransportError, TransportMetadata};
use crate::wire::ReplyPayload;
use futures_util::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

/// Answers an inbound call: receives the call payload, returns the reply payload.
pub type InboundHandler = Arc<dyn Fn(Vec<u8>) -> BoxFuture<'static, Vec<u8>> + Send + Sync>;

/// Invoked once when the connection fails underneath an exchanger.
pub type DisconnectHandler = Arc<dyn Fn(&TransportMetadata, &ExchangeError) + Send + Sync>;

/// Correlated request/response calls in both directions over one connection.
///
/// An `Exchanger` owns one [`Connection`]. A background read loop routes
/// every incoming frame: replies are matched to waiting callers by
/// correlation id, new calls are passed to the inbound handler and answered
/// on the same connection. Any number of tasks may call
/// [`exchange`](Self::exchange) concurrently; each call gets its own
/// correlation id and its own reply channel.
///
/// Cloning an `Exchanger` yields another handle to the same connection. When
/// the last handle is dropped the read loop stops.
///
/// # Example
///
/// ```rust
/// use xrpc::exchanger::{Exchanger, ExchangerConfig};
/// use xrpc::transport::MemoryConnection;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (left, right) = MemoryConnection::pair_default();
/// let client = Exchanger::new(Box::new(left), ExchangerConfig::default());
/// let server = Exchanger::new(Box::new(right), ExchangerConfig::default());
///
/// server.set_handler(|payload: Vec<u8>| async move {
///     payload.into_iter().rev().collect()
/// });
///
/// let reply = client.exchange(b"abc").await?;
/// assert_eq!(reply, b"cba");
///
/// client.close().await;
/// server.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Exchanger {
    inner: Arc<Inner>,
}

struct Inner {
    metadata: TransportMetadata,
    config: ExchangerConfig,
    writer: tokio::sync::Mutex<Box<dyn FrameWriter>>,
    pending: PendingReplies,
    ids: CorrelationIdGenerator,
    handler: RwLock<Option<InboundHandler>>,
    disconnect_handler: RwLock<Option<DisconnectHandler>>,
    /// Set once no new call may be issued.
    closed: AtomicBool,
    /// Set by `close`; read errors after this are expected.
    shutdown_requested: AtomicBool,
    lost_reason: Mutex<Option<String>>,
    shutdown: CancellationToken,
}

impl Exchanger {
    /// Takes ownership of `connection` and starts its read loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(connection: Box<dyn Connection>, config: ExchangerConfig) -> Self {
        let metadata = connection.metadata().clone();
        let (reader, writer) = connection.split();

        let inner = Arc::new(Inner {
            metadata,
            config,
            writer: tokio::sync::Mutex::new(writer),
            pending: PendingReplies::new(),
            ids: CorrelationIdGenerator::new(),
            handler: RwLock::new(None),
            disconnect_handler: RwLock::new(None),
            closed: AtomicBool::new(false),
            shutdown_requested: AtomicBool::new(false),
            lost_reason: Mutex::new(None),
            shutdown: CancellationToken::new(),
        });

        let calls = match inner.config.inbound_dispatch {
            InboundDispatch::Serial => {
                let (tx, rx) = mpsc::unbounded_channel();
                tokio::spawn(serial_dispatch(Arc::downgrade(&inner), rx));
                Some(tx)
            }
            InboundDispatch::Concurrent => None,
        };
        tokio::spawn(read_loop(
            Arc::downgrade(&inner),
            reader,
            inner.shutdown.clone(),
            calls,
        ));

        debug!(
            transport = %inner.metadata.id,
            peer_id = ?inner.metadata.peer_id,
            "exchanger started"
        );
        Self { inner }
    }

    /// Sends a call and waits for its reply, up to the configured timeout.
    ///
    /// # Errors
    ///
    /// - [`ExchangeError::Timeout`] if no reply arrives in time
    /// - [`ExchangeError::Closed`] or [`ExchangeError::ConnectionLost`] if the
    ///   exchanger stops before the reply arrives
    /// - [`ExchangeError::Transport`] if the call cannot be written
    pub async fn exchange(&self, payload: &[u8]) -> Result<Vec<u8>, ExchangeError> {
        self.exchange_with_timeout(payload, self.inner.config.timeout)
            .await
    }

    /// Like [`exchange`](Self::exchange) with an explicit timeout.
    ///
    /// The timeout covers writing the call as well as waiting for the reply.
    ///
    /// # Errors
    ///
    /// See [`exchange`](Self::exchange).
    pub async fn exchange_with_timeout(
        &self,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, ExchangeError> {
        let inner = &self.inner;
        inner.ensure_open()?;

        let (correlation_id, reply) = inner.register();
        let _guard = PendingGuard {
            pending: &inner.pending,
            correlation_id,
        };
        // close() may have drained the table between the check and the insert.
        inner.ensure_open()?;

        let frame = codec::encode(correlation_id, payload);
        let round_trip = async {
            inner.writer.lock().await.write_frame(frame).await?;
            trace!(correlation_id, transport = %inner.metadata.id, "call sent");
            match reply.await {
                Ok(result) => result,
                Err(_) => Err(inner.closed_error()),
            }
        };

        match tokio::time::timeout(timeout, round_trip).await {
            Ok(result) => result,
            Err(_) => {
                debug!(
                    correlation_id,
                    transport = %inner.metadata.id,
                    ?timeout,
                    "call timed out"
                );
                Err(ExchangeError::Timeout {
                    correlation_id,
                    duration: timeout,
                })
            }
        }
    }

    /// Installs the handler that answers inbound calls.
    ///
    /// Calls that arrive before a handler is installed are answered with a
    /// dispatch error.
    pub fn set_handler<F, Fut>(&self, handler: F)
    where
        F: Fn(Vec<u8>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Vec<u8>> + Send + 'static,
    {
        let handler: InboundHandler = Arc::new(move |payload| Box::pin(handler(payload)));
        *self.inner.handler.write() = Some(handler);
    }

    /// Installs a callback that runs when the connection fails.
    ///
    /// It does not run for a local [`close`](Self::close).
    pub fn set_disconnect_handler<F>(&self, handler: F)
    where
        F: Fn(&TransportMetadata, &ExchangeError) + Send + Sync + 'static,
    {
        *self.inner.disconnect_handler.write() = Some(Arc::new(handler));
    }

    /// Shuts the exchanger down.
    ///
    /// Stops the read loop, releases every waiting caller with
    /// [`ExchangeError::Closed`] and closes the connection. Calling it again
    /// does nothing.
    pub async fn close(&self) {
        let inner = &self.inner;
        if inner.shutdown_requested.swap(true, Ordering::SeqCst) {
            return;
        }
        inner.closed.store(true, Ordering::SeqCst);
        inner.shutdown.cancel();

        let released = inner.pending.fail_all(|| ExchangeError::Closed);
        if let Err(e) = inner.writer.lock().await.close().await {
            debug!(transport = %inner.metadata.id, error = %e, "error closing connection");
        }
        info!(
            transport = %inner.metadata.id,
            peer_id = ?inner.metadata.peer_id,
            released,
            "exchanger closed"
        );
    }

    /// Returns `true` once the exchanger was closed or its connection failed.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Number of calls waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Metadata of the underlying connection.
    pub fn metadata(&self) -> &TransportMetadata {
        &self.inner.metadata
    }

    /// The configuration this exchanger was built with.
    pub fn config(&self) -> &ExchangerConfig {
        &self.inner.config
    }
}

impl fmt::Debug for Exchanger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchanger")
            .field("transport", &self.inner.metadata.id)
            .field("peer_id", &self.inner.metadata.peer_id)
            .field("closed", &self.is_closed())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl Inner {
    fn ensure_open(&self) -> Result<(), ExchangeError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(self.closed_error())
        } else {
            Ok(())
        }
    }

    fn closed_error(&self) -> ExchangeError {
        match self.lost_reason.lock().clone() {
            Some(reason) => ExchangeError::ConnectionLost { reason },
            None => ExchangeError::Closed,
        }
    }

    fn register(&self) -> (i64, oneshot::Receiver<ReplyResult>) {
        loop {
            let correlation_id = self.ids.next();
            if let Some(reply) = self.pending.register(correlation_id) {
                return (correlation_id, reply);
            }
        }
    }

    fn route_frame(
        self: &Arc<Self>,
        frame: Vec<u8>,
        calls: Option<&mpsc::UnboundedSender<(i64, Vec<u8>)>>,
    ) {
        let frame = match codec::decode(&frame) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(transport = %self.metadata.id, error = %e, "dropping malformed frame");
                return;
            }
        };

        match frame.kind() {
            FrameKind::Reply => {
                if !self.pending.complete(frame.call_id(), frame.payload.to_vec()) {
                    warn!(
                        transport = %self.metadata.id,
                        correlation_id = frame.call_id(),
                        "dropping reply for unknown or expired call"
                    );
                }
            }
            FrameKind::Call => {
                let call_id = frame.call_id();
                let payload = frame.payload.to_vec();
                match calls {
                    Some(calls) => {
                        let _ = calls.send((call_id, payload));
                    }
                    None => {
                        let inner = Arc::clone(self);
                        tokio::spawn(async move { inner.answer(call_id, payload).await });
                    }
                }
            }
        }
    }

    async fn answer(&self, call_id: i64, payload: Vec<u8>) {
        let handler = self.handler.read().clone();
        let reply = match handler {
            Some(handler) => handler(payload).await,
            None => {
                warn!(transport = %self.metadata.id, correlation_id = call_id, "no inbound handler installed");
                let reply =
                    ReplyPayload::dispatch_error(&DispatchError::new("no inbound handler installed"));
                serde_json::to_vec(&reply).unwrap_or_default()
            }
        };

        let frame = codec::encode_reply(call_id, &reply);
        if let Err(e) = self.writer.lock().await.write_frame(frame).await {
            debug!(
                transport = %self.metadata.id,
                correlation_id = call_id,
                error = %e,
                "failed to write reply"
            );
        }
    }

    fn connection_failed(&self, error: TransportError) {
        if self.shutdown_requested.load(Ordering::SeqCst) {
            debug!(transport = %self.metadata.id, "read loop stopped after close");
            return;
        }

        let reason = error.to_string();
        *self.lost_reason.lock() = Some(reason.clone());
        self.closed.store(true, Ordering::SeqCst);
        info!(
            transport = %self.metadata.id,
            peer_id = ?self.metadata.peer_id,
            %reason,
            "connection lost"
        );

        let handler = self.disconnect_handler.read().clone();
        if let Some(handler) = handler {
            handler(
                &self.metadata,
                &ExchangeError::ConnectionLost {
                    reason: reason.clone(),
                },
            );
        }
        self.pending.fail_all(|| ExchangeError::ConnectionLost {
            reason: reason.clone(),
        });
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Removes a pending entry when the calling future finishes or is dropped.
struct PendingGuard<'a> {
    pending: &'a PendingReplies,
    correlation_id: i64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.cancel(self.correlation_id);
    }
}

async fn read_loop(
    inner: Weak<Inner>,
    mut reader: Box<dyn FrameReader>,
    shutdown: CancellationToken,
    calls: Option<mpsc::UnboundedSender<(i64, Vec<u8>)>>,
) {
    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => return,
            frame = reader.read_frame() => frame,
        };
        let Some(inner) = inner.upgrade() else {
            return;
        };
        match frame {
            Ok(frame) => inner.route_frame(frame, calls.as_ref()),
            Err(e) => {
                inner.connection_failed(e);
                return;
            }
        }
    }
}

async fn serial_dispatch(inner: Weak<Inner>, mut calls: mpsc::UnboundedReceiver<(i64, Vec<u8>)>) {
    while let Some((call_id, payload)) = calls.recv().await {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        inner.answer(call_id, payload).await;
    }
}
