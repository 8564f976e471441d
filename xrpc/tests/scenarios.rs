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

//! End-to-end call scenarios between in-process nodes.
//!
//! Peers are wired together with in-memory connection pairs so the tests
//! exercise the full path: node routing, exchanger framing, executor
//! dispatch and the `#[service]` registration adapter.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use xrpc::executor::{Executor, StaticTokens};
use xrpc::node::Node;
use xrpc::registry::Registry;
use xrpc::transport::MemoryConnection;
use xrpc::{CallPayload, CallerInfo, Unused, XrpcError, service};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Pair {
    #[serde(rename = "A")]
    a: i64,
    #[serde(rename = "B")]
    b: i64,
}

#[derive(Default)]
struct Calc {
    invocations: AtomicUsize,
}

#[service]
impl Calc {
    pub fn product(&self, args: Pair) -> Result<i64, String> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(args.a * args.b)
    }

    pub async fn whoami(&self, info: CallerInfo, _: Unused) -> Result<String, String> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(info.caller_id)
    }
}

fn node(id: &str, executor: Executor) -> Node {
    Node::with_config(
        executor,
        xrpc::node::NodeConfig::default().with_node_id(id),
    )
}

fn calc_executor() -> (Executor, Arc<Calc>) {
    let calc = Arc::new(Calc::default());
    let registry = Registry::new();
    registry.register_arc(calc.clone()).unwrap();
    (Executor::new(registry), calc)
}

/// Links `a` and `b` with an in-memory connection, each knowing the other
/// by id.
fn link(a: &Node, b: &Node) {
    let (left, right) = MemoryConnection::pair_default();
    a.add_peer_connection(b.id(), Box::new(left));
    b.add_peer_connection(a.id(), Box::new(right));
}

#[tokio::test]
async fn test_client_calls_server_product() {
    let (executor, _) = calc_executor();
    let server = node("server", executor);
    let client = node("client", Executor::new(Registry::new()));
    link(&client, &server);

    let product: i64 = client
        .call("server", "Calc.Product", &Pair { a: 3, b: 4 })
        .await
        .unwrap();
    assert_eq!(product, 12);

    let caller: String = client.call("server", "Calc.Whoami", &Unused).await.unwrap();
    assert_eq!(caller, "client");

    client.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_self_loop_matches_in_process_call() {
    let (executor, calc) = calc_executor();
    let node = node("loop", executor);
    let (outbound, inbound) = MemoryConnection::pair_default();
    node.add_peer_connection("self", Box::new(outbound));
    node.add_peer_connection("self-inbound", Box::new(inbound));

    let args = Pair { a: -6, b: 7 };
    let remote: i64 = node.call("self", "Calc.Product", &args).await.unwrap();
    let local = calc.product(args).unwrap();
    assert_eq!(remote, local);
    assert_eq!(calc.invocations.load(Ordering::SeqCst), 2);

    node.shutdown().await;
}

#[tokio::test]
async fn test_unregistered_method_is_a_transport_error() {
    let (executor, _) = calc_executor();

    let call = CallPayload::new(CallerInfo::new("c"), "Foo.Bar", &Unused).unwrap();
    let reply = executor.execute(call).await;
    assert_eq!(reply.transport_error, "no method registered: Foo.Bar");
    assert!(reply.result.is_none());
    assert!(reply.error.is_empty());

    let server = node("server", executor);
    let client = node("client", Executor::new(Registry::new()));
    link(&client, &server);

    let err = client
        .call::<_, serde_json::Value>("server", "Foo.Bar", &Unused)
        .await
        .unwrap_err();
    assert!(err.is_transport_error());
    assert_eq!(err.to_string(), "no method registered: Foo.Bar");

    client.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_rejected_token_never_reaches_handler() {
    let (executor, calc) = calc_executor();
    let server = node(
        "server",
        executor.with_authenticator(StaticTokens::new(["good-token"])),
    );
    let client = node("client", Executor::new(Registry::new()));
    link(&client, &server);

    let failures = Arc::new(AtomicUsize::new(0));
    let observed = failures.clone();
    client.on_authentication_failed(move |peer| {
        assert_eq!(peer, "server");
        observed.fetch_add(1, Ordering::SeqCst);
    });

    client.set_token("stolen-token");
    let err = client
        .call::<_, i64>("server", "Calc.Product", &Pair { a: 1, b: 2 })
        .await
        .unwrap_err();
    assert!(err.is_authentication_invalid());
    assert!(matches!(err, XrpcError::Dispatch(ref e) if e.authentication_invalid));
    assert_eq!(calc.invocations.load(Ordering::SeqCst), 0);
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    assert!(client.token().is_empty());

    client.set_token("good-token");
    let product: i64 = client
        .call("server", "Calc.Product", &Pair { a: 1, b: 2 })
        .await
        .unwrap();
    assert_eq!(product, 2);
    assert_eq!(calc.invocations.load(Ordering::SeqCst), 1);

    client.shutdown().await;
    server.shutdown().await;
}
