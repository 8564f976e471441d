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

//! Circular relay across many peers hanging off one hub.
//!
//! Every hop nests inside the previous call: peer `i` calls the hub, which
//! calls peer `i + 1`, which calls the hub again, and so on. The chain only
//! unwinds once the hop limit is reached, so the test fails by timing out
//! if any reply is lost, misrouted, or stuck behind a busy connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use xrpc::exchanger::{ExchangerConfig, InboundDispatch};
use xrpc::executor::Executor;
use xrpc::node::{Node, NodeConfig};
use xrpc::registry::Registry;
use xrpc::service;
use xrpc::transport::MemoryConnection;

const PEERS: u64 = 100;
const HOPS: u64 = 1000;

fn peer_id(i: u64) -> String {
    format!("peer-{i}")
}

struct Hub {
    node: OnceLock<Node>,
}

#[service]
impl Hub {
    /// Forwards hop `hop` to the peer whose turn it is.
    pub async fn pass_the_buck(&self, hop: u64) -> Result<(), String> {
        let node = self.node.get().ok_or("hub not started")?;
        node.call(&peer_id(hop % PEERS), "Relay.PassTheBuck", &hop)
            .await
            .map_err(|e| e.to_string())
    }
}

struct Relay {
    node: OnceLock<Node>,
    visits: AtomicU64,
    total: Arc<AtomicU64>,
}

#[service]
impl Relay {
    pub async fn pass_the_buck(&self, hop: u64) -> Result<(), String> {
        self.visits.fetch_add(1, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        if hop + 1 >= HOPS {
            return Ok(());
        }
        let node = self.node.get().ok_or("relay not started")?;
        node.call("hub", "Hub.PassTheBuck", &(hop + 1))
            .await
            .map_err(|e| e.to_string())
    }
}

/// Logs through the test writer; set `RUST_LOG` to see node activity.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config(id: &str) -> NodeConfig {
    // Nested calls revisit connections that are already busy answering an
    // outer hop, so inbound calls must not queue behind each other.
    NodeConfig::default().with_node_id(id).with_exchanger(
        ExchangerConfig::default()
            .with_timeout(Duration::from_secs(120))
            .with_inbound_dispatch(InboundDispatch::Concurrent),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_relay_ring_visits_every_peer() {
    init_tracing();
    let hub = Arc::new(Hub {
        node: OnceLock::new(),
    });
    let registry = Registry::new();
    registry.register_arc(hub.clone()).unwrap();
    let hub_node = Node::with_config(Executor::new(registry), config("hub"));
    assert!(hub.node.set(hub_node.clone()).is_ok());

    let total = Arc::new(AtomicU64::new(0));
    let mut relays = Vec::new();
    let mut nodes = Vec::new();
    for i in 0..PEERS {
        let relay = Arc::new(Relay {
            node: OnceLock::new(),
            visits: AtomicU64::new(0),
            total: total.clone(),
        });
        let registry = Registry::new();
        registry.register_arc(relay.clone()).unwrap();
        let node = Node::with_config(Executor::new(registry), config(&peer_id(i)));
        assert!(relay.node.set(node.clone()).is_ok());

        let (to_hub, from_peer) = MemoryConnection::pair_default();
        node.add_peer_connection("hub", Box::new(to_hub));
        hub_node.add_peer_connection(&peer_id(i), Box::new(from_peer));

        relays.push(relay);
        nodes.push(node);
    }
    assert_eq!(hub_node.peer_ids().len(), PEERS as usize);

    tokio::time::timeout(
        Duration::from_secs(60),
        nodes[0].call::<_, ()>("hub", "Hub.PassTheBuck", &0u64),
    )
    .await
    .expect("relay chain deadlocked")
    .unwrap();

    assert_eq!(total.load(Ordering::SeqCst), HOPS);
    for (i, relay) in relays.iter().enumerate() {
        assert_eq!(
            relay.visits.load(Ordering::SeqCst),
            HOPS / PEERS,
            "peer {i} visited the wrong number of times"
        );
    }

    for node in &nodes {
        assert_eq!(
            node.exchanger("hub").await.unwrap().pending_count(),
            0,
            "{} leaked a pending call",
            node.id()
        );
        node.shutdown().await;
    }
    hub_node.shutdown().await;
}
