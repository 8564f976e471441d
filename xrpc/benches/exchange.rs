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

//! Exchange benchmarks for xrpc
//!
//! Measures:
//! - Correlation framing cost for different payload sizes
//! - Raw exchanger round trips over an in-memory connection
//! - Executor dispatch without a connection
//! - Full node-to-node calls including JSON envelopes

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde::{Deserialize, Serialize};
use std::hint::black_box;
use xrpc::codec;
use xrpc::exchanger::{Exchanger, ExchangerConfig, InboundDispatch};
use xrpc::executor::Executor;
use xrpc::node::{Node, NodeConfig};
use xrpc::registry::{MethodDescriptor, Registry};
use xrpc::transport::MemoryConnection;
use xrpc::{CallPayload, CallerInfo};

const SIZES: [usize; 3] = [100, 1024, 10240];

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Pair {
    #[serde(rename = "A")]
    a: i64,
    #[serde(rename = "B")]
    b: i64,
}

fn calc_executor() -> Executor {
    let registry = Registry::new();
    registry
        .register_method(MethodDescriptor::new(
            "Calc.Product",
            |_: CallerInfo, args: Pair| async move { Ok::<_, String>(args.a * args.b) },
        ))
        .unwrap();
    Executor::new(registry)
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    for size in SIZES {
        let payload = vec![7u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("encode", size), &payload, |b, payload| {
            b.iter(|| codec::encode(black_box(42), black_box(payload)));
        });

        let frame = codec::encode(42, &payload);
        group.bench_with_input(BenchmarkId::new("decode", size), &frame, |b, frame| {
            b.iter(|| codec::decode(black_box(frame)).unwrap());
        });
    }

    group.finish();
}

fn bench_exchange_round_trip(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("exchange_round_trip");

    for dispatch in [InboundDispatch::Serial, InboundDispatch::Concurrent] {
        let (client, server) = rt.block_on(async {
            let config = ExchangerConfig::default().with_inbound_dispatch(dispatch);
            let (a, b) = MemoryConnection::pair_default();
            let client = Exchanger::new(Box::new(a), config.clone());
            let server = Exchanger::new(Box::new(b), config);
            server.set_handler(|payload: Vec<u8>| async move { payload });
            (client, server)
        });

        for size in SIZES {
            let payload = vec![1u8; size];
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{dispatch:?}"), size),
                &payload,
                |b, payload| {
                    b.to_async(&rt)
                        .iter(|| async { client.exchange(payload).await.unwrap() });
                },
            );
        }

        rt.block_on(async {
            client.close().await;
            server.close().await;
        });
    }

    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let executor = calc_executor();
    let call = CallPayload::new(CallerInfo::new("bench"), "Calc.Product", &Pair { a: 3, b: 4 })
        .unwrap();

    c.bench_function("executor_execute", |b| {
        b.to_async(&rt)
            .iter(|| async { executor.execute(black_box(call.clone())).await });
    });
}

fn bench_node_call(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (client, server) = rt.block_on(async {
        let server = Node::with_config(calc_executor(), NodeConfig::default().with_node_id("server"));
        let client = Node::with_config(
            Executor::new(Registry::new()),
            NodeConfig::default().with_node_id("client"),
        );
        let (a, b) = MemoryConnection::pair_default();
        client.add_peer_connection("server", Box::new(a));
        server.add_peer_connection("client", Box::new(b));
        (client, server)
    });

    c.bench_function("node_call", |b| {
        b.to_async(&rt).iter(|| async {
            let product: i64 = client
                .call("server", "Calc.Product", &Pair { a: 3, b: 4 })
                .await
                .unwrap();
            product
        });
    });

    rt.block_on(async {
        client.shutdown().await;
        server.shutdown().await;
    });
}

criterion_group!(
    benches,
    bench_codec,
    bench_exchange_round_trip,
    bench_execute,
    bench_node_call
);
criterion_main!(benches);
