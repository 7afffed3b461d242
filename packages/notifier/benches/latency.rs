//! Latency benchmarks for the notifier hot path
//!
//! Every node event costs one hash reversal and two registry sends, so these
//! are measured in isolation and together.

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use alloy::primitives::{Bytes, B256};
use txnscope_notifier::hash::reverse_hash;
use txnscope_notifier::node::{self, NodeEvent, NodeItem};
use txnscope_notifier::{
    EndpointRegistry, Frames, NotifierConfig, PubSocket, Publisher, SocketFactory, TransportError,
};

/// Socket that accepts and discards everything
struct NullSocket;

#[async_trait]
impl PubSocket for NullSocket {
    async fn bind(&mut self, _address: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn unbind(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(&mut self, frames: Frames) -> Result<(), TransportError> {
        black_box(frames);
        Ok(())
    }
}

struct NullFactory;

impl SocketFactory for NullFactory {
    fn create(&mut self, _address: &str) -> Box<dyn PubSocket> {
        Box::new(NullSocket)
    }
}

struct Block(B256, Bytes);

impl NodeItem for Block {
    fn hash(&self) -> B256 {
        self.0
    }

    fn to_raw(&self) -> Bytes {
        self.1.clone()
    }
}

/// Benchmark hash byte-order reversal
fn bench_reverse_hash(c: &mut Criterion) {
    let hash = [0xabu8; 32];

    c.bench_function("reverse_hash", |b| {
        b.iter(|| black_box(reverse_hash(black_box(&hash))))
    });
}

/// Benchmark registry routing for registered and disabled topics
fn bench_registry_send(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut registry = EndpointRegistry::new(NullFactory);
    registry.register("rawtx", "tcp://127.0.0.1:28333").unwrap();
    let payload = bytes::Bytes::from(vec![0u8; 250]);

    c.bench_function("registry_send_registered", |b| {
        b.iter(|| runtime.block_on(registry.send("rawtx", payload.clone())))
    });

    c.bench_function("registry_send_disabled", |b| {
        b.iter(|| runtime.block_on(registry.send("hashtx", payload.clone())))
    });
}

/// Benchmark one block event through the publisher
fn bench_publish_block(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let config = NotifierConfig {
        pub_hash_block: Some("tcp://127.0.0.1:28332".to_string()),
        pub_raw_block: Some("tcp://127.0.0.1:28332".to_string()),
        ..Default::default()
    };
    let (_sender, events) = node::channel();
    let mut publisher = Publisher::builder(config)
        .events(events)
        .socket_factory(NullFactory)
        .build()
        .unwrap();
    runtime.block_on(publisher.open()).unwrap();

    let event = NodeEvent::block(Block(B256::repeat_byte(7), Bytes::from(vec![0u8; 1_000_000])));

    c.bench_function("publish_block_1mb", |b| {
        b.iter(|| runtime.block_on(publisher.handle(event.clone())))
    });
}

criterion_group!(benches, bench_reverse_hash, bench_registry_send, bench_publish_block);

criterion_main!(benches);
