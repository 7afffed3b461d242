//! TxnScope Notifier Library
//!
//! This crate republishes node events (new transactions, connected blocks) on
//! ZeroMQ PUB sockets under the `hashtx`, `rawtx`, `hashblock` and `rawblock`
//! topics, so subscribers can follow the chain without polling the node.

pub mod config;
pub mod hash;
pub mod node;
pub mod publisher;
pub mod sockets;
pub mod transport;

// Re-export commonly used types
pub use config::{NotifierConfig, Topic};
pub use hash::{reverse, reverse_hash, HashError};
pub use node::{NodeEvent, NodeEventSender, NodeEvents, NodeItem};
pub use publisher::{PublishError, Publisher, PublisherBuilder};
pub use sockets::{EndpointRegistry, SocketError};
pub use transport::{Frames, PubSocket, SocketFactory, TransportError, ZmqSocketFactory};
