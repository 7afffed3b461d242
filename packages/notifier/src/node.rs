//! Node Events
//!
//! The node delivers new transactions and connected blocks over a channel, one
//! event at a time and in order. Each item exposes its identifying hash in
//! internal byte order and its canonical raw serialization.

use std::fmt;
use std::sync::Arc;

use alloy::consensus::{Block, TxEnvelope};
use alloy::eips::eip2718::{Decodable2718, Encodable2718};
use alloy::primitives::{Bytes, B256};
use alloy::rlp::Decodable;
use thiserror::Error;
use tokio::sync::mpsc;

/// Capacity of the node event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// A transaction or block as seen by the notifier
pub trait NodeItem: Send + Sync {
    /// Identifying hash in internal byte order
    fn hash(&self) -> B256;

    /// Canonical raw serialization
    fn to_raw(&self) -> Bytes;
}

impl NodeItem for TxEnvelope {
    fn hash(&self) -> B256 {
        *self.tx_hash()
    }

    fn to_raw(&self) -> Bytes {
        self.encoded_2718().into()
    }
}

impl NodeItem for Block<TxEnvelope> {
    fn hash(&self) -> B256 {
        self.header.hash_slow()
    }

    fn to_raw(&self) -> Bytes {
        alloy::rlp::encode(self).into()
    }
}

/// Event emitted by the node
#[derive(Clone)]
pub enum NodeEvent {
    /// A new transaction entered the node
    Transaction(Arc<dyn NodeItem>),
    /// A block was connected to the main chain
    BlockConnected(Arc<dyn NodeItem>),
}

impl NodeEvent {
    pub fn transaction(tx: impl NodeItem + 'static) -> Self {
        NodeEvent::Transaction(Arc::new(tx))
    }

    pub fn block(block: impl NodeItem + 'static) -> Self {
        NodeEvent::BlockConnected(Arc::new(block))
    }

    /// Short name used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            NodeEvent::Transaction(_) => "tx",
            NodeEvent::BlockConnected(_) => "block",
        }
    }
}

impl fmt::Debug for NodeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let item = match self {
            NodeEvent::Transaction(item) | NodeEvent::BlockConnected(item) => item,
        };
        f.debug_struct("NodeEvent")
            .field("kind", &self.kind())
            .field("hash", &item.hash())
            .finish()
    }
}

/// Sending half, held by the node
pub type NodeEventSender = mpsc::Sender<NodeEvent>;

/// Receiving half, consumed by the publisher
pub type NodeEvents = mpsc::Receiver<NodeEvent>;

/// Create a node event channel with the default capacity
pub fn channel() -> (NodeEventSender, NodeEvents) {
    mpsc::channel(DEFAULT_EVENT_CAPACITY)
}

/// Errors that can occur while decoding node items
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Empty input data")]
    EmptyInput,

    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Failed to decode: {0}")]
    Rlp(String),
}

/// Parse a hex string to bytes (with or without 0x prefix)
pub fn hex_to_bytes(hex_str: &str) -> Result<Vec<u8>, DecodeError> {
    let hex_str = hex_str.trim();
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    Ok(hex::decode(hex_str)?)
}

/// Decode an EIP-2718 encoded transaction
pub fn decode_transaction(raw: &[u8]) -> Result<TxEnvelope, DecodeError> {
    if raw.is_empty() {
        return Err(DecodeError::EmptyInput);
    }

    TxEnvelope::decode_2718(&mut &raw[..]).map_err(|e| DecodeError::Rlp(e.to_string()))
}

/// Decode an RLP encoded block
pub fn decode_block(raw: &[u8]) -> Result<Block<TxEnvelope>, DecodeError> {
    if raw.is_empty() {
        return Err(DecodeError::EmptyInput);
    }

    <Block<TxEnvelope> as Decodable>::decode(&mut &raw[..])
        .map_err(|e| DecodeError::Rlp(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedItem(B256, &'static [u8]);

    impl NodeItem for FixedItem {
        fn hash(&self) -> B256 {
            self.0
        }

        fn to_raw(&self) -> Bytes {
            Bytes::from_static(self.1)
        }
    }

    #[test]
    fn test_event_kind() {
        let tx = NodeEvent::transaction(FixedItem(B256::ZERO, b""));
        let block = NodeEvent::block(FixedItem(B256::ZERO, b""));
        assert_eq!(tx.kind(), "tx");
        assert_eq!(block.kind(), "block");
    }

    #[test]
    fn test_event_debug_includes_hash() {
        let event = NodeEvent::transaction(FixedItem(B256::repeat_byte(0xab), b""));
        let debug = format!("{:?}", event);
        assert!(debug.contains("tx"));
        assert!(debug.contains("abab"));
    }

    #[tokio::test]
    async fn test_channel_preserves_order() {
        let (sender, mut events) = channel();
        for i in 0..3u8 {
            sender
                .send(NodeEvent::transaction(FixedItem(B256::repeat_byte(i), b"")))
                .await
                .unwrap();
        }
        drop(sender);

        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            if let NodeEvent::Transaction(item) = event {
                seen.push(item.hash()[0]);
            }
        }
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_hex_to_bytes_with_prefix() {
        assert_eq!(hex_to_bytes("0x38ed1739").unwrap(), vec![0x38, 0xed, 0x17, 0x39]);
    }

    #[test]
    fn test_hex_to_bytes_without_prefix() {
        assert_eq!(hex_to_bytes("38ed1739").unwrap(), vec![0x38, 0xed, 0x17, 0x39]);
    }

    #[test]
    fn test_hex_to_bytes_trims_whitespace() {
        assert_eq!(hex_to_bytes("  0xdead\n").unwrap(), vec![0xde, 0xad]);
    }

    #[test]
    fn test_hex_to_bytes_invalid() {
        assert!(matches!(hex_to_bytes("0xGGGG"), Err(DecodeError::Hex(_))));
    }

    #[test]
    fn test_decode_transaction_empty_input() {
        assert!(matches!(decode_transaction(&[]), Err(DecodeError::EmptyInput)));
    }

    #[test]
    fn test_decode_transaction_invalid_bytes() {
        let result = decode_transaction(&[0xff, 0xff, 0xff, 0xff]);
        assert!(matches!(result, Err(DecodeError::Rlp(_))));
    }

    #[test]
    fn test_decode_block_empty_input() {
        assert!(matches!(decode_block(&[]), Err(DecodeError::EmptyInput)));
    }

    #[test]
    fn test_decode_block_invalid_bytes() {
        assert!(matches!(decode_block(&[0x01, 0x02]), Err(DecodeError::Rlp(_))));
    }
}
