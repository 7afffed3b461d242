//! Hash Byte Order
//!
//! Nodes keep hashes in internal byte order. Hash topics carry them in display
//! order, which is the same 32 bytes reversed.

use alloy::primitives::B256;
use thiserror::Error;

/// Length of every hash published on a `hash*` topic
pub const HASH_LEN: usize = 32;

/// Errors that can occur while converting hashes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("Hash must be exactly 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Reverse a 32-byte hash from internal order to display order
///
/// Output byte `i` is input byte `31 - i`.
///
/// # Returns
/// The reversed hash, or `HashError::InvalidLength` if `hash` is not 32 bytes
pub fn reverse_hash(hash: &[u8]) -> Result<[u8; HASH_LEN], HashError> {
    if hash.len() != HASH_LEN {
        return Err(HashError::InvalidLength(hash.len()));
    }

    let mut out = [0u8; HASH_LEN];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = hash[HASH_LEN - 1 - i];
    }
    Ok(out)
}

/// Reverse a typed hash. Cannot fail since `B256` is always 32 bytes.
pub fn reverse(hash: B256) -> B256 {
    let mut bytes = hash.0;
    bytes.reverse();
    B256::from(bytes)
}
