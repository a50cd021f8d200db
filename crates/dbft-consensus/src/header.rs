//! Candidate block header and finalized block.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Hash, Transaction};

/// Header of the block being agreed on.
///
/// Validators sign [`BlockHeader::hash`]; the transaction set is committed
/// through `transactions_root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub prev_hash: Hash,
    /// Merkle root over the proposal's transaction hashes, in order.
    pub transactions_root: Hash,
    pub timestamp: u32,
    pub height: u32,
    /// Primary-chosen nonce.
    pub consensus_data: u64,
    pub next_producer: Address,
}

impl BlockHeader {
    /// Fixed little-endian encoding of every field, the input to signing.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut msg = Vec::with_capacity(4 + 32 + 32 + 4 + 4 + 8 + 20);
        msg.extend_from_slice(&self.version.to_le_bytes());
        msg.extend_from_slice(self.prev_hash.as_bytes());
        msg.extend_from_slice(self.transactions_root.as_bytes());
        msg.extend_from_slice(&self.timestamp.to_le_bytes());
        msg.extend_from_slice(&self.height.to_le_bytes());
        msg.extend_from_slice(&self.consensus_data.to_le_bytes());
        msg.extend_from_slice(&self.next_producer.0);
        msg
    }

    /// Header hash.
    pub fn hash(&self) -> Hash {
        Hash::from_bytes(&self.signing_bytes())
    }
}

/// A block with quorum agreement, ready to hand to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Block hash (the header hash).
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }
}
