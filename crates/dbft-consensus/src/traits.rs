//! Interfaces the round state needs from the rest of the node.

use crate::error::Result;
use crate::keys::SealedPayload;
use crate::message::ConsensusPayload;
use crate::types::{Hash, PublicKey, Signature, Transaction};

/// Read-only snapshot of the local chain.
pub trait ChainView {
    /// Height of the current chain tip.
    fn current_height(&self) -> u32;

    /// Hash of the current chain tip.
    fn current_hash(&self) -> Hash;

    /// Validators for the next block, in consensus order.
    fn active_validators(&self) -> Vec<PublicKey>;
}

/// The local node's signing capability.
pub trait KeySource {
    /// Public key this node signs with.
    fn public_key(&self) -> PublicKey;

    /// Whether this node holds the private key for `key`.
    fn contains(&self, key: &PublicKey) -> bool {
        self.public_key() == *key
    }

    /// Sign arbitrary bytes.
    fn sign(&self, message: &[u8]) -> Signature;
}

/// Candidate transaction pool.
pub trait TransactionSource {
    fn lookup(&self, hash: &Hash) -> Option<Transaction>;
}

/// Turns a logical payload into a signed, transmittable envelope.
pub trait MessageCodec {
    fn seal(&self, payload: &ConsensusPayload) -> Result<SealedPayload>;
}

impl<T: ChainView + ?Sized> ChainView for &T {
    fn current_height(&self) -> u32 {
        (**self).current_height()
    }

    fn current_hash(&self) -> Hash {
        (**self).current_hash()
    }

    fn active_validators(&self) -> Vec<PublicKey> {
        (**self).active_validators()
    }
}

impl<T: TransactionSource + ?Sized> TransactionSource for &T {
    fn lookup(&self, hash: &Hash) -> Option<Transaction> {
        (**self).lookup(hash)
    }
}

impl TransactionSource for std::collections::HashMap<Hash, Transaction> {
    fn lookup(&self, hash: &Hash) -> Option<Transaction> {
        self.get(hash).cloned()
    }
}
