//! In-memory collaborators for exercising a round end to end.
//!
//! [`TestNetwork`] holds `N` validator keys and a chain tip; each validator
//! gets its own [`RoundContext`] reset against the same chain so payloads
//! built by one can be fed to the others.

use std::collections::HashMap;

use dbft_consensus::{
    ChainView, ContextConfig, Hash, KeySource, LocalValidatorKey, PublicKey, RoundContext,
    Transaction, TransactionSource,
};

/// Chain tip and validator set.
#[derive(Debug, Clone)]
pub struct MemoryChain {
    pub height: u32,
    pub tip: Hash,
    pub validators: Vec<PublicKey>,
}

impl MemoryChain {
    /// Append a block, moving the tip.
    pub fn push_block(&mut self, hash: Hash) {
        self.height += 1;
        self.tip = hash;
    }
}

impl ChainView for MemoryChain {
    fn current_height(&self) -> u32 {
        self.height
    }

    fn current_hash(&self) -> Hash {
        self.tip
    }

    fn active_validators(&self) -> Vec<PublicKey> {
        self.validators.clone()
    }
}

/// Transaction pool keyed by hash.
#[derive(Debug, Clone, Default)]
pub struct MemoryPool {
    txs: HashMap<Hash, Transaction>,
}

impl MemoryPool {
    pub fn insert(&mut self, tx: Transaction) -> Hash {
        let hash = tx.hash();
        self.txs.insert(hash, tx);
        hash
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }
}

impl TransactionSource for MemoryPool {
    fn lookup(&self, hash: &Hash) -> Option<Transaction> {
        self.txs.get(hash).cloned()
    }
}

/// A set of validators sharing one chain.
#[derive(Debug)]
pub struct TestNetwork {
    pub keys: Vec<LocalValidatorKey>,
    pub chain: MemoryChain,
}

impl TestNetwork {
    /// `n` validators with deterministic keys, chain tip at `height`.
    pub fn new(n: u8, height: u32) -> Self {
        let keys: Vec<_> = (0..n)
            .map(|i| LocalValidatorKey::from_seed([i.wrapping_add(1); 32]))
            .collect();
        let chain = MemoryChain {
            height,
            tip: Hash::from_bytes(&height.to_le_bytes()),
            validators: keys.iter().map(|k| k.public_key()).collect(),
        };
        Self { keys, chain }
    }

    /// A context for validator `index`, reset against the chain.
    pub fn context(&self, index: usize) -> RoundContext {
        self.context_with(index, ContextConfig::default())
    }

    pub fn context_with(&self, index: usize, config: ContextConfig) -> RoundContext {
        let mut ctx = RoundContext::new(config);
        ctx.reset(&self.chain, &self.keys[index])
            .expect("test network has validators");
        ctx
    }

    /// Contexts for every validator.
    pub fn contexts(&self) -> Vec<RoundContext> {
        (0..self.keys.len()).map(|i| self.context(i)).collect()
    }
}

/// `count` distinct transactions.
pub fn sample_transactions(count: usize) -> Vec<Transaction> {
    (0..count)
        .map(|i| Transaction::new(format!("transfer #{}", i).into_bytes()))
        .collect()
}
