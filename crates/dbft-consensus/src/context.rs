//! Per-round consensus state.
//!
//! A [`RoundContext`] lives for the whole life of the node and is reset at
//! every height. Within a height it moves through views; each view has one
//! primary, chosen by [`primary_index`](crate::primary_index).
//!
//! # Caches
//!
//! The header and the ordered transaction list are memoized in `OnceLock`
//! fields so read-only queries can run under a shared borrow. Every mutation
//! that affects their inputs replaces the lock with an empty one.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use tracing::{debug, trace, warn};

use crate::config::ContextConfig;
use crate::error::{Error, Result};
use crate::header::{Block, BlockHeader};
use crate::message::{
    ChangeView, ConsensusMessage, ConsensusPayload, PrepareRequest, PrepareResponse,
};
use crate::state::ConsensusState;
use crate::threshold;
use crate::traits::{ChainView, KeySource, TransactionSource};
use crate::types::{compute_merkle_root, Address, Hash, PublicKey, Signature, Transaction};

/// Proposal metadata and transaction set for the current view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub timestamp: u32,
    pub nonce: u64,
    pub next_producer: Address,
    pub transaction_hashes: Vec<Hash>,
}

/// Mutable state of one consensus round.
#[derive(Debug, Clone)]
pub struct RoundContext {
    config: ContextConfig,

    state: ConsensusState,
    prev_hash: Hash,
    height: u32,
    view_number: u8,

    /// Validator keys in consensus order, fixed until the next reset.
    validators: Vec<PublicKey>,
    local_index: Option<usize>,
    primary_index: usize,

    timestamp: u32,
    nonce: u64,
    next_block_producer: Address,

    /// `None` until a proposal is adopted.
    transaction_hashes: Option<Vec<Hash>>,
    transactions: HashMap<Hash, Transaction>,

    /// One slot per validator.
    signatures: Vec<Option<Signature>>,
    /// One entry per validator: the view it last asked for.
    expected_view: Vec<u8>,

    cached_header: OnceLock<BlockHeader>,
    cached_tx_list: OnceLock<Vec<Transaction>>,
}

impl Default for RoundContext {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}

impl RoundContext {
    /// Create an empty context. Call [`reset`](Self::reset) before use.
    pub fn new(config: ContextConfig) -> Self {
        Self {
            config,
            state: ConsensusState::INITIAL,
            prev_hash: Hash::ZERO,
            height: 0,
            view_number: 0,
            validators: Vec::new(),
            local_index: None,
            primary_index: 0,
            timestamp: 0,
            nonce: 0,
            next_block_producer: Address::default(),
            transaction_hashes: None,
            transactions: HashMap::new(),
            signatures: Vec::new(),
            expected_view: Vec::new(),
            cached_header: OnceLock::new(),
            cached_tx_list: OnceLock::new(),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn state(&self) -> ConsensusState {
        self.state
    }

    pub fn prev_hash(&self) -> Hash {
        self.prev_hash
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn view_number(&self) -> u8 {
        self.view_number
    }

    pub fn validators(&self) -> &[PublicKey] {
        &self.validators
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    /// This node's position in the validator set, `None` if not a validator.
    pub fn local_index(&self) -> Option<usize> {
        self.local_index
    }

    pub fn primary_index(&self) -> usize {
        self.primary_index
    }

    /// Whether this node is the primary for the current view.
    pub fn is_primary(&self) -> bool {
        threshold::is_primary(self.local_index, self.primary_index)
    }

    /// Whether this node is a validator but not the primary.
    pub fn is_backup(&self) -> bool {
        self.local_index.is_some() && !self.is_primary()
    }

    /// Quorum size `M` for this round's validator set.
    pub fn quorum(&self) -> usize {
        threshold::quorum(self.validators.len())
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn next_block_producer(&self) -> Address {
        self.next_block_producer
    }

    pub fn transaction_hashes(&self) -> Option<&[Hash]> {
        self.transaction_hashes.as_deref()
    }

    pub fn transactions(&self) -> &HashMap<Hash, Transaction> {
        &self.transactions
    }

    pub fn signatures(&self) -> &[Option<Signature>] {
        &self.signatures
    }

    pub fn expected_view(&self) -> &[u8] {
        &self.expected_view
    }

    // ------------------------------------------------------------------
    // Round lifecycle
    // ------------------------------------------------------------------

    /// Start the round for the block after the chain tip.
    ///
    /// Discards all progress of the previous round. An empty validator set
    /// is rejected and leaves the context untouched.
    pub fn reset<C, K>(&mut self, chain: &C, keys: &K) -> Result<()>
    where
        C: ChainView + ?Sized,
        K: KeySource + ?Sized,
    {
        let validators = chain.active_validators();
        if validators.is_empty() {
            warn!(
                height = chain.current_height(),
                "Chain reported an empty validator set"
            );
            return Err(Error::DegenerateValidatorSet);
        }

        let n = validators.len();
        let height = chain.current_height().wrapping_add(1);

        self.state = ConsensusState::INITIAL;
        self.prev_hash = chain.current_hash();
        self.height = height;
        self.view_number = 0;
        self.local_index = validators.iter().position(|v| keys.contains(v));
        self.primary_index = threshold::primary_index(height, 0, n).unwrap_or_default();
        self.validators = validators;
        self.timestamp = 0;
        self.nonce = 0;
        self.next_block_producer = Address::default();
        self.transaction_hashes = None;
        self.transactions.clear();
        self.signatures = vec![None; n];
        self.expected_view = vec![0; n];
        self.invalidate_header();
        self.invalidate_tx_list();

        debug!(
            height,
            prev_hash = %self.prev_hash,
            validators = n,
            local_index = ?self.local_index,
            primary_index = self.primary_index,
            "Reset round"
        );
        Ok(())
    }

    /// Move to `new_view`, rotating the primary.
    ///
    /// Only `SIGNATURE_SENT` survives. Signatures are bound to a view and a
    /// header, so the slots are emptied whenever the view actually changes or
    /// the proposal is dropped. If no signature had been sent, the adopted
    /// transaction set and its bodies are dropped.
    pub fn change_view(&mut self, new_view: u8) -> Result<()> {
        if new_view < self.view_number {
            return Err(Error::ViewRegression {
                current: self.view_number,
                requested: new_view,
            });
        }

        let n = self.validators.len();
        let was_initial = self.state.is_initial();
        let view_changed = new_view != self.view_number;

        self.state.retain(ConsensusState::SIGNATURE_SENT);
        self.view_number = new_view;
        self.primary_index = threshold::primary_index(self.height, new_view, n).unwrap_or_default();

        let unsigned = self.state.is_initial();
        if was_initial || view_changed || unsigned {
            self.signatures = vec![None; n];
        }
        if unsigned {
            self.transaction_hashes = None;
            self.transactions.clear();
            self.invalidate_tx_list();
        }
        self.invalidate_header();

        debug!(
            height = self.height,
            view = new_view,
            primary_index = self.primary_index,
            state = %self.state,
            "Changed view"
        );
        Ok(())
    }

    /// Adopt a proposal for the current view (made locally or received).
    pub fn adopt_proposal(&mut self, proposal: Proposal) -> Result<()> {
        let count = proposal.transaction_hashes.len();
        let max = self.config.max_transactions_per_block;
        if count > max {
            return Err(Error::TooManyTransactions { count, max });
        }

        let mut seen = HashSet::with_capacity(count);
        for hash in &proposal.transaction_hashes {
            if !seen.insert(*hash) {
                return Err(Error::DuplicateTransaction(*hash));
            }
        }

        self.timestamp = proposal.timestamp;
        self.nonce = proposal.nonce;
        self.next_block_producer = proposal.next_producer;
        self.transactions.retain(|hash, _| seen.contains(hash));
        self.transaction_hashes = Some(proposal.transaction_hashes);
        self.state.insert(ConsensusState::PRIMARY_PROPOSED);
        self.invalidate_header();
        self.invalidate_tx_list();

        debug!(
            height = self.height,
            view = self.view_number,
            transactions = count,
            already_resolved = self.transactions.len(),
            "Adopted proposal"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Message construction
    // ------------------------------------------------------------------

    /// Stamp `message` with the current view and wrap it in an envelope.
    pub fn wrap(&self, message: impl Into<ConsensusMessage>) -> Result<ConsensusPayload> {
        let local = self.local_index.ok_or(Error::NotAValidator)?;
        let validator_index =
            u16::try_from(local).map_err(|_| Error::ValidatorIndexOutOfRange {
                index: local,
                validators: self.validators.len(),
            })?;

        let mut message = message.into();
        message.set_view_number(self.view_number);

        Ok(ConsensusPayload {
            version: self.config.version,
            prev_hash: self.prev_hash,
            height: self.height,
            validator_index,
            timestamp: self.timestamp,
            message,
        })
    }

    /// The primary's proposal for the current view, carrying its signature.
    pub fn build_proposal_message(&self) -> Result<ConsensusPayload> {
        let local = self.local_index.ok_or(Error::NotAValidator)?;
        if local != self.primary_index {
            return Err(Error::NotPrimary {
                local,
                primary: self.primary_index,
            });
        }
        let hashes = self.transaction_hashes.as_ref().ok_or(Error::NoProposal)?;
        let signature = self
            .signatures
            .get(local)
            .cloned()
            .flatten()
            .ok_or(Error::NotReady)?;

        self.wrap(PrepareRequest {
            view_number: self.view_number,
            nonce: self.nonce,
            next_producer: self.next_block_producer,
            transaction_hashes: hashes.clone(),
            signature,
        })
    }

    /// A backup's response carrying a signature the caller computed.
    pub fn build_response_message(&self, signature: Signature) -> Result<ConsensusPayload> {
        self.wrap(PrepareResponse {
            view_number: self.view_number,
            signature,
        })
    }

    /// Announce the view this node has asked to move to.
    pub fn build_change_view_message(&self) -> Result<ConsensusPayload> {
        let local = self.local_index.ok_or(Error::NotAValidator)?;
        let new_view_number = self.expected_view.get(local).copied().ok_or(
            Error::ValidatorIndexOutOfRange {
                index: local,
                validators: self.validators.len(),
            },
        )?;
        self.wrap(ChangeView {
            view_number: self.view_number,
            new_view_number,
        })
    }

    // ------------------------------------------------------------------
    // Header and transaction set
    // ------------------------------------------------------------------

    /// Header of the candidate block, `None` until a proposal is adopted.
    pub fn block_header(&self) -> Option<&BlockHeader> {
        let hashes = self.transaction_hashes.as_ref()?;
        Some(self.cached_header.get_or_init(|| BlockHeader {
            version: self.config.version,
            prev_hash: self.prev_hash,
            transactions_root: compute_merkle_root(hashes),
            timestamp: self.timestamp,
            height: self.height,
            consensus_data: self.nonce,
            next_producer: self.next_block_producer,
        }))
    }

    /// Whether `hash` is part of the adopted transaction set.
    pub fn has_hash(&self, hash: &Hash) -> bool {
        self.transaction_hashes
            .as_ref()
            .is_some_and(|hashes| hashes.contains(hash))
    }

    /// Resolved transactions in proposal order.
    pub fn resolved_transactions(&self) -> &[Transaction] {
        self.cached_tx_list.get_or_init(|| {
            self.transaction_hashes
                .iter()
                .flatten()
                .filter_map(|hash| self.transactions.get(hash).cloned())
                .collect()
        })
    }

    /// True once every hash of the adopted set has a body.
    ///
    /// False while no proposal has been adopted.
    pub fn all_hashes_resolved(&self) -> bool {
        match &self.transaction_hashes {
            Some(hashes) => hashes.iter().all(|h| self.transactions.contains_key(h)),
            None => false,
        }
    }

    /// Hashes still waiting for a body, in proposal order.
    pub fn missing_hashes(&self) -> Vec<Hash> {
        self.transaction_hashes
            .iter()
            .flatten()
            .filter(|hash| !self.transactions.contains_key(*hash))
            .copied()
            .collect()
    }

    /// Store a transaction body that belongs to the adopted set.
    ///
    /// Returns `Ok(false)` if it was already known.
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<bool> {
        let hash = tx.hash();
        if self.transaction_hashes.is_none() {
            return Err(Error::NoProposal);
        }
        if !self.has_hash(&hash) {
            return Err(Error::UnexpectedTransaction(hash));
        }
        if self.transactions.contains_key(&hash) {
            return Ok(false);
        }

        self.transactions.insert(hash, tx);
        self.invalidate_tx_list();
        trace!(tx = %hash, resolved = self.transactions.len(), "Added transaction");
        Ok(true)
    }

    /// Drop a transaction body.
    pub fn remove_transaction(&mut self, hash: &Hash) -> Option<Transaction> {
        let removed = self.transactions.remove(hash);
        if removed.is_some() {
            self.invalidate_tx_list();
        }
        removed
    }

    /// Fill missing bodies from the pool. Returns how many were added.
    pub fn resolve_from<S>(&mut self, source: &S) -> Result<usize>
    where
        S: TransactionSource + ?Sized,
    {
        if self.transaction_hashes.is_none() {
            return Err(Error::NoProposal);
        }

        let mut added = 0;
        for hash in self.missing_hashes() {
            let Some(tx) = source.lookup(&hash) else {
                continue;
            };
            if tx.hash() != hash {
                warn!(expected = %hash, got = %tx.hash(), "Pool returned mismatched transaction");
                continue;
            }
            self.transactions.insert(hash, tx);
            added += 1;
        }

        if added > 0 {
            self.invalidate_tx_list();
        }
        trace!(added, missing = self.missing_hashes().len(), "Resolved transactions from pool");
        Ok(added)
    }

    // ------------------------------------------------------------------
    // Signatures
    // ------------------------------------------------------------------

    /// Number of filled signature slots.
    pub fn signature_count(&self) -> usize {
        self.signatures.iter().filter(|s| s.is_some()).count()
    }

    /// Whether enough signatures are collected to finalize.
    pub fn has_signature_quorum(&self) -> bool {
        threshold::meets_quorum(self.signature_count(), self.validators.len())
    }

    /// Record `signature` in validator `index`'s slot.
    ///
    /// Returns `Ok(true)` if the slot was previously empty.
    pub fn set_signature(&mut self, index: usize, signature: Signature) -> Result<bool> {
        let validators = self.signatures.len();
        let slot = self
            .signatures
            .get_mut(index)
            .ok_or(Error::ValidatorIndexOutOfRange { index, validators })?;
        let was_empty = slot.is_none();
        *slot = Some(signature);
        trace!(index, was_empty, "Stored signature");
        Ok(was_empty)
    }

    /// Sign the candidate header with the local key and store it.
    pub fn sign_header<K>(&mut self, keys: &K) -> Result<Signature>
    where
        K: KeySource + ?Sized,
    {
        let local = self.local_index.ok_or(Error::NotAValidator)?;
        let header_hash = self.block_header().ok_or(Error::NoProposal)?.hash();
        let signature = keys.sign(header_hash.as_bytes());
        self.set_signature(local, signature.clone())?;
        Ok(signature)
    }

    /// Record that the local signature has been broadcast.
    pub fn mark_signature_sent(&mut self) {
        self.state.insert(ConsensusState::SIGNATURE_SENT);
    }

    // ------------------------------------------------------------------
    // View change intentions
    // ------------------------------------------------------------------

    /// Record the view validator `index` is asking for.
    pub fn set_expected_view(&mut self, index: usize, view: u8) -> Result<()> {
        let validators = self.expected_view.len();
        let entry = self
            .expected_view
            .get_mut(index)
            .ok_or(Error::ValidatorIndexOutOfRange { index, validators })?;
        *entry = view;
        Ok(())
    }

    /// Ask for the next view. Repeated requests escalate the asked-for view.
    pub fn request_view_change(&mut self) -> Result<u8> {
        let local = self.local_index.ok_or(Error::NotAValidator)?;
        let current = self
            .expected_view
            .get(local)
            .copied()
            .unwrap_or_default()
            .max(self.view_number);
        let requested = current.checked_add(1).ok_or(Error::ViewExhausted)?;

        self.set_expected_view(local, requested)?;
        self.state.insert(ConsensusState::VIEW_CHANGING);
        debug!(
            height = self.height,
            view = self.view_number,
            requested,
            "Requesting view change"
        );
        Ok(requested)
    }

    /// Validators currently asking for exactly `view`.
    pub fn expected_view_count(&self, view: u8) -> usize {
        self.expected_view.iter().filter(|v| **v == view).count()
    }

    /// Whether a quorum of validators asks for `view`.
    pub fn has_view_change_quorum(&self, view: u8) -> bool {
        threshold::meets_quorum(self.expected_view_count(view), self.validators.len())
    }

    // ------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------

    /// Assemble the agreed block and mark it accepted.
    pub fn finalize_block(&mut self) -> Result<Block> {
        if self.transaction_hashes.is_none() {
            return Err(Error::NoProposal);
        }
        let missing = self.missing_hashes().len();
        if missing > 0 {
            return Err(Error::IncompleteTransactionSet { missing });
        }
        let have = self.signature_count();
        let need = self.quorum();
        if have < need {
            return Err(Error::InsufficientSignatures { have, need });
        }

        let header = self.block_header().cloned().ok_or(Error::NoProposal)?;
        let transactions = self.resolved_transactions().to_vec();
        self.state.insert(ConsensusState::BLOCK_ACCEPTED);

        debug!(
            height = self.height,
            view = self.view_number,
            block = %header.hash(),
            transactions = transactions.len(),
            signatures = have,
            "Block accepted"
        );
        Ok(Block {
            header,
            transactions,
        })
    }

    fn invalidate_header(&mut self) {
        self.cached_header = OnceLock::new();
    }

    fn invalidate_tx_list(&mut self) {
        self.cached_tx_list = OnceLock::new();
    }
}
