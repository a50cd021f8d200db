//! Error types for dbft-consensus.

use thiserror::Error;

use crate::types::Hash;

/// Result type for dbft-consensus operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the round state to the dispatch layer.
///
/// All of these are local and recoverable; none of them invalidate the round.
#[derive(Debug, Error)]
pub enum Error {
    /// The operation needs a local validator index but this node is not in
    /// the active set for the round.
    #[error("this node is not a validator in the current round")]
    NotAValidator,

    /// The operation is reserved for the primary of the current view.
    #[error("validator {local} is not the primary (primary is {primary})")]
    NotPrimary { local: usize, primary: usize },

    /// No transaction set has been adopted for the current view.
    #[error("no proposal has been adopted")]
    NoProposal,

    /// The local signature is not available yet.
    #[error("local signature is not available yet")]
    NotReady,

    /// Finalization attempted while transaction bodies are still missing.
    #[error("transaction set incomplete: {missing} transaction(s) unresolved")]
    IncompleteTransactionSet { missing: usize },

    /// Finalization attempted without enough validator signatures.
    #[error("insufficient signatures: have {have}, need {need}")]
    InsufficientSignatures { have: usize, need: usize },

    /// The chain reported an empty validator set.
    #[error("validator set is empty")]
    DegenerateValidatorSet,

    /// A validator index outside the round's validator set.
    #[error("validator index {index} out of range for {validators} validators")]
    ValidatorIndexOutOfRange { index: usize, validators: usize },

    /// A transaction whose hash is not part of the adopted set.
    #[error("transaction {0} is not part of the proposal")]
    UnexpectedTransaction(Hash),

    /// A proposal listing the same transaction twice.
    #[error("transaction {0} appears more than once in the proposal")]
    DuplicateTransaction(Hash),

    /// A proposal larger than the configured block limit.
    #[error("proposal has {count} transactions, limit is {max}")]
    TooManyTransactions { count: usize, max: usize },

    /// View numbers only move forward within a round.
    #[error("cannot change view from {current} back to {requested}")]
    ViewRegression { current: u8, requested: u8 },

    /// The view counter cannot be advanced any further in this round.
    #[error("view number exhausted for this round")]
    ViewExhausted,

    /// A sealed payload or header signature failed verification.
    #[error("invalid signature")]
    InvalidSignature,

    /// Payload encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}
