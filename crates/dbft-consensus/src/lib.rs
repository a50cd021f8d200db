//! dBFT Round State
//!
//! The per-round state of a delegated Byzantine Fault Tolerant consensus
//! protocol: which block is being agreed on, who proposes it in the current
//! view, which transactions it carries, and which validators have signed it
//! or asked to move on.
//!
//! # Rounds and Views
//!
//! A **round** agrees on the block at one height. It is split into **views**;
//! each view has a single **primary** that proposes, the rest are backups:
//!
//! ```text
//! primary = (height - view) mod N
//! ```
//!
//! If the primary stalls, validators announce the view they want. Once a
//! quorum asks for the same view the round moves there and the next
//! validator in rotation proposes.
//!
//! # Quorum
//!
//! With `N` validators, up to `f = floor((N-1)/3)` may be Byzantine and
//! `M = N - f` agreeing validators are needed to finalize a block or change
//! view. Any two quorums intersect in at least one honest validator.
//!
//! # Collaborators
//!
//! The round never reaches for global state. The chain, the local key, the
//! transaction pool and the message codec are passed in through
//! [`ChainView`], [`KeySource`], [`TransactionSource`] and [`MessageCodec`].

mod config;
mod context;
mod error;
mod handle;
mod header;
mod keys;
mod message;
mod state;
mod threshold;
mod traits;
mod types;

pub use config::{ContextConfig, DEFAULT_MAX_TRANSACTIONS};
pub use context::{Proposal, RoundContext};
pub use error::{Error, Result};
pub use handle::RoundHandle;
pub use header::{Block, BlockHeader};
pub use keys::{verify_header_signature, verify_signature, LocalValidatorKey, SealedPayload};
pub use message::{
    ChangeView, ConsensusMessage, ConsensusPayload, MessageKind, PrepareRequest, PrepareResponse,
};
pub use state::ConsensusState;
pub use threshold::{is_primary, max_faulty, meets_quorum, primary_index, quorum, signatures_needed};
pub use traits::{ChainView, KeySource, MessageCodec, TransactionSource};
pub use types::{compute_merkle_root, Address, Hash, PublicKey, Signature, Transaction};
