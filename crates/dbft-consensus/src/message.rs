//! Consensus messages and the payload envelope that carries them.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Address, Hash, Signature};

/// Request to move the round to `new_view_number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeView {
    pub view_number: u8,
    pub new_view_number: u8,
}

/// The primary's proposal for the current view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareRequest {
    pub view_number: u8,
    pub nonce: u64,
    pub next_producer: Address,
    pub transaction_hashes: Vec<Hash>,
    /// The primary's own signature over the proposed header.
    pub signature: Signature,
}

/// A backup's signature over the proposed header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareResponse {
    pub view_number: u8,
    pub signature: Signature,
}

/// Message type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    ChangeView,
    PrepareRequest,
    PrepareResponse,
}

/// Any consensus message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusMessage {
    ChangeView(ChangeView),
    PrepareRequest(PrepareRequest),
    PrepareResponse(PrepareResponse),
}

impl ConsensusMessage {
    /// The view this message belongs to.
    pub fn view_number(&self) -> u8 {
        match self {
            Self::ChangeView(m) => m.view_number,
            Self::PrepareRequest(m) => m.view_number,
            Self::PrepareResponse(m) => m.view_number,
        }
    }

    /// Stamp the message with a view number.
    pub fn set_view_number(&mut self, view: u8) {
        match self {
            Self::ChangeView(m) => m.view_number = view,
            Self::PrepareRequest(m) => m.view_number = view,
            Self::PrepareResponse(m) => m.view_number = view,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Self::ChangeView(_) => MessageKind::ChangeView,
            Self::PrepareRequest(_) => MessageKind::PrepareRequest,
            Self::PrepareResponse(_) => MessageKind::PrepareResponse,
        }
    }
}

impl From<ChangeView> for ConsensusMessage {
    fn from(m: ChangeView) -> Self {
        Self::ChangeView(m)
    }
}

impl From<PrepareRequest> for ConsensusMessage {
    fn from(m: PrepareRequest) -> Self {
        Self::PrepareRequest(m)
    }
}

impl From<PrepareResponse> for ConsensusMessage {
    fn from(m: PrepareResponse) -> Self {
        Self::PrepareResponse(m)
    }
}

/// Envelope around a consensus message, identifying the round and sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusPayload {
    pub version: u32,
    pub prev_hash: Hash,
    pub height: u32,
    /// Sender's position in the round's validator set.
    pub validator_index: u16,
    pub timestamp: u32,
    pub message: ConsensusMessage,
}

impl ConsensusPayload {
    /// Serialize to bytes for network transmission.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
