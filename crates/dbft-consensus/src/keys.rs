//! Ed25519 signing for headers and payloads.
//!
//! [`LocalValidatorKey`] is the node's wallet as the round state sees it: it
//! answers "is this validator me?" during reset, signs proposal headers, and
//! seals outbound payloads as a [`MessageCodec`].

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::header::BlockHeader;
use crate::message::ConsensusPayload;
use crate::traits::{KeySource, MessageCodec};
use crate::types::{PublicKey, Signature};

/// A validator signing key held by this node.
pub struct LocalValidatorKey {
    signing_key: SigningKey,
}

impl LocalValidatorKey {
    pub fn new(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    /// Build a key from a 32-byte secret seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self::new(SigningKey::from_bytes(&seed))
    }
}

impl std::fmt::Debug for LocalValidatorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalValidatorKey")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl KeySource for LocalValidatorKey {
    fn public_key(&self) -> PublicKey {
        self.signing_key.verifying_key().into()
    }

    fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message).into()
    }
}

impl MessageCodec for LocalValidatorKey {
    fn seal(&self, payload: &ConsensusPayload) -> Result<SealedPayload> {
        let data = payload.to_bytes()?;
        let signature = self.sign(&data);
        Ok(SealedPayload {
            data,
            signer: self.public_key(),
            signature,
        })
    }
}

/// An encoded payload with the sender's signature over the encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPayload {
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    pub signer: PublicKey,
    pub signature: Signature,
}

impl SealedPayload {
    /// Verify the signature over `data`.
    pub fn verify(&self) -> bool {
        verify_signature(&self.signer, &self.data, &self.signature)
    }

    /// Verify, then decode the inner payload.
    pub fn open(&self) -> Result<ConsensusPayload> {
        if !self.verify() {
            return Err(Error::InvalidSignature);
        }
        ConsensusPayload::from_bytes(&self.data)
    }
}

/// Check `signature` over `message` against `key`.
pub fn verify_signature(key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
    let verifying_key = match VerifyingKey::from_bytes(key.as_bytes()) {
        Ok(k) => k,
        Err(_) => return false,
    };
    let signature = match ed25519_dalek::Signature::from_slice(signature.as_bytes()) {
        Ok(s) => s,
        Err(_) => return false,
    };
    verifying_key.verify(message, &signature).is_ok()
}

/// Check a validator's signature over a proposal header.
pub fn verify_header_signature(
    key: &PublicKey,
    header: &BlockHeader,
    signature: &Signature,
) -> bool {
    verify_signature(key, header.hash().as_bytes(), signature)
}
