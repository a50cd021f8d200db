//! Round progress flags.
//!
//! The flags are orthogonal: a backup that has adopted a proposal and signed
//! it is `PRIMARY_PROPOSED | SIGNATURE_SENT` at the same time. An empty set
//! is the `INITIAL` state.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Set of round progress flags.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ConsensusState(u8);

impl ConsensusState {
    /// Nothing has happened in this view yet.
    pub const INITIAL: Self = Self(0);
    /// A proposal was made (primary) or adopted (backup) for the current view.
    pub const PRIMARY_PROPOSED: Self = Self(0x04);
    /// This node has broadcast its signature over the proposal header.
    pub const SIGNATURE_SENT: Self = Self(0x08);
    /// Quorum signatures collected, the block can be finalized.
    pub const BLOCK_ACCEPTED: Self = Self(0x10);
    /// This node asked for a new view and is waiting for quorum.
    pub const VIEW_CHANGING: Self = Self(0x20);

    const NAMED: [(Self, &'static str); 4] = [
        (Self::PRIMARY_PROPOSED, "PRIMARY_PROPOSED"),
        (Self::SIGNATURE_SENT, "SIGNATURE_SENT"),
        (Self::BLOCK_ACCEPTED, "BLOCK_ACCEPTED"),
        (Self::VIEW_CHANGING, "VIEW_CHANGING"),
    ];

    /// Raw bit representation.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True when no flag is set.
    pub const fn is_initial(self) -> bool {
        self.0 == 0
    }

    /// True when every flag in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set the flags in `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clear the flags in `other`.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Keep only the flags in `mask`.
    pub fn retain(&mut self, mask: Self) {
        self.0 &= mask.0;
    }
}

impl BitOr for ConsensusState {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ConsensusState {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ConsensusState {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for ConsensusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_initial() {
            return write!(f, "INITIAL");
        }
        let mut first = true;
        for (flag, name) in Self::NAMED {
            if self.contains(flag) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ConsensusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConsensusState({})", self)
    }
}
