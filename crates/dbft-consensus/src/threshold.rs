//! Quorum size and primary rotation for a validator set of size `N`.
//!
//! The quorum is the classic BFT bound:
//! - `f = floor((N - 1) / 3)` validators may be Byzantine
//! - `M = N - f` agreeing validators are required to act
//!
//! Below four validators no fault can be tolerated and `M == N`.
//!
//! The primary for a view rotates backwards through the validator set as the
//! view number grows: `primary = (height - view) mod N`.

/// Maximum number of Byzantine validators tolerated by a set of `n`.
pub const fn max_faulty(validators: usize) -> usize {
    if validators == 0 {
        return 0;
    }
    (validators - 1) / 3
}

/// Minimum number of agreeing validators (`M`) for a set of `n`.
///
/// # Examples
///
/// ```
/// use dbft_consensus::quorum;
///
/// assert_eq!(quorum(1), 1);
/// assert_eq!(quorum(4), 3);
/// assert_eq!(quorum(7), 5);
/// ```
pub const fn quorum(validators: usize) -> usize {
    validators - max_faulty(validators)
}

/// Check if a count of agreeing validators reaches quorum.
pub const fn meets_quorum(count: usize, validators: usize) -> bool {
    count >= quorum(validators)
}

/// How many more signatures are needed to reach quorum.
pub const fn signatures_needed(current: usize, validators: usize) -> usize {
    let threshold = quorum(validators);
    if current >= threshold {
        0
    } else {
        threshold - current
    }
}

/// Index of the primary for `view` at `height`, or `None` for an empty set.
///
/// Computed with a signed Euclidean remainder so that `view > height`
/// never wraps through `u32::MAX`.
pub fn primary_index(height: u32, view: u8, validators: usize) -> Option<usize> {
    if validators == 0 {
        return None;
    }
    let n = validators as i64;
    let index = (i64::from(height) - i64::from(view)).rem_euclid(n);
    Some(index as usize)
}

/// Whether the local validator is the primary. `None` means "not a validator".
pub fn is_primary(local_index: Option<usize>, primary_index: usize) -> bool {
    local_index == Some(primary_index)
}
