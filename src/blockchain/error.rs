use thiserror::Error;

/// Failures surfaced by chain operations.
///
/// Encoding-range violations are a programming invariant, not a runtime
/// condition; they abort via panic instead of appearing here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("mining cancelled before a valid nonce was found")]
    MiningCancelled,
    #[error("mining exhausted its nonce budget after {attempts} attempts")]
    MiningExhausted { attempts: u64 },
    #[error("block index {index} out of range (chain length {len})")]
    IndexOutOfRange { index: u64, len: usize },
    #[error("block {index} is not linked to its predecessor's hash")]
    BrokenLink { index: u64 },
    #[error("block {index} does not satisfy the difficulty target")]
    InvalidProofOfWork { index: u64 },
    #[error("block {index} stored hash does not match its recomputed digest")]
    HashMismatch { index: u64 },
}
