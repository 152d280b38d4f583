use chrono::Utc;

use super::error::ChainError;
use super::pow::{CancelToken, PowParams, ProofOfWork};

/// A single block in the chain. Immutable once sealed, except through
/// `reseal`, which is the one documented mutation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub index: u64,
    /// Creation time, seconds since the Unix epoch (UTC). Captured anew on
    /// every seal, so resealing even an identical payload changes the hash.
    pub timestamp: i64,
    pub payload: Vec<u8>,
    /// Hash of the predecessor; empty for the genesis block.
    pub previous_hash: Vec<u8>,
    /// Raw 32-byte digest produced by mining.
    pub hash: Vec<u8>,
    /// Proof-of-Work nonce.
    pub nonce: u64,
}

impl Block {
    /// Unsealed block stamped with the current wall-clock time.
    pub(crate) fn draft(index: u64, payload: Vec<u8>, previous_hash: Vec<u8>) -> Self {
        Self {
            index,
            timestamp: Utc::now().timestamp(),
            payload,
            previous_hash,
            hash: Vec::new(),
            nonce: 0,
        }
    }

    /// Build and mine a new block. Blocks the calling thread until the
    /// nonce search completes; see `MineJob` for the non-blocking path.
    pub fn new(
        index: u64,
        payload: Vec<u8>,
        previous_hash: Vec<u8>,
        params: PowParams,
    ) -> Result<Self, ChainError> {
        Self::new_with_cancel(index, payload, previous_hash, params, &CancelToken::new())
    }

    /// Like `new`, but the caller keeps a token to stop the search early.
    pub fn new_with_cancel(
        index: u64,
        payload: Vec<u8>,
        previous_hash: Vec<u8>,
        params: PowParams,
        cancel: &CancelToken,
    ) -> Result<Self, ChainError> {
        let mut block = Self::draft(index, payload, previous_hash);
        block.seal(params, cancel)?;
        Ok(block)
    }

    fn seal(&mut self, params: PowParams, cancel: &CancelToken) -> Result<(), ChainError> {
        self.nonce = 0;
        self.hash.clear();
        let (nonce, hash) = ProofOfWork::new(self, params).mine(cancel)?;
        self.nonce = nonce;
        self.hash = hash;
        Ok(())
    }

    /// Replace the payload and re-mine under a fresh timestamp.
    ///
    /// Because the timestamp is refreshed, the hash changes even if
    /// `payload` equals the old one, and any successor pointing at the old
    /// hash is left broken until it is resealed in turn.
    pub fn reseal(
        &mut self,
        payload: Vec<u8>,
        params: PowParams,
        cancel: &CancelToken,
    ) -> Result<(), ChainError> {
        self.payload = payload;
        self.timestamp = Utc::now().timestamp();
        self.seal(params, cancel)
    }

    /// Identity check that `ProofOfWork::validate` leaves out: the stored
    /// hash must equal the digest recomputed from the stored nonce.
    pub fn verify_hash(&self, params: PowParams) -> bool {
        ProofOfWork::new(self, params).recompute_hash() == self.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::pow::HashSchema;

    #[test]
    fn new_block_is_sealed_consistently() {
        let params = PowParams::new(8);
        let b = Block::new(1, b"hello".to_vec(), vec![1, 2, 3], params).unwrap();
        assert_eq!(b.index, 1);
        assert_eq!(b.previous_hash, vec![1, 2, 3]);
        assert_eq!(b.hash.len(), 32);
        assert!(b.verify_hash(params));
        assert!(ProofOfWork::new(&b, params).validate());
    }

    #[test]
    fn tampered_payload_fails_validation() {
        let params = PowParams::new(16);
        let mut b = Block::new(1, b"honest data".to_vec(), Vec::new(), params).unwrap();
        b.payload[0] ^= 0x01;
        assert!(!b.verify_hash(params));
        assert!(!ProofOfWork::new(&b, params).validate());
    }

    #[test]
    fn reseal_changes_the_hash() {
        let params = PowParams::new(8).with_schema(HashSchema::V2);
        let mut b = Block::new(2, b"before".to_vec(), vec![9], params).unwrap();
        let old_hash = b.hash.clone();

        b.reseal(b"after".to_vec(), params, &CancelToken::new()).unwrap();

        assert_ne!(b.hash, old_hash);
        assert_eq!(b.payload, b"after".to_vec());
        assert!(b.verify_hash(params));
        assert!(ProofOfWork::new(&b, params).validate());
    }
}
