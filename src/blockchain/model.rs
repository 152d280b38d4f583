use log::info;

use super::GENESIS_PAYLOAD;
use super::block::Block;
use super::error::ChainError;
use super::pow::{CancelToken, PowParams, ProofOfWork};

/// Append-only in-memory chain with Proof-of-Work admission.
///
/// Single-writer: concurrent appends to one instance must be serialized by
/// the caller (the API layer keeps one mutex per chain).
#[derive(Debug)]
pub struct Blockchain {
    chain: Vec<Block>,
    params: PowParams,
}

impl Blockchain {
    /// New chain holding exactly the mined genesis block.
    pub fn new(params: PowParams) -> Result<Self, ChainError> {
        let genesis = Block::new(0, GENESIS_PAYLOAD.to_vec(), Vec::new(), params)?;
        Ok(Self {
            chain: vec![genesis],
            params,
        })
    }

    pub fn params(&self) -> PowParams {
        self.params
    }

    /// Read-only view of the blocks, genesis first.
    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("chain always holds at least the genesis block")
    }

    /// Mine and append a new block carrying `payload`. Blocks the calling
    /// thread for the whole nonce search.
    pub fn append(&mut self, payload: Vec<u8>) -> Result<&Block, ChainError> {
        self.append_with_cancel(payload, &CancelToken::new())
    }

    pub fn append_with_cancel(
        &mut self,
        payload: Vec<u8>,
        cancel: &CancelToken,
    ) -> Result<&Block, ChainError> {
        let last = self.last_block();
        let block = Block::new_with_cancel(
            last.index + 1,
            payload,
            last.hash.clone(),
            self.params,
            cancel,
        )?;
        info!("sealed block #{} (nonce={})", block.index, block.nonce);
        self.chain.push(block);
        Ok(self.last_block())
    }

    /// Admit a block mined outside the chain lock (see `MineJob`). The head
    /// may have moved while the search ran, so continuity is re-checked.
    pub fn append_mined(&mut self, block: Block) -> Result<&Block, ChainError> {
        let last = self.last_block();
        if block.index != last.index + 1 || block.previous_hash != last.hash {
            return Err(ChainError::BrokenLink { index: block.index });
        }
        if !block.verify_hash(self.params) {
            return Err(ChainError::HashMismatch { index: block.index });
        }
        if !ProofOfWork::new(&block, self.params).validate() {
            return Err(ChainError::InvalidProofOfWork { index: block.index });
        }
        self.chain.push(block);
        Ok(self.last_block())
    }

    /// Per-block PoW audit: does each stored nonce still meet the target?
    /// Display-oriented; checks neither linkage nor the stored-hash
    /// identity.
    pub fn validate_all(&self) -> Vec<(u64, bool)> {
        self.chain
            .iter()
            .map(|b| (b.index, ProofOfWork::new(b, self.params).validate()))
            .collect()
    }

    /// Per-block linkage audit: genesis must have an empty previous hash,
    /// every other block must point at its predecessor's hash.
    pub fn validate_linkage(&self) -> Vec<(u64, bool)> {
        self.chain
            .iter()
            .enumerate()
            .map(|(i, b)| (b.index, self.is_linked(i, b)))
            .collect()
    }

    fn is_linked(&self, position: usize, block: &Block) -> bool {
        if position == 0 {
            block.previous_hash.is_empty()
        } else {
            block.previous_hash == self.chain[position - 1].hash
        }
    }

    /// Full audit: linkage, stored-hash identity and PoW target for every
    /// block. Returns the first violation found.
    pub fn audit(&self) -> Result<(), ChainError> {
        for (i, block) in self.chain.iter().enumerate() {
            if !self.is_linked(i, block) {
                return Err(ChainError::BrokenLink { index: block.index });
            }
            if !block.verify_hash(self.params) {
                return Err(ChainError::HashMismatch { index: block.index });
            }
            if !ProofOfWork::new(block, self.params).validate() {
                return Err(ChainError::InvalidProofOfWork { index: block.index });
            }
        }
        Ok(())
    }

    pub fn is_valid_chain(&self) -> bool {
        self.audit().is_ok()
    }

    /// Edit block `index` in place: refresh its previous-hash link from the
    /// current predecessor, replace the payload and re-mine under a fresh
    /// timestamp. Successors keep pointing at the old hash and stay broken
    /// until they are resealed in turn.
    pub fn reseal(&mut self, index: u64, payload: Vec<u8>) -> Result<&Block, ChainError> {
        self.reseal_with_cancel(index, payload, &CancelToken::new())
    }

    pub fn reseal_with_cancel(
        &mut self,
        index: u64,
        payload: Vec<u8>,
        cancel: &CancelToken,
    ) -> Result<&Block, ChainError> {
        if index >= self.chain.len() as u64 {
            return Err(ChainError::IndexOutOfRange {
                index,
                len: self.chain.len(),
            });
        }
        let i = index as usize;
        if i > 0 {
            self.chain[i].previous_hash = self.chain[i - 1].hash.clone();
        }
        let params = self.params;
        self.chain[i].reseal(payload, params, cancel)?;
        info!("resealed block #{index} (nonce={})", self.chain[i].nonce);
        Ok(&self.chain[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    fn test_params() -> PowParams {
        PowParams::new(8)
    }

    #[test]
    fn genesis_chain_is_valid() {
        let bc = Blockchain::new(test_params()).unwrap();
        assert_eq!(bc.len(), 1);
        let genesis = bc.last_block();
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.payload, GENESIS_PAYLOAD.to_vec());
        assert!(genesis.previous_hash.is_empty());
        assert!(bc.is_valid_chain());
    }

    #[test]
    fn appended_blocks_link_to_their_predecessors() {
        let mut bc = Blockchain::new(test_params()).unwrap();
        for payload in [b"A".to_vec(), b"B".to_vec(), b"C".to_vec()] {
            bc.append(payload).unwrap();
        }
        assert_eq!(bc.len(), 4);
        for (i, block) in bc.blocks().iter().enumerate() {
            assert_eq!(block.index, i as u64);
            if i > 0 {
                assert_eq!(block.previous_hash, bc.blocks()[i - 1].hash);
            }
        }
        assert!(bc.validate_all().iter().all(|&(_, ok)| ok));
        assert!(bc.validate_linkage().iter().all(|&(_, ok)| ok));
    }

    #[test]
    fn reseal_breaks_the_successor_until_repaired() {
        let mut bc = Blockchain::new(test_params()).unwrap();
        bc.append(b"A".to_vec()).unwrap();
        bc.append(b"B".to_vec()).unwrap();

        bc.reseal(1, b"A edited".to_vec()).unwrap();
        let linkage = bc.validate_linkage();
        assert_eq!(linkage[1], (1, true));
        assert_eq!(linkage[2], (2, false));
        assert_eq!(bc.audit(), Err(ChainError::BrokenLink { index: 2 }));
        assert!(!bc.is_valid_chain());

        // Resealing the successor refreshes its link and repairs the chain.
        bc.reseal(2, b"B".to_vec()).unwrap();
        assert!(bc.is_valid_chain());
    }

    #[test]
    fn reseal_rejects_an_out_of_range_index() {
        let mut bc = Blockchain::new(test_params()).unwrap();
        let err = bc.reseal(5, b"x".to_vec()).unwrap_err();
        assert_eq!(err, ChainError::IndexOutOfRange { index: 5, len: 1 });
    }

    #[test]
    fn append_mined_rechecks_continuity_and_pow() {
        let mut bc = Blockchain::new(test_params()).unwrap();
        let head_hash = bc.last_block().hash.clone();

        // Mined against a head this chain never had.
        let stale = Block::new(1, b"x".to_vec(), vec![0xde, 0xad], bc.params()).unwrap();
        assert_eq!(
            bc.append_mined(stale).unwrap_err(),
            ChainError::BrokenLink { index: 1 }
        );

        // Stored hash no longer matching the content.
        let mut forged = Block::new(1, b"y".to_vec(), head_hash.clone(), bc.params()).unwrap();
        forged.hash[0] ^= 0x01;
        assert_eq!(
            bc.append_mined(forged).unwrap_err(),
            ChainError::HashMismatch { index: 1 }
        );

        // Consistent nonce/hash pair that misses the target.
        let mut weak = Block::new(1, b"z".to_vec(), head_hash.clone(), bc.params()).unwrap();
        let target = bc.params().target();
        for nonce in 0u64.. {
            weak.nonce = nonce;
            let digest = ProofOfWork::new(&weak, bc.params()).recompute_hash();
            if BigUint::from_bytes_be(&digest) >= target {
                weak.hash = digest;
                break;
            }
        }
        assert_eq!(
            bc.append_mined(weak).unwrap_err(),
            ChainError::InvalidProofOfWork { index: 1 }
        );

        let good = Block::new(1, b"w".to_vec(), head_hash, bc.params()).unwrap();
        let appended = bc.append_mined(good).unwrap();
        assert_eq!(appended.index, 1);
        assert_eq!(bc.len(), 2);
        assert!(bc.is_valid_chain());
    }

    // Run with `cargo test --release -- --ignored`.
    #[test]
    #[ignore = "expected cost is 2^20 hash evaluations"]
    fn genesis_at_default_difficulty() {
        let bc = Blockchain::new(PowParams::default()).unwrap();
        let value = BigUint::from_bytes_be(&bc.last_block().hash);
        assert!(value < BigUint::from(1u8) << 236);
        assert!(bc.is_valid_chain());
    }
}
