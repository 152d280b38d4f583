use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

use super::block::Block;
use super::codec;
use super::error::ChainError;

/// Versioned layout of the hashed preimage.
///
/// Two layouts of this chain format exist in deployments, so the choice is an
/// explicit configuration parameter rather than an implementation accident.
/// A chain keeps one schema for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashSchema {
    /// previous_hash, payload, index, timestamp, difficulty_bits, nonce
    #[default]
    V1,
    /// Same as `V1` but without the block index.
    V2,
}

/// Mining parameters shared by every block of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowParams {
    /// Required leading zero bits; expected mining cost is
    /// `2^difficulty_bits` hash evaluations.
    pub difficulty_bits: u32,
    pub schema: HashSchema,
    /// Upper bound on nonce attempts; `None` searches until cancelled.
    pub max_iterations: Option<u64>,
}

impl PowParams {
    pub fn new(difficulty_bits: u32) -> Self {
        assert!(
            (1..=255).contains(&difficulty_bits),
            "difficulty_bits must be in 1..=255"
        );
        Self {
            difficulty_bits,
            schema: HashSchema::default(),
            max_iterations: None,
        }
    }

    pub fn with_schema(mut self, schema: HashSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_max_iterations(mut self, max: u64) -> Self {
        self.max_iterations = Some(max);
        self
    }

    /// Threshold a winning digest must stay strictly below:
    /// `1 << (256 - difficulty_bits)`.
    pub fn target(&self) -> BigUint {
        BigUint::from(1u8) << (256 - self.difficulty_bits as usize)
    }
}

impl Default for PowParams {
    fn default() -> Self {
        Self::new(super::DEFAULT_DIFFICULTY_BITS)
    }
}

/// Cooperative stop flag shared between a mining loop and its controller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One mining or validation pass over a single block.
///
/// Borrows the block for the duration of the call and never mutates it; the
/// caller writes the winning nonce and hash back.
pub struct ProofOfWork<'a> {
    block: &'a Block,
    target: BigUint,
    params: PowParams,
}

impl<'a> ProofOfWork<'a> {
    pub fn new(block: &'a Block, params: PowParams) -> Self {
        Self {
            block,
            target: params.target(),
            params,
        }
    }

    /// Serializes the preimage for `nonce` in the schema's fixed field
    /// order. Integer fields are encoded as signed 64-bit big-endian; a
    /// field outside that range is an invariant violation and aborts.
    pub fn prepare_data(&self, nonce: u64) -> Vec<u8> {
        let index = codec::encode_i64(
            i64::try_from(self.block.index).expect("block index exceeds i64 range"),
        );
        let timestamp = codec::encode_i64(self.block.timestamp);
        let bits = codec::encode_i64(i64::from(self.params.difficulty_bits));
        let nonce = codec::encode_i64(i64::try_from(nonce).expect("nonce exceeds i64 range"));

        match self.params.schema {
            HashSchema::V1 => codec::concat(&[
                &self.block.previous_hash,
                &self.block.payload,
                &index,
                &timestamp,
                &bits,
                &nonce,
            ]),
            HashSchema::V2 => codec::concat(&[
                &self.block.previous_hash,
                &self.block.payload,
                &timestamp,
                &bits,
                &nonce,
            ]),
        }
    }

    /// Linear nonce search from 0. Returns the first nonce whose SHA-256
    /// digest, read as a 256-bit big-endian integer, is strictly below the
    /// target, together with the raw 32-byte digest.
    ///
    /// Termination is probabilistic, so the loop checks the token on every
    /// attempt and honors `max_iterations` when one is configured.
    pub fn mine(&self, cancel: &CancelToken) -> Result<(u64, Vec<u8>), ChainError> {
        debug!(
            "mining block #{} at {} difficulty bits",
            self.block.index, self.params.difficulty_bits
        );
        let mut nonce: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(ChainError::MiningCancelled);
            }
            if let Some(max) = self.params.max_iterations {
                if nonce >= max {
                    return Err(ChainError::MiningExhausted { attempts: max });
                }
            }
            let digest = Sha256::digest(self.prepare_data(nonce));
            if BigUint::from_bytes_be(&digest) < self.target {
                debug!(
                    "block #{} found a winning nonce after {} attempts",
                    self.block.index,
                    nonce + 1
                );
                return Ok((nonce, digest.to_vec()));
            }
            nonce += 1;
        }
    }

    /// Digest of the preimage for the block's stored nonce.
    pub fn recompute_hash(&self) -> Vec<u8> {
        Sha256::digest(self.prepare_data(self.block.nonce)).to_vec()
    }

    /// True iff the stored nonce's digest meets the target. Deliberately
    /// does not compare against the stored hash; `Block::verify_hash`
    /// covers that separately.
    pub fn validate(&self) -> bool {
        BigUint::from_bytes_be(&self.recompute_hash()) < self.target
    }
}
