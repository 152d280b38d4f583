use std::thread::{self, JoinHandle};

use super::block::Block;
use super::error::ChainError;
use super::pow::{CancelToken, PowParams};

/// A nonce search running on its own thread.
///
/// The nonce search is the one operation with no bound on how long it
/// blocks; this handle lets the caller cancel it, poll it, or wait for it,
/// and lets searches for independent chains proceed in parallel.
pub struct MineJob {
    cancel: CancelToken,
    handle: JoinHandle<Result<Block, ChainError>>,
}

impl MineJob {
    /// Start mining a block on a dedicated thread.
    pub fn spawn(
        index: u64,
        payload: Vec<u8>,
        previous_hash: Vec<u8>,
        params: PowParams,
    ) -> Self {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let handle = thread::spawn(move || {
            Block::new_with_cancel(index, payload, previous_hash, params, &token)
        });
        Self { cancel, handle }
    }

    /// Ask the search loop to stop at its next iteration.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Poll without blocking.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the search to finish and take the result.
    pub fn join(self) -> Result<Block, ChainError> {
        self.handle.join().expect("mining thread panicked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_job_seals_a_block() {
        let params = PowParams::new(8);
        let job = MineJob::spawn(3, b"bg".to_vec(), vec![0x01], params);
        let block = job.join().unwrap();
        assert_eq!(block.index, 3);
        assert_eq!(block.previous_hash, vec![0x01]);
        assert!(block.verify_hash(params));
    }

    #[test]
    fn cancel_stops_an_unwinnable_search() {
        let job = MineJob::spawn(0, b"never".to_vec(), Vec::new(), PowParams::new(250));
        assert!(!job.is_finished());
        job.cancel();
        assert_eq!(job.join().unwrap_err(), ChainError::MiningCancelled);
    }
}
