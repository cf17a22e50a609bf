use chrono::Utc;
use log::{debug, info};
use rand::Rng;
use thiserror::Error;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::block::Block;
use super::crypto::{digest, random_nonce, zero_prefix};
use super::ledger::LedgerSnapshot;

/// Errors that can occur during the proof-of-work search
///
/// Neither can happen unless the corresponding option is configured; a plain
/// miner searches until it succeeds.
#[derive(Debug, Error)]
pub enum MinerError {
    #[error("Mining gave up after {attempts} attempts")]
    Timeout { attempts: u64 },

    #[error("Mining was cancelled")]
    Cancelled,
}

/// Proof-of-work miner
///
/// Searches nonce space until a candidate block's hash starts with
/// `difficulty` zero characters. The nonce grows one random hex character per
/// attempt and resets to a fresh single character once it exceeds
/// `max_nonce_len`, trading nonce length against search breadth.
///
/// The random source is injected so the search is reproducible in tests. The
/// search loop is CPU-bound with no suspension point; hosts that need to stay
/// responsive should run it on a dedicated worker and may hand the miner a
/// cancellation flag, checked once per retry.
pub struct Miner<R: Rng> {
    difficulty: usize,
    max_nonce_len: usize,
    rng: R,
    attempt_cap: Option<u64>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<R: Rng> Miner<R> {
    /// Creates a miner requiring `difficulty` leading zeros, with nonces
    /// capped at `max_nonce_len` characters before resetting.
    pub fn new(difficulty: usize, max_nonce_len: usize, rng: R) -> Self {
        Miner {
            difficulty,
            max_nonce_len,
            rng,
            attempt_cap: None,
            cancel: None,
        }
    }

    /// Gives up with [`MinerError::Timeout`] after `cap` failed attempts.
    pub fn with_attempt_cap(mut self, cap: u64) -> Self {
        self.attempt_cap = Some(cap);
        self
    }

    /// Aborts the search with [`MinerError::Cancelled`] once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Mines the genesis block (index 1) carrying the initial ledger.
    ///
    /// A genesis block has no predecessor, so its previous-hash is the digest
    /// of its initial pre-search nonce seed, a degenerate marker fixed before
    /// the search starts.
    pub fn mine_genesis(&mut self, ledger: LedgerSnapshot) -> Result<Block, MinerError> {
        let seed = random_nonce(&mut self.rng, 1);
        let previous_hash = digest(&seed);

        self.search(1, seed, previous_hash, ledger)
    }

    /// Mines the block following `prev`, carrying the given ledger.
    pub fn mine_next(&mut self, prev: &Block, ledger: LedgerSnapshot) -> Result<Block, MinerError> {
        let seed = random_nonce(&mut self.rng, 1);

        self.search(prev.index + 1, seed, prev.hash.clone(), ledger)
    }

    fn search(
        &mut self,
        index: u64,
        seed: String,
        previous_hash: String,
        ledger: LedgerSnapshot,
    ) -> Result<Block, MinerError> {
        let target = zero_prefix(self.difficulty);
        let mut nonce = seed;
        let mut attempts: u64 = 0;

        loop {
            // Fresh timestamp per attempt; incidental entropy, not required
            let block = Block::new(
                index,
                nonce.clone(),
                Utc::now(),
                ledger.clone(),
                previous_hash.clone(),
            );

            if block.hash.starts_with(&target) {
                info!("mined block {} after {} attempts", index, attempts);
                return Ok(block);
            }

            attempts += 1;

            if let Some(cap) = self.attempt_cap {
                if attempts >= cap {
                    debug!("block {} search hit the attempt cap", index);
                    return Err(MinerError::Timeout { attempts });
                }
            }

            if let Some(flag) = &self.cancel {
                if flag.load(Ordering::Relaxed) {
                    debug!("block {} search cancelled", index);
                    return Err(MinerError::Cancelled);
                }
            }

            nonce.push_str(&random_nonce(&mut self.rng, 1));
            if nonce.len() > self.max_nonce_len {
                nonce = random_nonce(&mut self.rng, 1);
            }
        }
    }
}
