use log::{info, warn};
use thiserror::Error;

use super::block::Block;

/// Errors that can occur during chain operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("Chain has no blocks yet")]
    Empty,

    #[error("Block {index} does not link to the current tip: expected previous hash {expected}, got {found}")]
    Linkage {
        index: u64,
        expected: String,
        found: String,
    },

    #[error("Verification failed at block {index}: {fault}")]
    Verification { index: u64, fault: VerificationFault },
}

/// What went wrong with a block during verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerificationFault {
    #[error("stored hash does not match recomputed hash")]
    HashMismatch,

    #[error("previous-hash does not match the predecessor's hash")]
    BrokenLink,
}

/// Represents the blockchain: a named, append-only sequence of blocks
///
/// Blocks enter only through [`Chain::append`] and are never reordered or
/// removed. The first appended block is the genesis block with index 1.
#[derive(Debug, Clone)]
pub struct Chain {
    name: String,
    blocks: Vec<Block>,
}

impl Chain {
    /// Creates a new, empty chain with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Chain {
            name: name.into(),
            blocks: Vec::new(),
        }
    }

    /// Gets the chain's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of blocks in the chain.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// All blocks, in index order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Gets the most recently appended block.
    pub fn last(&self) -> Result<&Block, ChainError> {
        self.blocks.last().ok_or(ChainError::Empty)
    }

    /// Appends a block to the end of the chain.
    ///
    /// Guarded state transition: the block's previous-hash must equal the
    /// current tip's hash, or the append is rejected and the chain is left
    /// unchanged. A genesis block (appended to an empty chain) carries a
    /// self-derived marker instead of a real link, so it is not checked.
    pub fn append(&mut self, block: Block) -> Result<(), ChainError> {
        if let Some(tip) = self.blocks.last() {
            if block.previous_hash != tip.hash {
                warn!(
                    "rejected block {} on chain {:?}: previous hash does not match tip",
                    block.index, self.name
                );
                return Err(ChainError::Linkage {
                    index: block.index,
                    expected: tip.hash.clone(),
                    found: block.previous_hash.clone(),
                });
            }
        }

        info!("appended block {} to chain {:?}", block.index, self.name);
        self.blocks.push(block);

        Ok(())
    }

    /// Verifies the entire chain by recomputation.
    ///
    /// Every block's hash is re-derived from its stored fields (the genesis
    /// block included) and compared to the stored hash; every block after the
    /// first must link to its predecessor. Reports the first offending block.
    /// Proof-of-work is not re-run; this is recompute-and-compare only.
    pub fn verify(&self) -> Result<(), ChainError> {
        for (i, block) in self.blocks.iter().enumerate() {
            if block.hash != block.calculate_hash() {
                return Err(ChainError::Verification {
                    index: block.index,
                    fault: VerificationFault::HashMismatch,
                });
            }

            if i > 0 && block.previous_hash != self.blocks[i - 1].hash {
                return Err(ChainError::Verification {
                    index: block.index,
                    fault: VerificationFault::BrokenLink,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::crypto::zero_prefix;
    use crate::blockchain::ledger::LedgerSnapshot;
    use crate::blockchain::miner::Miner;

    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_miner(difficulty: usize) -> Miner<StdRng> {
        Miner::new(difficulty, 8, StdRng::seed_from_u64(1337))
    }

    #[test]
    fn test_empty_chain_has_no_last_block() {
        let chain = Chain::new("Test");

        assert!(chain.is_empty());
        assert_eq!(chain.last().err(), Some(ChainError::Empty));
    }

    #[test]
    fn test_append_and_last() {
        let mut chain = Chain::new("Test");
        let mut miner = test_miner(1);

        let genesis = miner
            .mine_genesis(LedgerSnapshot::with_account("Yumi", 100))
            .unwrap();
        let genesis_hash = genesis.hash.clone();
        chain.append(genesis).unwrap();

        assert_eq!(chain.len(), 1);
        assert_eq!(chain.last().unwrap().hash, genesis_hash);
    }

    #[test]
    fn test_append_rejects_unlinked_block() {
        let mut chain = Chain::new("Test");
        let mut miner = test_miner(1);

        let ledger = LedgerSnapshot::with_account("Yumi", 100);
        chain.append(miner.mine_genesis(ledger.clone()).unwrap()).unwrap();

        // A block minted against a forged previous hash must not append
        let forged = Block::new(
            2,
            "ab".to_string(),
            Utc::now(),
            ledger,
            "not the tip hash".to_string(),
        );

        let result = chain.append(forged);
        assert!(matches!(result, Err(ChainError::Linkage { index: 2, .. })));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_mined_chain_links_and_meets_target() {
        let difficulty = 2;
        let mut chain = Chain::new("Test");
        let mut miner = test_miner(difficulty);

        let ledger = LedgerSnapshot::with_account("Yumi", 100);
        chain.append(miner.mine_genesis(ledger.clone()).unwrap()).unwrap();

        let mut ledger = ledger;
        for (to, amount) in [("Bob", 30), ("Carol", 20), ("Bob", 10)] {
            ledger = ledger.apply_transfer("Yumi", to, amount).unwrap();
            let tip = chain.last().unwrap().clone();
            let block = miner.mine_next(&tip, ledger.clone()).unwrap();
            chain.append(block).unwrap();
        }

        assert_eq!(chain.len(), 4);

        let target = zero_prefix(difficulty);
        for (i, block) in chain.blocks().iter().enumerate() {
            assert_eq!(block.index, i as u64 + 1);
            assert!(block.hash.starts_with(&target));
            if i > 0 {
                assert_eq!(block.previous_hash, chain.blocks()[i - 1].hash);
            }
        }

        chain.verify().unwrap();
    }

    #[test]
    fn test_verify_detects_tampered_balance() {
        let mut chain = Chain::new("Test");
        let mut miner = test_miner(1);

        let ledger = LedgerSnapshot::with_account("Yumi", 100);
        chain.append(miner.mine_genesis(ledger.clone()).unwrap()).unwrap();

        let next = ledger.apply_transfer("Yumi", "Bob", 30).unwrap();
        let tip = chain.last().unwrap().clone();
        chain.append(miner.mine_next(&tip, next).unwrap()).unwrap();

        chain.verify().unwrap();

        // Rewrite a recorded balance in block 2; recomputation must notice
        chain.blocks[1].ledger = ledger.apply_transfer("Yumi", "Bob", 31).unwrap();

        assert_eq!(
            chain.verify(),
            Err(ChainError::Verification {
                index: 2,
                fault: VerificationFault::HashMismatch,
            })
        );
    }

    #[test]
    fn test_verify_detects_tampered_genesis() {
        let mut chain = Chain::new("Test");
        let mut miner = test_miner(1);

        chain
            .append(miner.mine_genesis(LedgerSnapshot::with_account("Yumi", 100)).unwrap())
            .unwrap();

        chain.blocks[0].nonce.push('0');

        assert_eq!(
            chain.verify(),
            Err(ChainError::Verification {
                index: 1,
                fault: VerificationFault::HashMismatch,
            })
        );
    }

    #[test]
    fn test_rejected_transfer_appends_nothing() {
        let mut chain = Chain::new("Test");
        let mut miner = test_miner(1);

        chain
            .append(miner.mine_genesis(LedgerSnapshot::with_account("Yumi", 100)).unwrap())
            .unwrap();

        // No snapshot is derived, so no block is ever mined or appended
        let tip_ledger = chain.last().unwrap().ledger.clone();
        assert!(tip_ledger.apply_transfer("Yumi", "Yumi", 10).is_err());
        assert!(tip_ledger.apply_transfer("Mallory", "Bob", 10).is_err());
        assert!(tip_ledger.apply_transfer("Yumi", "Bob", 1000).is_err());

        assert_eq!(chain.len(), 1);
        chain.verify().unwrap();
    }

    // End-to-end scenario: genesis, one transfer, then corruption.
    #[test]
    fn test_transfer_chain_end_to_end() {
        let mut chain = Chain::new("Test");
        let mut miner = test_miner(2);

        let genesis_ledger = LedgerSnapshot::with_account("Yumi", 100);
        chain.append(miner.mine_genesis(genesis_ledger).unwrap()).unwrap();

        assert_eq!(chain.len(), 1);
        chain.verify().unwrap();

        let paid = chain
            .last()
            .unwrap()
            .ledger
            .apply_transfer("Yumi", "Bob", 30)
            .unwrap();
        let tip = chain.last().unwrap().clone();
        chain.append(miner.mine_next(&tip, paid).unwrap()).unwrap();

        assert_eq!(chain.len(), 2);
        let ledger = &chain.last().unwrap().ledger;
        assert_eq!(ledger.balance("Yumi"), Some(70));
        assert_eq!(ledger.balance("Bob"), Some(30));
        assert_eq!(ledger.total_supply(), 100);
        chain.verify().unwrap();

        // Corrupt the stored linkage of block 2
        chain.blocks[1].previous_hash = crate::blockchain::crypto::digest("forged");

        let result = chain.verify();
        assert!(matches!(
            result,
            Err(ChainError::Verification { index: 2, .. })
        ));
    }
}
