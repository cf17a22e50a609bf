// Blockchain module
//
// This module contains the core blockchain implementation including:
// - Digest and nonce utilities
// - Ledger snapshot (account balances carried by each block)
// - Block structure
// - Chain structure with append guard and whole-chain verification
// - Proof of work miner

pub mod block;
pub mod chain;
pub mod crypto;
pub mod ledger;
pub mod miner;

// Re-export main components for easier access
pub use block::Block;
pub use chain::{Chain, ChainError};
pub use ledger::{LedgerError, LedgerSnapshot};
pub use miner::{Miner, MinerError};
