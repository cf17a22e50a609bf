use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;

use super::crypto::digest;
use super::ledger::LedgerSnapshot;

/// Represents a block in the blockchain
///
/// A block is constructed once, fully, and never changed afterwards. Its
/// `hash` is computed at construction from the four other fields, so
/// recomputing it later must always reproduce the stored value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// 1-based position of the block in the chain
    pub index: u64,

    /// Nonce string found by the proof-of-work search
    pub nonce: String,

    /// Timestamp when the block was created
    pub timestamp: DateTime<Utc>,

    /// Account balances as of this block, owned and immutable
    pub ledger: LedgerSnapshot,

    /// Hash of the previous block (or the genesis marker, see the miner)
    pub previous_hash: String,

    /// Hash of the current block (calculated)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hash: String,
}

impl Block {
    /// Creates a new block, computing its hash from the other fields.
    ///
    /// Pure and total: construction never fails. Whether the hash meets any
    /// difficulty target is the miner's concern, not the block's.
    pub fn new(
        index: u64,
        nonce: String,
        timestamp: DateTime<Utc>,
        ledger: LedgerSnapshot,
        previous_hash: String,
    ) -> Self {
        let block = Block {
            index,
            nonce,
            timestamp,
            ledger,
            previous_hash,
            hash: String::new(),
        };

        let hash = block.calculate_hash();

        Block { hash, ..block }
    }

    /// Calculates the hash of the block from its stored fields.
    ///
    /// The preimage is the concatenation `nonce ++ timestamp ++ ledger ++
    /// previous_hash` using the canonical renderings below. Changing either
    /// rendering breaks every historical hash, so they are frozen.
    pub fn calculate_hash(&self) -> String {
        let preimage = format!(
            "{}{}{}{}",
            self.nonce,
            canonical_timestamp(&self.timestamp),
            self.ledger.canonical_text(),
            self.previous_hash,
        );

        digest(&preimage)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Block number    : {}", self.index)?;
        writeln!(f, "Date-time stamp : {}", canonical_timestamp(&self.timestamp))?;
        write!(f, "Block hash      : {}", self.hash)
    }
}

/// RFC 3339 with fixed microsecond precision and a `Z` suffix.
fn canonical_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}
