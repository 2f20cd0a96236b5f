//! Hash-chained, proof-of-work secured append-only ledger.
//!
//! A [`Block`] carries an opaque JSON payload and a SHA-256 digest over its
//! fields. A [`Chain`](chain::Chain) links blocks by digest, mines every
//! appended block until its hash has `difficulty` leading zero hex characters,
//! and can walk itself to detect tampering.

pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod mine;

pub use chain::Chain;
pub use config::{ChainConfig, MiningStrategy};
pub use error::{ChainError, MiningError, ValidationError};
pub use pow::{Budget, CancelToken, Solution};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// Block contents. The engine never interprets it, it only hashes its compact
/// JSON text.
pub type Payload = serde_json::Value;

/// Current unix time in milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Unix millis, fixed at creation.
    pub timestamp: u64,
    pub transactions: Payload,
    pub previous_hash: String,
    pub nonce: u64,
    pub hash: String,
}

impl Block {
    /// Build an unmined block with `nonce = 0` and its hash already computed.
    /// `timestamp` defaults to now.
    pub fn new(
        index: u64,
        transactions: impl Into<Payload>,
        previous_hash: impl Into<String>,
        timestamp: Option<u64>,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp: timestamp.unwrap_or_else(now_millis),
            transactions: transactions.into(),
            previous_hash: previous_hash.into(),
            nonce: 0,
            hash: String::new(),
        };
        block.rehash();
        block
    }

    /// SHA-256 over `index ‖ timestamp ‖ transactions ‖ previous_hash ‖ nonce`,
    /// lowercase hex. Pure: reads the current fields, writes nothing.
    pub fn digest(&self) -> String {
        HashTemplate::new(self).digest(self.nonce)
    }

    /// Store the digest of the current fields in `hash`.
    pub fn rehash(&mut self) {
        self.hash = self.digest();
    }

    /// Whether the stored hash has at least `difficulty` leading zero hex characters.
    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        pow::meets_difficulty(&self.hash, difficulty)
    }

    /// Proof-of-work: walk nonces upwards from the current one until the hash
    /// has `difficulty` leading zero hex characters. Never gives up, so
    /// `difficulty` above 64 does not return.
    pub fn mine(&mut self, difficulty: u32) {
        self.mine_within(difficulty, &Budget::unbounded())
            .expect("unbounded budget never interrupts");
    }

    /// Like [`Block::mine`] but gives up when `budget` runs out. On failure the
    /// block is left exactly as it was.
    pub fn mine_within(&mut self, difficulty: u32, budget: &Budget) -> Result<Solution, MiningError> {
        let template = HashTemplate::new(self);
        let solution = pow::search(
            &template,
            self.nonce,
            |hash| pow::meets_difficulty(hash, difficulty),
            budget,
        )?;
        self.commit(&solution);
        Ok(solution)
    }

    pub(crate) fn commit(&mut self, solution: &Solution) {
        self.nonce = solution.nonce;
        self.hash.clone_from(&solution.hash);
    }
}

/// Hasher state over the nonce-independent part of a block's preimage.
///
/// Mining hashes the same `index ‖ timestamp ‖ transactions ‖ previous_hash`
/// prefix for every attempt; the template absorbs it once and each attempt
/// clones the state and feeds only the nonce.
#[derive(Clone)]
pub struct HashTemplate {
    prefix: Sha256,
}

impl HashTemplate {
    /// Absorb `block`'s index, timestamp, payload and previous hash.
    pub fn new(block: &Block) -> Self {
        let mut prefix = Sha256::new();
        prefix.update(block.index.to_string());
        prefix.update(block.timestamp.to_string());
        prefix.update(block.transactions.to_string());
        prefix.update(&block.previous_hash);
        Self { prefix }
    }

    /// Hex digest of the block's fields with `nonce` in place of its own.
    pub fn digest(&self, nonce: u64) -> String {
        let mut hasher = self.prefix.clone();
        hasher.update(nonce.to_string());
        hex::encode(hasher.finalize())
    }
}

pub mod pow {
    use super::HashTemplate;
    use crate::constants::BUDGET_CHECK_INTERVAL;
    use crate::error::MiningError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tracing::debug;

    /// Number of leading `'0'` characters in a hex digest.
    pub fn count_leading_zero_hex(hash: &str) -> u32 {
        hash.bytes().take_while(|b| *b == b'0').count() as u32
    }

    pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
        let want = difficulty as usize;
        hash.len() >= want && hash.as_bytes()[..want].iter().all(|b| *b == b'0')
    }

    /// Winning nonce of a search and the hash it produced.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct Solution {
        pub nonce: u64,
        pub hash: String,
        /// Nonces tried up to and including the winner.
        pub attempts: u64,
    }

    /// Shared flag a caller flips to stop an in-flight search.
    #[derive(Clone, Debug, Default)]
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

    /// External limits on a nonce search. The default budget is unbounded.
    #[derive(Clone, Debug, Default)]
    pub struct Budget {
        deadline: Option<Instant>,
        cancel: Option<CancelToken>,
    }

    impl Budget {
        pub fn unbounded() -> Self {
            Self::default()
        }

        /// Deadline `timeout` from now. A timeout too large to represent is
        /// treated as no deadline.
        pub fn with_timeout(timeout: Duration) -> Self {
            match Instant::now().checked_add(timeout) {
                Some(deadline) => Self::default().deadline(deadline),
                None => Self::default(),
            }
        }

        pub fn deadline(mut self, deadline: Instant) -> Self {
            self.deadline = Some(deadline);
            self
        }

        pub fn cancel_token(mut self, token: CancelToken) -> Self {
            self.cancel = Some(token);
            self
        }

        pub fn is_unbounded(&self) -> bool {
            self.deadline.is_none() && self.cancel.is_none()
        }

        /// `Err` once the token is cancelled or the deadline has passed.
        pub fn check(&self, attempts: u64) -> Result<(), MiningError> {
            if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                return Err(MiningError::Cancelled { attempts });
            }
            if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(MiningError::DeadlineExceeded { attempts });
            }
            Ok(())
        }
    }

    /// Sequential nonce search from `start_nonce` (inclusive) until `accept`
    /// holds for the digest. The budget is consulted before the first attempt
    /// and every `BUDGET_CHECK_INTERVAL` attempts after it.
    pub fn search<F>(
        template: &HashTemplate,
        start_nonce: u64,
        accept: F,
        budget: &Budget,
    ) -> Result<Solution, MiningError>
    where
        F: Fn(&str) -> bool,
    {
        let mut nonce = start_nonce;
        let mut attempts = 0u64;
        loop {
            if attempts % BUDGET_CHECK_INTERVAL == 0 {
                budget.check(attempts).inspect_err(|err| {
                    debug!(start_nonce, %err, "nonce search interrupted");
                })?;
            }
            let hash = template.digest(nonce);
            attempts += 1;
            if accept(&hash) {
                return Ok(Solution {
                    nonce,
                    hash,
                    attempts,
                });
            }
            nonce = nonce.wrapping_add(1);
        }
    }
}
