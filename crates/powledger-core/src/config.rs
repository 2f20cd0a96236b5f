//! Chain configuration.
//!
//! Every tunable the engine uses is carried here and handed to
//! [`Chain::with_config`](crate::chain::Chain::with_config). Missing fields
//! fall back to the named defaults in [`constants`](crate::constants).

use crate::constants::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
use crate::error::ChainError;
use serde::{Deserialize, Serialize};

/// How `append` searches for a nonce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MiningStrategy {
    /// One thread, nonce incremented by one from the block's current nonce.
    #[default]
    Sequential,
    /// Rayon pool. Finds the same nonce as `Sequential`.
    Parallel,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Leading `'0'` hex characters required in every mined hash.
    pub difficulty: u32,
    pub strategy: MiningStrategy,
    /// Fixed genesis timestamp (unix millis). `None` stamps the current time.
    pub genesis_timestamp: Option<u64>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            strategy: MiningStrategy::default(),
            genesis_timestamp: None,
        }
    }
}

impl ChainConfig {
    pub fn with_difficulty(difficulty: u32) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    /// Reject settings that would make mining spin forever.
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(ChainError::InvalidDifficulty {
                difficulty: self.difficulty,
                max: MAX_DIFFICULTY,
            });
        }
        Ok(())
    }
}
