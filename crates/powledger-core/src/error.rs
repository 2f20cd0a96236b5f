use thiserror::Error;

/// Failures raised by chain construction and append.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// The chain has no blocks. Genesis is created in every constructor, so
    /// seeing this means an internal bug.
    #[error("chain is empty: genesis block missing")]
    EmptyChain,

    #[error("difficulty {difficulty} is unreachable: a hash has at most {max} hex characters")]
    InvalidDifficulty { difficulty: u32, max: u32 },

    #[error("mining aborted: {0}")]
    Mining(#[from] MiningError),
}

/// Integrity problems found by walking the chain.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("block {index} has been tampered with: stored hash does not match its contents")]
    TamperedBlock { index: usize },

    #[error("block {index} is not linked to its predecessor")]
    BrokenLink { index: usize },
}

impl ValidationError {
    pub fn index(&self) -> usize {
        match self {
            ValidationError::TamperedBlock { index } | ValidationError::BrokenLink { index } => {
                *index
            }
        }
    }
}

/// Reasons a bounded nonce search gave up before finding a solution.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MiningError {
    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },

    #[error("deadline exceeded after {attempts} attempts")]
    DeadlineExceeded { attempts: u64 },
}

impl MiningError {
    pub fn attempts(&self) -> u64 {
        match self {
            MiningError::Cancelled { attempts } | MiningError::DeadlineExceeded { attempts } => {
                *attempts
            }
        }
    }
}
