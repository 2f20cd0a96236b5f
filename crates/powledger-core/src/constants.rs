pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const MAX_DIFFICULTY: u32 = HASH_HEX_SIZE as u32;
pub const DEFAULT_DIFFICULTY: u32 = 4;

pub const GENESIS_INDEX: u64 = 0;
pub const GENESIS_PAYLOAD: &str = "Genesis Block";
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// How many hash attempts run between two looks at a mining budget.
pub const BUDGET_CHECK_INTERVAL: u64 = 4096;
/// Nonces handed to the rayon pool per parallel search round.
pub const PARALLEL_ROUND_SIZE: u64 = 1 << 16;
