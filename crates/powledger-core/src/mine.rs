use crate::{
    constants::PARALLEL_ROUND_SIZE,
    error::MiningError,
    pow::{meets_difficulty, Budget, Solution},
    Block, HashTemplate,
};
use rayon::prelude::*;
use tracing::debug;

/// Searches nonces on the rayon pool, starting at `start_nonce`.
///
/// The nonce space is walked in consecutive rounds of `PARALLEL_ROUND_SIZE`.
/// Each round keeps the lowest accepted nonce (`find_first`), and rounds run
/// in order, so the winner is the same nonce `pow::search` would return.
/// Workers only hash; nothing is shared but the immutable template.
pub fn search_parallel<F>(
    template: &HashTemplate,
    start_nonce: u64,
    accept: F,
    budget: &Budget,
) -> Result<Solution, MiningError>
where
    F: Fn(&str) -> bool + Sync,
{
    let mut lo = start_nonce;
    let mut attempts = 0u64;
    loop {
        budget.check(attempts)?;
        let hi = lo.saturating_add(PARALLEL_ROUND_SIZE - 1);
        let found = (lo..=hi)
            .into_par_iter()
            .find_first(|nonce| accept(&template.digest(*nonce)));

        if let Some(nonce) = found {
            attempts += nonce - lo + 1;
            return Ok(Solution {
                nonce,
                hash: template.digest(nonce),
                attempts,
            });
        }
        attempts += hi - lo + 1;
        debug!(lo, hi, attempts, "parallel round exhausted");
        lo = hi.wrapping_add(1);
    }
}

/// Mines `block` in place at `difficulty` using every rayon worker.
/// On failure the block is untouched.
pub fn mine_block_parallel(
    block: &mut Block,
    difficulty: u32,
    budget: &Budget,
) -> Result<Solution, MiningError> {
    let template = HashTemplate::new(block);
    let solution = search_parallel(
        &template,
        block.nonce,
        |hash| meets_difficulty(hash, difficulty),
        budget,
    )?;
    block.commit(&solution);
    Ok(solution)
}
