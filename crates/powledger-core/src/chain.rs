use crate::{
    config::{ChainConfig, MiningStrategy},
    constants::{GENESIS_INDEX, GENESIS_PAYLOAD, GENESIS_PREVIOUS_HASH},
    error::{ChainError, ValidationError},
    mine::mine_block_parallel,
    pow::{Budget, Solution},
    Block,
};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Append-only sequence of blocks rooted at an unmined genesis block.
///
/// Blocks enter only through [`Chain::append`], which links and mines them.
/// [`Chain::validate`] re-derives every hash and link to catch edits made
/// behind the chain's back.
#[derive(Clone, Debug, Serialize)]
pub struct Chain {
    config: ChainConfig,
    blocks: Vec<Block>,
}

/// Genesis: index 0, fixed payload, sentinel previous hash, nonce 0. Exempt
/// from proof-of-work.
pub fn genesis_block(timestamp: Option<u64>) -> Block {
    Block::new(GENESIS_INDEX, GENESIS_PAYLOAD, GENESIS_PREVIOUS_HASH, timestamp)
}

impl Chain {
    /// Chain with a fresh genesis block and default settings at `difficulty`.
    ///
    /// The difficulty is not checked here; anything above 64 can never be
    /// met and `append` would not return. Use [`Chain::with_config`] for a
    /// checked constructor.
    pub fn new(difficulty: u32) -> Self {
        Self::from_config(ChainConfig::with_difficulty(difficulty))
    }

    pub fn with_config(config: ChainConfig) -> Result<Self, ChainError> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: ChainConfig) -> Self {
        let genesis = genesis_block(config.genesis_timestamp);
        debug!(hash = %genesis.hash, difficulty = config.difficulty, "created genesis block");
        Self {
            config,
            blocks: vec![genesis],
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn difficulty(&self) -> u32 {
        self.config.difficulty
    }

    /// The tip. Only fails if the genesis invariant was broken.
    pub fn latest(&self) -> Result<&Block, ChainError> {
        self.blocks.last().ok_or(ChainError::EmptyChain)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Raw mutable access for tamper simulations. Edits made here skip
    /// linking and mining; `validate` reports them.
    pub fn block_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index)
    }

    /// Link `block` to the tip, mine it at the chain's difficulty and push it.
    ///
    /// Whatever `previous_hash` the caller put in is overwritten. Any payload
    /// is accepted.
    pub fn append(&mut self, block: Block) -> Result<&Block, ChainError> {
        self.append_within(block, &Budget::unbounded())
    }

    /// [`Chain::append`] with a mining budget. If the budget runs out the
    /// block is dropped and the chain is unchanged.
    pub fn append_within(&mut self, mut block: Block, budget: &Budget) -> Result<&Block, ChainError> {
        let expected_index = self.blocks.len() as u64;
        if block.index != expected_index {
            warn!(
                index = block.index,
                expected_index, "appending block with out-of-sequence index"
            );
        }

        block.previous_hash.clone_from(&self.latest()?.hash);
        let solution = self.mine(&mut block, budget)?;
        info!(
            index = block.index,
            nonce = solution.nonce,
            attempts = solution.attempts,
            hash = %block.hash,
            "mined block"
        );

        let position = self.blocks.len();
        self.blocks.push(block);
        Ok(&self.blocks[position])
    }

    fn mine(&self, block: &mut Block, budget: &Budget) -> Result<Solution, ChainError> {
        let difficulty = self.config.difficulty;
        let solution = match self.config.strategy {
            MiningStrategy::Sequential => block.mine_within(difficulty, budget)?,
            MiningStrategy::Parallel => mine_block_parallel(block, difficulty, budget)?,
        };
        Ok(solution)
    }

    /// Walk blocks 1.. and stop at the first one whose stored hash differs
    /// from its recomputed digest or whose `previous_hash` differs from the
    /// predecessor's stored hash. The hash check runs first.
    ///
    /// Proof-of-work is not re-checked, and genesis is never inspected.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (offset, pair) in self.blocks.windows(2).enumerate() {
            let index = offset + 1;
            if let Some(err) = check_block(index, &pair[0], &pair[1]).into_iter().next() {
                warn!(%err, "chain validation failed");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Every failure `validate` could report, in index order. A block can
    /// contribute both a tamper and a link failure.
    pub fn validate_all(&self) -> Vec<ValidationError> {
        let failures: Vec<ValidationError> = self
            .blocks
            .windows(2)
            .enumerate()
            .flat_map(|(offset, pair)| check_block(offset + 1, &pair[0], &pair[1]))
            .collect();
        for err in &failures {
            warn!(%err, "chain validation failed");
        }
        failures
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

fn check_block(index: usize, previous: &Block, current: &Block) -> Vec<ValidationError> {
    let mut failures = Vec::new();
    if current.hash != current.digest() {
        failures.push(ValidationError::TamperedBlock { index });
    }
    if current.previous_hash != previous.hash {
        failures.push(ValidationError::BrokenLink { index });
    }
    failures
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_DIFFICULTY;

    #[test]
    fn genesis_block_example() {
        let genesis = genesis_block(Some(1_700_000_000_000));
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, "0");
        assert_eq!(genesis.transactions, serde_json::json!("Genesis Block"));
        assert_eq!(genesis.nonce, 0);
        assert_eq!(
            genesis.hash,
            "48c2aefc6d179fdee9d852023da0b679dc0dba8c0dd59ac5da61a8fe0fb252d5"
        );
    }

    #[test]
    fn new_chain_holds_only_genesis() {
        let chain = Chain::new(3);
        assert_eq!(chain.len(), 1);
        assert!(!chain.is_empty());
        assert_eq!(chain.difficulty(), 3);
        let tip = chain.latest().unwrap();
        assert_eq!(tip.index, 0);
        assert_eq!(tip.previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(chain.validate().is_ok());
    }

    #[test]
    fn default_config_difficulty() {
        let chain = Chain::with_config(ChainConfig::default()).unwrap();
        assert_eq!(chain.difficulty(), DEFAULT_DIFFICULTY);
    }

    #[test]
    fn with_config_rejects_unreachable_difficulty() {
        let err = Chain::with_config(ChainConfig::with_difficulty(100)).unwrap_err();
        assert_eq!(
            err,
            ChainError::InvalidDifficulty {
                difficulty: 100,
                max: 64
            }
        );
    }

    #[test]
    fn latest_on_empty_chain() {
        let mut chain = Chain::new(0);
        chain.blocks.clear();
        assert_eq!(chain.latest(), Err(ChainError::EmptyChain));
        assert_eq!(
            chain.append(Block::new(0, "x", "", None)).unwrap_err(),
            ChainError::EmptyChain
        );
    }

    #[test]
    fn validate_all_lists_both_failures_of_one_block() {
        let mut chain = Chain::new(1);
        chain.append(Block::new(1, "a", "", None)).unwrap();
        let block = chain.block_mut(1).unwrap();
        block.previous_hash = "bogus".into();
        assert_eq!(
            chain.validate_all(),
            vec![
                ValidationError::TamperedBlock { index: 1 },
                ValidationError::BrokenLink { index: 1 },
            ]
        );
        assert_eq!(
            chain.validate(),
            Err(ValidationError::TamperedBlock { index: 1 })
        );
    }
}
