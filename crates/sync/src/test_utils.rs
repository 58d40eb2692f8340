//! Construction of linked, difficulty-consistent chains for tests.

use crate::{DifficultyCalculator, SyncConfig};
use palisade_primitives::{
    Address, Block, BlockElement, Header, SealedHeader, TransactionSigned, B256, U256,
};
use palisade_storage::BlockStatistics;

/// Builds blocks that pass every stateless chain check: each block links to
/// the previous one, states the recalculated expected difficulty and carries
/// the correct importance-predecessor hash.
///
/// The builder is [`Clone`], so a fork can be grown from any point by
/// cloning it before continuing.
#[derive(Debug, Clone)]
pub struct ChainBuilder {
    calculator: DifficultyCalculator,
    max_window: usize,
    grouping: u64,
    parent: SealedHeader,
    window: Vec<BlockStatistics>,
    last_importance_hash: Option<B256>,
}

impl ChainBuilder {
    /// Start a chain on top of the given sealed block, usually the genesis
    /// produced by [`ChainBuilder::genesis`].
    pub fn new(config: &SyncConfig, parent: SealedHeader) -> Self {
        let last_importance_hash =
            parent.is_importance(config.importance_grouping).then(|| parent.hash());
        let window = vec![BlockStatistics {
            number: parent.number,
            timestamp: parent.timestamp,
            difficulty: parent.difficulty,
        }];
        Self {
            calculator: DifficultyCalculator::new(config),
            max_window: config.max_difficulty_blocks.max(1),
            grouping: config.importance_grouping,
            parent,
            window,
            last_importance_hash,
        }
    }

    /// A genesis header at height 1.
    pub fn genesis() -> SealedHeader {
        Header { number: 1, timestamp: 1000, difficulty: U256::from(10_000), ..Default::default() }
            .seal_slow()
    }

    /// The current chain tip.
    pub fn tip(&self) -> &SealedHeader {
        &self.parent
    }

    /// Append one empty block after `block_time` seconds.
    pub fn next_block(&mut self, block_time: u64) -> BlockElement {
        self.next_block_full(block_time, Address::ZERO, Vec::new())
    }

    /// Append one block with an explicit harvester and body.
    pub fn next_block_full(
        &mut self,
        block_time: u64,
        beneficiary: Address,
        body: Vec<TransactionSigned>,
    ) -> BlockElement {
        let mut header = Header {
            number: self.parent.number + 1,
            parent_hash: self.parent.hash(),
            timestamp: self.parent.timestamp + block_time,
            difficulty: self.calculator.expected_difficulty(&self.window),
            beneficiary,
            ..Default::default()
        };
        if header.is_importance(self.grouping) {
            if let Some(hash) = self.last_importance_hash {
                header.previous_importance_hash = hash;
            }
        }

        let sealed = Block { header, body }.seal_slow();
        self.window.push(BlockStatistics {
            number: sealed.number,
            timestamp: sealed.timestamp,
            difficulty: sealed.difficulty,
        });
        if self.window.len() > self.max_window {
            self.window.remove(0);
        }
        if sealed.is_importance(self.grouping) {
            self.last_importance_hash = Some(sealed.hash());
        }
        self.parent = sealed.header.clone();
        BlockElement::new(sealed)
    }

    /// Append `count` empty blocks at a fixed block time.
    pub fn blocks(&mut self, count: usize, block_time: u64) -> Vec<BlockElement> {
        (0..count).map(|_| self.next_block(block_time)).collect()
    }
}
