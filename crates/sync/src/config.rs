use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the chain-synchronization consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// The maximum number of trailing blocks considered when recalculating
    /// the expected difficulty of the next block.
    pub max_difficulty_blocks: usize,
    /// Importance blocks recalculate voting weights every this many heights.
    ///
    /// Zero disables importance-link validation.
    pub importance_grouping: u64,
    /// The block time the difficulty adjustment steers toward.
    #[serde(with = "humantime_serde")]
    pub target_block_time: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_difficulty_blocks: 60,
            importance_grouping: 360,
            target_block_time: Duration::from_secs(15),
        }
    }
}
