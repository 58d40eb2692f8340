use crate::SyncConfig;
use palisade_primitives::{BlockElement, U256};
use palisade_storage::{BlockStatistics, CanonicalCache};

/// Bound divisor of the per-block difficulty adjustment (5%).
const SMOOTHING_DIVISOR: u64 = 20;

/// Recalculates the expected difficulty of blocks from a sliding window of
/// historical per-block statistics.
///
/// The expected difficulty is the window average nudged up when the window's
/// average block time is faster than the target and down when slower, by at
/// most one [`SMOOTHING_DIVISOR`]-th per block, floored at 1.
#[derive(Debug, Clone)]
pub struct DifficultyCalculator {
    max_window: usize,
    target_block_time: u64,
}

impl DifficultyCalculator {
    /// Create a calculator from the sync configuration.
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            max_window: config.max_difficulty_blocks.max(1),
            target_block_time: config.target_block_time.as_secs().max(1),
        }
    }

    /// The expected difficulty of the block following the given window.
    ///
    /// The window is ascending by height. An empty window yields the floor
    /// difficulty.
    pub fn expected_difficulty(&self, window: &[BlockStatistics]) -> U256 {
        let floor = U256::from(1);
        let (Some(first), Some(last)) = (window.first(), window.last()) else { return floor };

        let sum = window.iter().fold(U256::ZERO, |acc, stats| acc + stats.difficulty);
        let average = sum / U256::from(window.len() as u64);
        if window.len() < 2 {
            return average.max(floor)
        }

        let elapsed = last.timestamp.saturating_sub(first.timestamp);
        let average_time = elapsed / (window.len() as u64 - 1);
        let adjustment = average / U256::from(SMOOTHING_DIVISOR);

        let expected = if average_time < self.target_block_time {
            average + adjustment
        } else if average_time > self.target_block_time {
            average.saturating_sub(adjustment)
        } else {
            average
        };
        expected.max(floor)
    }

    /// Compare each block's stated difficulty against the recalculated
    /// expectation, in order, seeding the window from the cache.
    ///
    /// Returns the number of leading blocks that matched; a full match
    /// returns `blocks.len()`, anything less pinpoints the divergence.
    pub fn check_difficulties(&self, cache: &CanonicalCache, blocks: &[BlockElement]) -> usize {
        let Some(first) = blocks.first() else { return 0 };
        let mut window = cache.statistics_window_before(first.number(), self.max_window);

        let mut matched = 0;
        for block in blocks {
            if block.difficulty != self.expected_difficulty(&window) {
                break
            }
            matched += 1;
            window.push(BlockStatistics {
                number: block.number(),
                timestamp: block.timestamp,
                difficulty: block.difficulty,
            });
            if window.len() > self.max_window {
                window.remove(0);
            }
        }
        matched
    }
}
