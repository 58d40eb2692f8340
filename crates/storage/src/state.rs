use palisade_primitives::{Address, BlockNumber, HeightHashPair, SealedHeader, U256};
use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

/// Per-block statistics retained for difficulty recalculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockStatistics {
    /// The height of the block.
    pub number: BlockNumber,
    /// The timestamp of the block.
    pub timestamp: u64,
    /// The difficulty of the block.
    pub difficulty: U256,
}

#[derive(Debug, Clone, Default)]
struct CacheState {
    balances: HashMap<Address, u64>,
    height: BlockNumber,
    finalized: HeightHashPair,
    statistics: BTreeMap<BlockNumber, BlockStatistics>,
}

/// A summary of the changes a delta is about to publish, handed to the
/// state-change notification hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheChanges {
    /// The chain height the cache moves to.
    pub height: BlockNumber,
    /// How many accounts were touched by the delta.
    pub accounts_touched: usize,
}

/// The cached canonical account and network state.
///
/// All writers serialize through the delta discipline: [`begin_delta`]
/// hands out the unique writable snapshot, and while it is outstanding any
/// other call to [`begin_delta`] waits. Reads are never blocked and see only
/// committed state.
///
/// [`begin_delta`]: CanonicalCache::begin_delta
#[derive(Debug, Clone)]
pub struct CanonicalCache {
    shared: Arc<RwLock<CacheState>>,
    delta_permit: Arc<AsyncMutex<()>>,
}

impl CanonicalCache {
    /// Create a cache seeded from the genesis header.
    pub fn with_genesis(genesis: &SealedHeader) -> Self {
        let mut state = CacheState {
            height: genesis.number,
            finalized: genesis.height_hash(),
            ..Default::default()
        };
        state.statistics.insert(
            genesis.number,
            BlockStatistics {
                number: genesis.number,
                timestamp: genesis.timestamp,
                difficulty: genesis.difficulty,
            },
        );
        Self { shared: Arc::new(RwLock::new(state)), delta_permit: Arc::new(AsyncMutex::new(())) }
    }

    /// The committed chain height.
    pub fn height(&self) -> BlockNumber {
        self.shared.read().height
    }

    /// The committed last-finalized block.
    pub fn finalized(&self) -> HeightHashPair {
        self.shared.read().finalized
    }

    /// The committed balance of an account.
    pub fn balance(&self, account: Address) -> u64 {
        self.shared.read().balances.get(&account).copied().unwrap_or_default()
    }

    /// The most recent `count` per-block statistics, ascending by height.
    pub fn statistics_window(&self, count: usize) -> Vec<BlockStatistics> {
        let state = self.shared.read();
        let mut window: Vec<_> = state.statistics.values().rev().take(count).copied().collect();
        window.reverse();
        window
    }

    /// Like [`statistics_window`](Self::statistics_window), but only
    /// considering blocks strictly below the given height.
    ///
    /// Used to seed difficulty recalculation for a range that replaces part
    /// of the local chain.
    pub fn statistics_window_before(&self, height: BlockNumber, count: usize) -> Vec<BlockStatistics> {
        let state = self.shared.read();
        let mut window: Vec<_> =
            state.statistics.range(..height).rev().take(count).map(|(_, s)| *s).collect();
        window.reverse();
        window
    }

    /// Acquire the cache's single writable snapshot.
    ///
    /// Waits until any outstanding delta has been committed or discarded.
    pub async fn begin_delta(&self) -> CacheDelta {
        let permit = self.delta_permit.clone().lock_owned().await;
        let staged = self.shared.read().clone();
        CacheDelta { _permit: permit, shared: self.shared.clone(), staged, touched: HashSet::new() }
    }
}

/// A writable snapshot of the [`CanonicalCache`].
///
/// Move-only and exclusively owned: exactly one delta exists at a time.
/// Changes stage against the snapshot and are published atomically by
/// [`commit`](CacheDelta::commit); dropping the delta discards them.
#[derive(Debug)]
pub struct CacheDelta {
    _permit: OwnedMutexGuard<()>,
    shared: Arc<RwLock<CacheState>>,
    staged: CacheState,
    touched: HashSet<Address>,
}

impl CacheDelta {
    /// The staged chain height.
    pub fn height(&self) -> BlockNumber {
        self.staged.height
    }

    /// Stage a new chain height.
    pub fn set_height(&mut self, height: BlockNumber) {
        self.staged.height = height;
    }

    /// The staged last-finalized block.
    pub fn finalized(&self) -> HeightHashPair {
        self.staged.finalized
    }

    /// Stage new last-finalized bookkeeping.
    pub fn set_finalized(&mut self, finalized: HeightHashPair) {
        self.staged.finalized = finalized;
    }

    /// The staged balance of an account.
    pub fn balance(&self, account: Address) -> u64 {
        self.staged.balances.get(&account).copied().unwrap_or_default()
    }

    /// Stage a balance change for an account.
    pub fn set_balance(&mut self, account: Address, balance: u64) {
        self.touched.insert(account);
        self.staged.balances.insert(account, balance);
    }

    /// Stage per-block statistics for a newly applied block.
    pub fn push_statistics(&mut self, statistics: BlockStatistics) {
        self.staged.statistics.insert(statistics.number, statistics);
    }

    /// Drop staged statistics for every block above the given height.
    ///
    /// Used while unwinding the local chain back to the common block.
    pub fn remove_statistics_above(&mut self, height: BlockNumber) {
        self.staged.statistics.retain(|number, _| *number <= height);
    }

    /// Drop staged statistics below the given height.
    ///
    /// Blocks below the finalized height can never be unwound, so their
    /// statistics are no longer needed.
    pub fn prune_statistics_below(&mut self, height: BlockNumber) {
        self.staged.statistics.retain(|number, _| *number >= height);
    }

    /// Summarize the staged changes for the state-change hook.
    pub fn changes(&self) -> CacheChanges {
        CacheChanges { height: self.staged.height, accounts_touched: self.touched.len() }
    }

    /// Publish the staged state, releasing the delta.
    pub fn commit(self) {
        let height = self.staged.height;
        *self.shared.write() = self.staged;
        debug!(target: "storage::state", height, "Committed cache delta");
        // The permit drops here, letting the next writer in.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_primitives::Header;
    use std::time::Duration;
    use tokio::time::timeout;

    fn cache() -> CanonicalCache {
        let genesis =
            Header { number: 1, timestamp: 15, difficulty: U256::from(1000), ..Default::default() }
                .seal_slow();
        CanonicalCache::with_genesis(&genesis)
    }

    #[tokio::test]
    async fn discarded_delta_leaves_no_trace() {
        let cache = cache();
        let account = Address::repeat_byte(1);
        {
            let mut delta = cache.begin_delta().await;
            delta.set_balance(account, 500);
            delta.set_height(9);
            // Dropped without commit.
        }
        assert_eq!(cache.balance(account), 0);
        assert_eq!(cache.height(), 1);
    }

    #[tokio::test]
    async fn committed_delta_is_visible() {
        let cache = cache();
        let account = Address::repeat_byte(2);

        let mut delta = cache.begin_delta().await;
        delta.set_balance(account, 500);
        delta.set_height(2);
        delta.push_statistics(BlockStatistics {
            number: 2,
            timestamp: 30,
            difficulty: U256::from(1001),
        });
        assert_eq!(delta.changes(), CacheChanges { height: 2, accounts_touched: 1 });
        delta.commit();

        assert_eq!(cache.balance(account), 500);
        assert_eq!(cache.height(), 2);
        assert_eq!(cache.statistics_window(10).len(), 2);
    }

    #[tokio::test]
    async fn only_one_delta_is_outstanding() {
        let cache = cache();
        let first = cache.begin_delta().await;

        // The second acquisition must wait for the first delta's release.
        assert!(timeout(Duration::from_millis(20), cache.begin_delta()).await.is_err());

        first.commit();
        let _second = timeout(Duration::from_millis(20), cache.begin_delta())
            .await
            .expect("delta must be available after commit");
    }

    #[tokio::test]
    async fn statistics_window_is_bounded_and_ordered() {
        let cache = cache();
        let mut delta = cache.begin_delta().await;
        for number in 2..=6 {
            delta.push_statistics(BlockStatistics {
                number,
                timestamp: number * 15,
                difficulty: U256::from(1000 + number),
            });
        }
        delta.commit();

        let window = cache.statistics_window(3);
        assert_eq!(window.iter().map(|s| s.number).collect::<Vec<_>>(), vec![4, 5, 6]);
    }
}
