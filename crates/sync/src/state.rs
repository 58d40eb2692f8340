use palisade_primitives::{BlockElement, HeightHashPair, ScoreDelta, TransactionInfo};
use palisade_storage::CacheDelta;

/// The working set of one accepted sync attempt.
///
/// Produced once every validation phase has passed and consumed by the
/// commit phase; dropping it (on abort) releases the cache delta and leaves
/// no observable trace.
#[derive(Debug)]
pub struct SyncState {
    /// The staged cache snapshot, already unwound to the common block and
    /// advanced through the peer blocks.
    pub(crate) delta: CacheDelta,
    /// The last block shared by the local and peer chains.
    pub(crate) common_block: BlockElement,
    /// How much the accepted chain improves on the replaced one.
    pub(crate) score_delta: ScoreDelta,
    /// Transactions confirmed by the replaced local blocks, oldest first.
    pub(crate) removed_transactions: Vec<TransactionInfo>,
    /// The finalized pair the chain advances to at the end of the commit.
    pub(crate) finalized: HeightHashPair,
    /// The finalized pair before the attempt; the statistics prune horizon.
    pub(crate) local_finalized: HeightHashPair,
}
