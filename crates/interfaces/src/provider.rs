use crate::error::StoreError;
use palisade_primitives::{BlockElement, BlockNumber, ChainInfo, SealedHeader, B256};
use std::ops::RangeInclusive;

/// Client API for canonical block storage.
///
/// Blocks are addressed by height with a parallel height-to-hash index.
/// Reads see only committed state; all mutation goes through the single
/// [`BlockStoreWriter`] handed out by [`BlockStore::writer`].
pub trait BlockStore: Send + Sync {
    /// The height and hash of the chain tip.
    fn chain_info(&self) -> Result<ChainInfo, StoreError>;

    /// The height of the chain tip.
    fn height(&self) -> Result<BlockNumber, StoreError> {
        Ok(self.chain_info()?.best_number)
    }

    /// The sealed header at the given height, if stored.
    fn sealed_header(&self, number: BlockNumber) -> Result<Option<SealedHeader>, StoreError>;

    /// The full block element at the given height, if stored.
    fn block_element(&self, number: BlockNumber) -> Result<Option<BlockElement>, StoreError>;

    /// The block hash at the given height, from the height-to-hash index.
    fn hash_by_height(&self, number: BlockNumber) -> Result<Option<B256>, StoreError>;

    /// Sealed headers for the given height range, in ascending order.
    ///
    /// Heights above the chain tip are silently omitted.
    fn sealed_headers_range(
        &self,
        range: RangeInclusive<BlockNumber>,
    ) -> Result<Vec<SealedHeader>, StoreError>;

    /// The hash of the latest importance block at or below `up_to` for the
    /// given importance grouping.
    ///
    /// Importance heights are derivable, so this only needs the hash index.
    fn last_importance_hash(
        &self,
        up_to: BlockNumber,
        grouping: u64,
    ) -> Result<Option<B256>, StoreError> {
        if grouping == 0 || up_to == 0 {
            return Ok(None)
        }
        let number = if up_to >= grouping { up_to - up_to % grouping } else { 1 };
        self.hash_by_height(number)
    }

    /// Acquire the store's write batch.
    ///
    /// Only one writer exists at a time; the returned handle stages changes
    /// that become visible to readers at [`BlockStoreWriter::commit`].
    fn writer(&self) -> Box<dyn BlockStoreWriter + '_>;
}

/// A staged write batch against a [`BlockStore`].
///
/// Dropping the writer without committing discards the staged changes.
pub trait BlockStoreWriter: Send {
    /// Stage removal of every block strictly above the given height.
    fn remove_blocks_above(&mut self, number: BlockNumber);

    /// Stage the given blocks for appending, lowest height first.
    fn append(&mut self, blocks: Vec<BlockElement>);

    /// Atomically publish the staged changes to readers.
    fn commit(self: Box<Self>);
}
