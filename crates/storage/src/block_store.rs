use palisade_interfaces::{
    error::StoreError,
    provider::{BlockStore, BlockStoreWriter},
};
use palisade_primitives::{BlockElement, BlockNumber, ChainInfo, SealedHeader, B256};
use parking_lot::RwLock;
use std::{collections::BTreeMap, ops::RangeInclusive, sync::Arc};
use tracing::debug;

#[derive(Debug, Default)]
struct StoreInner {
    blocks: BTreeMap<BlockNumber, BlockElement>,
    // Height-to-hash index, maintained in lockstep with `blocks`.
    hashes: BTreeMap<BlockNumber, B256>,
}

/// Height-addressed block storage held in memory.
///
/// Reads see only committed state. All mutation is staged through the write
/// batch returned by [`BlockStore::writer`] and becomes visible atomically
/// at commit, which is what lets the synchronization consumer hold its
/// writer across the whole commit phase without blocking readers.
#[derive(Debug, Clone)]
pub struct MemoryBlockStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl MemoryBlockStore {
    /// Create a store seeded with the given genesis block at height 1.
    pub fn with_genesis(genesis: BlockElement) -> Self {
        let mut inner = StoreInner::default();
        inner.hashes.insert(genesis.number(), genesis.hash());
        inner.blocks.insert(genesis.number(), genesis);
        Self { inner: Arc::new(RwLock::new(inner)) }
    }
}

impl BlockStore for MemoryBlockStore {
    fn chain_info(&self) -> Result<ChainInfo, StoreError> {
        let inner = self.inner.read();
        let (number, element) = inner.blocks.last_key_value().ok_or(StoreError::BlockNotFound {
            number: 0,
        })?;
        Ok(ChainInfo { best_number: *number, best_hash: element.hash() })
    }

    fn sealed_header(&self, number: BlockNumber) -> Result<Option<SealedHeader>, StoreError> {
        Ok(self.inner.read().blocks.get(&number).map(|element| element.header().clone()))
    }

    fn block_element(&self, number: BlockNumber) -> Result<Option<BlockElement>, StoreError> {
        Ok(self.inner.read().blocks.get(&number).cloned())
    }

    fn hash_by_height(&self, number: BlockNumber) -> Result<Option<B256>, StoreError> {
        let inner = self.inner.read();
        let hash = inner.hashes.get(&number).copied();
        if hash.is_some() != inner.blocks.contains_key(&number) {
            return Err(StoreError::HashIndexOutOfSync { number })
        }
        Ok(hash)
    }

    fn sealed_headers_range(
        &self,
        range: RangeInclusive<BlockNumber>,
    ) -> Result<Vec<SealedHeader>, StoreError> {
        Ok(self
            .inner
            .read()
            .blocks
            .range(range)
            .map(|(_, element)| element.header().clone())
            .collect())
    }

    fn writer(&self) -> Box<dyn BlockStoreWriter + '_> {
        Box::new(MemoryWriter { inner: &self.inner, remove_above: None, append: Vec::new() })
    }
}

struct MemoryWriter<'a> {
    inner: &'a Arc<RwLock<StoreInner>>,
    remove_above: Option<BlockNumber>,
    append: Vec<BlockElement>,
}

impl BlockStoreWriter for MemoryWriter<'_> {
    fn remove_blocks_above(&mut self, number: BlockNumber) {
        self.remove_above = Some(number);
    }

    fn append(&mut self, blocks: Vec<BlockElement>) {
        self.append.extend(blocks);
    }

    fn commit(self: Box<Self>) {
        let mut inner = self.inner.write();
        if let Some(floor) = self.remove_above {
            inner.blocks.retain(|number, _| *number <= floor);
            inner.hashes.retain(|number, _| *number <= floor);
        }
        let appended = self.append.len();
        for element in self.append {
            inner.hashes.insert(element.number(), element.hash());
            inner.blocks.insert(element.number(), element);
        }
        debug!(
            target: "storage::blocks",
            removed_above = ?self.remove_above,
            appended,
            height = inner.blocks.last_key_value().map(|(number, _)| *number).unwrap_or_default(),
            "Committed block write batch"
        );
    }
}
