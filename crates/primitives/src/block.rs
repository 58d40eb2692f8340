use crate::{TransactionInfo, TransactionSigned};
use alloy_primitives::{keccak256, Address, BlockNumber, B256, U256};
use alloy_rlp::{RlpDecodable, RlpEncodable};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// A block header.
///
/// Only the fields the synchronization core actually inspects are modeled;
/// everything else a block carries is part of the opaque payload.
#[derive(
    Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
pub struct Header {
    /// The height of the block. Strictly increasing, genesis is at height 1.
    pub number: BlockNumber,
    /// The entity hash of the parent block.
    pub parent_hash: B256,
    /// Network timestamp at which the block was harvested, in seconds.
    pub timestamp: u64,
    /// The difficulty the harvester claims for this block.
    pub difficulty: U256,
    /// The account that signed the block.
    pub beneficiary: Address,
    /// Merkle root over the contained transactions.
    pub transactions_root: B256,
    /// Hash of the preceding importance block.
    ///
    /// Only meaningful on importance blocks (see [`Header::is_importance`]);
    /// zero otherwise.
    pub previous_importance_hash: B256,
}

impl Header {
    /// Returns `true` if this header is an importance (voting-weight) block
    /// for the given grouping.
    ///
    /// The nemesis block and every `grouping`-th block thereafter recalculate
    /// voting weights and must link to their importance predecessor.
    pub fn is_importance(&self, grouping: u64) -> bool {
        grouping != 0 && (self.number == 1 || self.number % grouping == 0)
    }

    /// Calculate the entity hash of the header.
    ///
    /// This is expensive, prefer [`SealedHeader`] when the hash is reused.
    pub fn hash_slow(&self) -> B256 {
        keccak256(alloy_rlp::encode(self))
    }

    /// Seal the header with the hash computed by [`Header::hash_slow`].
    pub fn seal_slow(self) -> SealedHeader {
        let hash = self.hash_slow();
        SealedHeader { header: self, hash }
    }

    /// Seal the header with a hash computed elsewhere.
    ///
    /// The caller is responsible for the hash being correct.
    pub fn seal(self, hash: B256) -> SealedHeader {
        SealedHeader { header: self, hash }
    }
}

/// A [`Header`] together with its entity hash.
///
/// The header is immutable once sealed; mutation requires
/// [`SealedHeader::unseal`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SealedHeader {
    header: Header,
    hash: B256,
}

impl SealedHeader {
    /// The entity hash.
    pub fn hash(&self) -> B256 {
        self.hash
    }

    /// Extract the inner header, dropping the seal.
    pub fn unseal(self) -> Header {
        self.header
    }

    /// The height and hash of this header as a pair.
    pub fn height_hash(&self) -> crate::HeightHashPair {
        crate::HeightHashPair { height: self.number, hash: self.hash }
    }
}

impl Deref for SealedHeader {
    type Target = Header;

    fn deref(&self) -> &Self::Target {
        &self.header
    }
}

/// A full block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Block {
    /// The block header.
    pub header: Header,
    /// Transactions contained in the block.
    pub body: Vec<TransactionSigned>,
}

impl Block {
    /// Seal the block, computing the header hash.
    pub fn seal_slow(self) -> SealedBlock {
        SealedBlock { header: self.header.seal_slow(), body: self.body }
    }
}

impl Deref for Block {
    type Target = Header;

    fn deref(&self) -> &Self::Target {
        &self.header
    }
}

/// A block whose header hash has been computed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SealedBlock {
    /// The sealed header.
    pub header: SealedHeader,
    /// Transactions contained in the block.
    pub body: Vec<TransactionSigned>,
}

impl SealedBlock {
    /// The entity hash of the block header.
    pub fn hash(&self) -> B256 {
        self.header.hash()
    }
}

impl Deref for SealedBlock {
    type Target = SealedHeader;

    fn deref(&self) -> &Self::Target {
        &self.header
    }
}

/// A block as it travels through the batch pipeline: the sealed block plus
/// derived per-transaction bookkeeping.
///
/// Elements are immutable for the life of a batch. Where an element outlives
/// its batch (e.g. a new-block notification fan-out) it is wrapped in an
/// explicit shared handle by the forwarder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockElement {
    /// The sealed block.
    pub block: SealedBlock,
}

impl BlockElement {
    /// Wrap a sealed block.
    pub fn new(block: SealedBlock) -> Self {
        Self { block }
    }

    /// The entity hash of the block.
    pub fn hash(&self) -> B256 {
        self.block.hash()
    }

    /// The height of the block.
    pub fn number(&self) -> BlockNumber {
        self.block.number
    }

    /// The sealed header.
    pub fn header(&self) -> &SealedHeader {
        &self.block.header
    }

    /// Infos for every transaction contained in the block.
    pub fn transaction_infos(&self) -> Vec<TransactionInfo> {
        self.block
            .body
            .iter()
            .map(|tx| TransactionInfo { hash: tx.hash, height: self.block.number })
            .collect()
    }

    /// Hashes of every transaction contained in the block.
    pub fn transaction_hashes(&self) -> impl Iterator<Item = B256> + '_ {
        self.block.body.iter().map(|tx| tx.hash)
    }
}

impl Deref for BlockElement {
    type Target = SealedBlock;

    fn deref(&self) -> &Self::Target {
        &self.block
    }
}
