//! Value types shared across the palisade node crates.
//!
//! These types are intentionally small: the node core treats blocks as opaque
//! beyond the header fields needed for linkage, scoring and fork choice.

mod block;
mod chain;
mod score;
mod source;
mod transaction;

pub use block::{Block, BlockElement, Header, SealedBlock, SealedHeader};
pub use chain::{ChainInfo, HeightHashPair};
pub use score::{ChainScore, ScoreDelta};
pub use source::{InputSource, PeerId};
pub use transaction::{TransactionInfo, TransactionSigned};

pub use alloy_primitives::{keccak256, Address, BlockNumber, Bytes, B256, U256};
