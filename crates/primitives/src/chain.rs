use alloy_primitives::{BlockNumber, B256};
use serde::{Deserialize, Serialize};

/// Current status of the canonical chain's head.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    /// The height of the chain tip.
    pub best_number: BlockNumber,
    /// The entity hash of the chain tip.
    pub best_hash: B256,
}

/// A block identified by height and entity hash.
///
/// Used to compare local and network finality: the network finality
/// mechanism publishes the pair of its latest finalized block, and the node
/// compares it against the pair of the block it has locally at that height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeightHashPair {
    /// The height of the block.
    pub height: BlockNumber,
    /// The entity hash of the block.
    pub hash: B256,
}
