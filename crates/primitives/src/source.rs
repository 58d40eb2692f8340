use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// The identity of the peer a batch originated from.
///
/// Peers in a permissioned network are keyed by the hash of their identity
/// key; the zero id denotes a locally produced batch.
pub type PeerId = B256;

/// Where a pipeline batch came from.
///
/// The source determines how strict the chain-synchronization checks are:
/// only pull-based batches, which the node explicitly requested, may rewind
/// the local chain below its current tip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputSource {
    /// Produced by the local harvester.
    Local,
    /// Pushed unsolicited by a remote peer.
    RemotePush,
    /// Pulled from a remote peer by the local synchronizer.
    RemotePull,
    /// Origin unknown.
    #[default]
    Unknown,
}

impl InputSource {
    /// Returns `true` if the batch was explicitly requested from a peer.
    pub const fn is_pull(&self) -> bool {
        matches!(self, Self::RemotePull)
    }
}
