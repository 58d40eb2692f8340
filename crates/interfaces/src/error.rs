use palisade_primitives::BlockNumber;
use thiserror::Error;

/// How a batch rejection reflects on the peer that supplied the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// The rejection carries no judgement about the peer, e.g. an
    /// equal-score chain or a local storage fault.
    Neutral,
    /// The peer supplied data that failed validation.
    Failure,
    /// The peer supplied data that implies it must be banned.
    Fatal,
}

/// An error reported by the injected stateful block processor.
///
/// The processor communicates failures as opaque result codes; the
/// synchronization consumer only needs to know whether a code is
/// ban-worthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stateful processing failed with code {code:#x}")]
pub struct ProcessingError {
    /// The failure code reported by the processor.
    pub code: u32,
    /// Whether the failure implies the source must be banned.
    pub fatal: bool,
}

/// A block storage error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store has no block at the requested height.
    #[error("block at height {number} not found in store")]
    BlockNotFound {
        /// The requested height.
        number: BlockNumber,
    },
    /// The height-to-hash index disagrees with the block table.
    #[error("hash index out of sync at height {number}")]
    HashIndexOutOfSync {
        /// The height at which the mismatch was detected.
        number: BlockNumber,
    },
}

/// The reason a batch was rejected by a pipeline consumer.
///
/// Every rejection is a value, never a panic: the dispatcher surfaces the
/// error to the inspector and moves on to the next batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConsumeError {
    /// The batch contained no elements. Upstream contract violation.
    #[error("batch contains no elements")]
    EmptyInput,
    /// The block range does not attach to the local chain.
    #[error("block range does not link to the local chain")]
    Unlinked,
    /// The block range starts at or below the local finalized height.
    #[error("block range starts at or below the local finalized height")]
    TooFarBehind,
    /// A block states a difficulty inconsistent with the difficulty history.
    #[error("only the first {matched} of {count} block difficulties are consistent")]
    DifficultiesMismatch {
        /// Number of leading blocks whose stated difficulty matched.
        matched: usize,
        /// Total number of blocks in the range.
        count: usize,
    },
    /// The peer chain does not score strictly higher than the local chain.
    #[error("peer chain score does not improve on the local chain score")]
    ScoreNotBetter,
    /// An importance block does not reference its importance predecessor.
    #[error("importance block does not link to its importance predecessor")]
    ImproperImportanceLink,
    /// The injected stateful processor rejected the range.
    #[error(transparent)]
    Processing(#[from] ProcessingError),
    /// Block storage failed while servicing the batch.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ConsumeError {
    /// How this rejection reflects on the peer that supplied the batch.
    pub const fn severity(&self) -> Severity {
        match self {
            // An equal-score chain is a normal race, and storage or
            // empty-input faults are local, not peer-attributable.
            Self::ScoreNotBetter | Self::Storage(_) | Self::EmptyInput => Severity::Neutral,
            Self::Unlinked |
            Self::TooFarBehind |
            Self::DifficultiesMismatch { .. } |
            Self::ImproperImportanceLink => Severity::Failure,
            Self::Processing(err) => {
                if err.fatal {
                    Severity::Fatal
                } else {
                    Severity::Failure
                }
            }
        }
    }
}
