use palisade_interfaces::error::ProcessingError;
use palisade_primitives::{
    BlockElement, BlockNumber, HeightHashPair, ScoreDelta, TransactionInfo, B256,
};
use palisade_storage::{CacheChanges, CacheDelta, CommitOperationStep};
use std::{collections::HashSet, fmt};

/// Why a canonical block is being undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoBlockKind {
    /// The block is being removed from the chain; all of its effects are
    /// reverted.
    Rollback,
    /// The block stays on the chain as the new tip; only observer state that
    /// assumed it had descendants is rewound.
    Common,
}

/// Transactions whose confirmation status changed as a result of a sync
/// round.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransactionsChangeInfo {
    /// Hashes of transactions confirmed by the newly applied blocks.
    pub confirmed: HashSet<B256>,
    /// Transactions that were confirmed before the round but are not
    /// anymore, oldest first.
    pub reverted: Vec<TransactionInfo>,
}

type LocalFinalizedHook = Box<dyn Fn() -> HeightHashPair + Send + Sync>;
type NetworkFinalizedHook = Box<dyn Fn() -> HeightHashPair + Send + Sync>;
type ProcessorHook = Box<
    dyn Fn(&BlockElement, &[BlockElement], &mut CacheDelta) -> Result<(), ProcessingError>
        + Send
        + Sync,
>;
type UndoBlockHook = Box<dyn Fn(&BlockElement, &mut CacheDelta, UndoBlockKind) + Send + Sync>;
type StateChangeHook = Box<dyn Fn(&CacheChanges, &ScoreDelta, BlockNumber) + Send + Sync>;
type PreStateWrittenHook = Box<dyn Fn(&CacheDelta, BlockNumber) + Send + Sync>;
type TransactionsChangedHook = Box<dyn Fn(&TransactionsChangeInfo) + Send + Sync>;
type CommitStepHook = Box<dyn Fn(CommitOperationStep) + Send + Sync>;

/// The callbacks the chain-sync consumer needs from the surrounding node.
///
/// Four hooks are mandatory and provided at construction (see
/// [`SyncHooks::builder`]); the notification hooks default to no-ops.
pub struct SyncHooks {
    pub(crate) local_finalized: LocalFinalizedHook,
    pub(crate) network_finalized: NetworkFinalizedHook,
    pub(crate) processor: ProcessorHook,
    pub(crate) undo_block: UndoBlockHook,
    pub(crate) state_change: StateChangeHook,
    pub(crate) pre_state_written: PreStateWrittenHook,
    pub(crate) transactions_changed: TransactionsChangedHook,
    pub(crate) commit_step: CommitStepHook,
}

impl fmt::Debug for SyncHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncHooks").finish_non_exhaustive()
    }
}

impl SyncHooks {
    /// Start building hooks from the four mandatory callbacks.
    pub fn builder(
        local_finalized: impl Fn() -> HeightHashPair + Send + Sync + 'static,
        network_finalized: impl Fn() -> HeightHashPair + Send + Sync + 'static,
        processor: impl Fn(&BlockElement, &[BlockElement], &mut CacheDelta) -> Result<(), ProcessingError>
            + Send
            + Sync
            + 'static,
        undo_block: impl Fn(&BlockElement, &mut CacheDelta, UndoBlockKind) + Send + Sync + 'static,
    ) -> SyncHooksBuilder {
        SyncHooksBuilder {
            hooks: SyncHooks {
                local_finalized: Box::new(local_finalized),
                network_finalized: Box::new(network_finalized),
                processor: Box::new(processor),
                undo_block: Box::new(undo_block),
                state_change: Box::new(|_, _, _| {}),
                pre_state_written: Box::new(|_, _| {}),
                transactions_changed: Box::new(|_| {}),
                commit_step: Box::new(|_| {}),
            },
        }
    }
}

/// Builder for [`SyncHooks`], filling in the optional notification hooks.
#[derive(Debug)]
pub struct SyncHooksBuilder {
    hooks: SyncHooks,
}

impl SyncHooksBuilder {
    /// Notified with the aggregated cache changes after a successful round,
    /// before the state is published.
    pub fn state_change(
        mut self,
        hook: impl Fn(&CacheChanges, &ScoreDelta, BlockNumber) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.state_change = Box::new(hook);
        self
    }

    /// Notified with the staged delta right before it is committed.
    pub fn pre_state_written(
        mut self,
        hook: impl Fn(&CacheDelta, BlockNumber) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.pre_state_written = Box::new(hook);
        self
    }

    /// Notified with the confirmed/reverted transaction sets of the round.
    pub fn transactions_changed(
        mut self,
        hook: impl Fn(&TransactionsChangeInfo) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.transactions_changed = Box::new(hook);
        self
    }

    /// Notified as the three-step commit advances; the receiver is expected
    /// to persist the step durably.
    pub fn commit_step(
        mut self,
        hook: impl Fn(CommitOperationStep) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.commit_step = Box::new(hook);
        self
    }

    /// Finalize the hooks.
    pub fn build(self) -> SyncHooks {
        self.hooks
    }
}
