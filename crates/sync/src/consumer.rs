use crate::{
    difficulty::DifficultyCalculator,
    hooks::{SyncHooks, TransactionsChangeInfo, UndoBlockKind},
    linkage::{is_link, partial_chain_score},
    state::SyncState,
    SyncConfig,
};
use async_trait::async_trait;
use palisade_interfaces::{
    error::{ConsumeError, Severity, StoreError},
    provider::BlockStore,
};
use palisade_pipeline::{Consumer, ConsumerInput, ConsumerResult};
use palisade_primitives::{BlockElement, BlockNumber, ChainScore, HeightHashPair, B256};
use palisade_storage::{BlockStatistics, CanonicalCache, CommitOperationStep};
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, info, warn};

/// The terminal consumer of the block pipeline: fork choice and chain
/// replacement.
///
/// For every batch the consumer decides whether the supplied range should
/// replace the suffix of the canonical chain. Validation runs against a
/// staged cache delta; nothing is observable until every check has passed,
/// at which point the replacement is applied as a three-step commit whose
/// progress is reported through the `commit_step` hook.
pub struct ChainSyncConsumer<S> {
    store: Arc<S>,
    cache: CanonicalCache,
    config: SyncConfig,
    difficulty: DifficultyCalculator,
    hooks: SyncHooks,
}

impl<S: BlockStore> ChainSyncConsumer<S> {
    /// Create the consumer over the given storage and cache.
    pub fn new(store: Arc<S>, cache: CanonicalCache, config: SyncConfig, hooks: SyncHooks) -> Self {
        let difficulty = DifficultyCalculator::new(&config);
        Self { store, cache, config, difficulty, hooks }
    }

    /// Run the validation phases, producing the working set of an accepted
    /// attempt.
    ///
    /// Everything staged here lives in the returned [`SyncState`]; an error
    /// return has not changed any observable state.
    async fn sync(&self, input: &ConsumerInput<BlockElement>) -> Result<SyncState, ConsumeError> {
        let elements = input.elements();
        let first = elements.first().ok_or(ConsumeError::EmptyInput)?;
        let last_number = first.number() + elements.len() as u64 - 1;

        // Finality pairs are fetched before any chain read so the checks
        // below never see a finalization newer than the chain they inspect.
        let local_finalized = (self.hooks.local_finalized)();
        let network_finalized = (self.hooks.network_finalized)();

        let local_height = self.store.height()?;
        let peer_start = first.number();

        // The range must attach to a stored block, and only pull sources may
        // rewrite below the local tip.
        if peer_start < 2 || peer_start > local_height + 1 {
            return Err(ConsumeError::Unlinked)
        }
        if !input.source().is_pull() && peer_start < local_height {
            return Err(ConsumeError::Unlinked)
        }

        let common_height = peer_start - 1;
        let parent =
            self.store.sealed_header(common_height)?.ok_or(ConsumeError::Unlinked)?;
        if !is_link(&parent, parent.hash(), first.header()) {
            return Err(ConsumeError::Unlinked)
        }
        let mut prev = first;
        for block in &elements[1..] {
            if !is_link(prev.header(), prev.hash(), block.header()) {
                return Err(ConsumeError::Unlinked)
            }
            prev = block;
        }

        // A network finalization the local chain has not caught up to, whose
        // finalized block is inside this very range, overrides both the
        // deep-rewrite and the score check: refusing the range would strand
        // the node on an unfinalizable fork.
        let finality_override = network_finalized.height > local_finalized.height &&
            (peer_start..=last_number).contains(&network_finalized.height) &&
            elements[(network_finalized.height - peer_start) as usize].hash() ==
                network_finalized.hash;

        if peer_start <= local_finalized.height && !finality_override {
            return Err(ConsumeError::TooFarBehind)
        }

        let matched = self.difficulty.check_difficulties(&self.cache, elements);
        if matched != elements.len() {
            return Err(ConsumeError::DifficultiesMismatch { matched, count: elements.len() })
        }

        // All stateless checks passed; acquire the unique writable snapshot
        // and unwind it to the common block.
        let mut delta = self.cache.begin_delta().await;

        let common_block = self
            .store
            .block_element(common_height)?
            .ok_or(StoreError::BlockNotFound { number: common_height })?;
        let mut local_elements = Vec::with_capacity((local_height - common_height) as usize);
        for number in peer_start..=local_height {
            local_elements
                .push(self.store.block_element(number)?.ok_or(StoreError::BlockNotFound { number })?);
        }

        for block in local_elements.iter().rev() {
            (self.hooks.undo_block)(block, &mut delta, UndoBlockKind::Rollback);
        }
        (self.hooks.undo_block)(&common_block, &mut delta, UndoBlockKind::Common);
        delta.remove_statistics_above(common_height);
        delta.set_height(common_height);

        let removed_transactions: Vec<_> =
            local_elements.iter().flat_map(|block| block.transaction_infos()).collect();

        let local_score = partial_chain_score(common_block.header(), &local_elements);
        let peer_score = partial_chain_score(common_block.header(), elements);
        let score_delta = ChainScore::delta(peer_score, local_score);
        if !score_delta.is_improvement() && !finality_override {
            return Err(ConsumeError::ScoreNotBetter)
        }

        let finalized = if network_finalized.height > local_finalized.height &&
            self.pair_in_new_chain(&network_finalized, common_height, elements)?
        {
            network_finalized
        } else {
            local_finalized
        };

        // Execution phase: the stateful processor applies every peer block
        // against the unwound delta.
        (self.hooks.processor)(&common_block, elements, &mut delta)?;

        self.check_importance_links(common_height, elements)?;

        for block in elements {
            delta.push_statistics(BlockStatistics {
                number: block.number(),
                timestamp: block.timestamp,
                difficulty: block.difficulty,
            });
        }
        delta.set_height(last_number);

        Ok(SyncState {
            delta,
            common_block,
            score_delta,
            removed_transactions,
            finalized,
            local_finalized,
        })
    }

    /// Whether the given pair identifies a block of the post-sync chain,
    /// which is the stored chain up to `common_height` plus `elements`.
    fn pair_in_new_chain(
        &self,
        pair: &HeightHashPair,
        common_height: BlockNumber,
        elements: &[BlockElement],
    ) -> Result<bool, StoreError> {
        let peer_start = common_height + 1;
        if pair.height >= peer_start {
            let index = (pair.height - peer_start) as usize;
            return Ok(elements.get(index).is_some_and(|block| block.hash() == pair.hash))
        }
        Ok(self.store.hash_by_height(pair.height)? == Some(pair.hash))
    }

    /// Every importance block in the range must reference the hash of its
    /// importance predecessor, starting from the last one stored locally.
    fn check_importance_links(
        &self,
        common_height: BlockNumber,
        elements: &[BlockElement],
    ) -> Result<(), ConsumeError> {
        let grouping = self.config.importance_grouping;
        if grouping == 0 {
            return Ok(())
        }
        let mut expected = self.store.last_importance_hash(common_height, grouping)?;
        for block in elements {
            if block.is_importance(grouping) {
                if let Some(expected_hash) = expected {
                    if block.previous_importance_hash != expected_hash {
                        return Err(ConsumeError::ImproperImportanceLink)
                    }
                }
                expected = Some(block.hash());
            }
        }
        Ok(())
    }

    /// Apply an accepted attempt.
    ///
    /// Infallible by construction: every input has been validated and every
    /// write target staged. The three steps are reported through the
    /// `commit_step` hook so a crashed node can tell how far it got.
    fn commit(&self, state: SyncState, blocks: Vec<BlockElement>) {
        let SyncState {
            mut delta,
            common_block,
            score_delta,
            removed_transactions,
            finalized,
            local_finalized,
        } = state;
        let new_height = delta.height();

        let confirmed: HashSet<B256> =
            blocks.iter().flat_map(|block| block.transaction_hashes()).collect();

        // Step 1: the block range is staged in storage.
        let mut writer = self.store.writer();
        writer.remove_blocks_above(common_block.number());
        writer.append(blocks);
        (self.hooks.commit_step)(CommitOperationStep::BlocksWritten);

        // Step 2: the state delta is final; notify before publishing.
        delta.prune_statistics_below(local_finalized.height);
        (self.hooks.state_change)(&delta.changes(), &score_delta, new_height);
        (self.hooks.pre_state_written)(&delta, new_height);
        (self.hooks.commit_step)(CommitOperationStep::StateWritten);

        // Step 3: publish cache and storage back to back.
        delta.set_finalized(finalized);
        delta.commit();
        writer.commit();
        (self.hooks.commit_step)(CommitOperationStep::AllUpdated);

        let reverted: Vec<_> = removed_transactions
            .into_iter()
            .filter(|info| !confirmed.contains(&info.hash))
            .collect();
        (self.hooks.transactions_changed)(&TransactionsChangeInfo { confirmed, reverted });
    }
}

#[async_trait]
impl<S: BlockStore> Consumer<BlockElement> for ChainSyncConsumer<S> {
    fn name(&self) -> &'static str {
        "chain_sync"
    }

    /// Run the synchronization phases over the batch.
    ///
    /// On success the elements are detached into block storage, so the
    /// terminal result is [`ConsumerResult::Complete`] rather than
    /// `Continue`: the batch has been fully consumed and there is nothing
    /// left for a later consumer to see.
    async fn consume(&mut self, input: &mut ConsumerInput<BlockElement>) -> ConsumerResult {
        let state = match self.sync(input).await {
            Ok(state) => state,
            Err(err) => {
                match err.severity() {
                    Severity::Neutral => {
                        debug!(target: "sync::chain", %err, batch = input.id(), "Batch not applicable")
                    }
                    Severity::Failure | Severity::Fatal => {
                        warn!(target: "sync::chain", %err, batch = input.id(), peer = %input.peer(), "Rejected batch")
                    }
                }
                return ConsumerResult::Abort(err)
            }
        };

        let blocks = input.detach();
        let height = state.delta.height();
        let improvement = state.score_delta.magnitude;
        self.commit(state, blocks);
        info!(
            target: "sync::chain",
            height,
            improvement = %improvement.get(),
            batch = input.id(),
            "Synchronized chain"
        );
        ConsumerResult::Complete
    }
}
