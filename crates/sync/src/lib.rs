//! Chain synchronization: fork choice, unwind and the three-phase commit.
//!
//! The [`ChainSyncConsumer`] is the last, stateful stage of the block
//! pipeline. For every candidate block range it decides whether the range
//! should replace the suffix of the canonical chain (strictly higher
//! cumulative score, or a finality-advancement override) and, if so, applies
//! the replacement across block storage, the canonical state cache and the
//! downstream notification hooks with a crash-recoverable three-step commit.

mod config;
mod consumer;
mod difficulty;
mod hooks;
mod linkage;
mod state;

/// Linked, difficulty-consistent chain construction for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::SyncConfig;
pub use consumer::ChainSyncConsumer;
pub use difficulty::DifficultyCalculator;
pub use hooks::{SyncHooks, SyncHooksBuilder, TransactionsChangeInfo, UndoBlockKind};
pub use linkage::{block_score, is_link, partial_chain_score};
pub use state::SyncState;
