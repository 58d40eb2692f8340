//! Durable stores backing the chain-synchronization core.
//!
//! Three independent pieces participate in the three-phase commit: block
//! storage ([`MemoryBlockStore`]), the canonical state cache
//! ([`CanonicalCache`]) and the persisted commit-step checkpoint
//! ([`CommitStepFile`]) that makes a crash between phases recoverable.

mod block_store;
mod commit_step;
mod state;

pub use block_store::MemoryBlockStore;
pub use commit_step::{CommitOperationStep, CommitStepFile};
pub use state::{BlockStatistics, CacheChanges, CacheDelta, CanonicalCache};
