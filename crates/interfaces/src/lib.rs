//! Traits and error types at the seams of the palisade node.
//!
//! The batch pipeline, the block store and the chain-synchronization
//! consumer are wired together through the types in this crate so that each
//! side can be exercised against a mock of the other.

/// The error taxonomy shared by the pipeline and its consumers.
pub mod error;

/// Block storage provider traits.
pub mod provider;

/// Random value generators for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
