use crate::ConsumerInput;
use async_trait::async_trait;
use palisade_interfaces::error::{ConsumeError, Severity};

/// The result of applying one consumer to a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerResult {
    /// Proceed to the next consumer in the chain.
    Continue,
    /// The batch was fully consumed; skip the remaining consumers.
    Complete,
    /// Stop processing the batch and surface the rejection.
    Abort(ConsumeError),
}

impl ConsumerResult {
    /// How the result reflects on the batch's source, if it was rejected.
    pub const fn severity(&self) -> Option<Severity> {
        match self {
            Self::Continue | Self::Complete => None,
            Self::Abort(err) => Some(err.severity()),
        }
    }

    /// Returns `true` if the batch was rejected.
    pub const fn is_abort(&self) -> bool {
        matches!(self, Self::Abort(_))
    }
}

/// A single stage of a batch pipeline.
///
/// Consumers are applied to every batch in registration order; returning
/// anything other than [`ConsumerResult::Continue`] ends the batch's journey.
/// A consumer only ever sees one batch at a time, so it may keep mutable
/// state across batches without synchronization.
#[async_trait]
pub trait Consumer<T>: Send {
    /// The name of the consumer, for logging and metrics.
    fn name(&self) -> &'static str;

    /// Apply the consumer to a batch.
    async fn consume(&mut self, input: &mut ConsumerInput<T>) -> ConsumerResult;
}
