use serde::{Deserialize, Serialize};

/// What `dispatch` does when the pipeline queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FullnessPolicy {
    /// Block the submitter until queue space frees up.
    #[default]
    Block,
    /// Reject the submission with [`DispatchError::QueueFull`](crate::DispatchError::QueueFull).
    Reject,
}

/// Configuration for a [`BatchDispatcher`](crate::BatchDispatcher).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// The maximum number of batches queued for the worker.
    pub queue_capacity: usize,
    /// What to do when the queue is full.
    pub fullness_policy: FullnessPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { queue_capacity: 64, fullness_policy: FullnessPolicy::Block }
    }
}
