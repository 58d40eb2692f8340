use crate::{
    Consumer, ConsumerInput, ConsumerResult, DispatcherConfig, FullnessPolicy, Inspector,
    NoopInspector,
};
use metrics::counter;
use palisade_interfaces::error::ConsumeError;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

/// An error raised at batch submission.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The pipeline queue is full and the dispatcher is configured to
    /// reject rather than block.
    #[error("pipeline queue is full")]
    QueueFull,
    /// The worker task has shut down.
    #[error("pipeline is closed")]
    Closed,
}

struct Job<T> {
    input: ConsumerInput<T>,
    drain: Option<oneshot::Sender<ConsumerResult>>,
}

/// Builder for a [`BatchDispatcher`].
pub struct DispatcherBuilder<T> {
    name: &'static str,
    config: DispatcherConfig,
    consumers: Vec<Box<dyn Consumer<T>>>,
    inspector: Box<dyn Inspector<T>>,
}

impl<T: Send + 'static> DispatcherBuilder<T> {
    /// Start building a dispatcher with the given pipeline name.
    pub fn new(name: &'static str, config: DispatcherConfig) -> Self {
        Self { name, config, consumers: Vec::new(), inspector: Box::new(NoopInspector) }
    }

    /// Append a consumer. Consumers run in registration order.
    pub fn with_consumer(mut self, consumer: impl Consumer<T> + 'static) -> Self {
        self.consumers.push(Box::new(consumer));
        self
    }

    /// Set the inspector invoked once per batch with the final result.
    pub fn with_inspector(mut self, inspector: impl Inspector<T> + 'static) -> Self {
        self.inspector = Box::new(inspector);
        self
    }

    /// Spawn the worker task and return the dispatcher handle.
    pub fn build(self) -> BatchDispatcher<T> {
        let Self { name, config, consumers, inspector } = self;
        let (to_worker, from_dispatcher) = mpsc::channel(config.queue_capacity.max(1));
        let worker = tokio::spawn(run_worker(name, from_dispatcher, consumers, inspector));
        BatchDispatcher {
            name,
            to_worker,
            next_id: AtomicU64::new(1),
            policy: config.fullness_policy,
            worker,
        }
    }
}

/// Owns one pipeline: a bounded queue of batches and the single worker task
/// draining it.
///
/// Batches are processed strictly in submission order. A batch cannot be
/// cancelled once dispatched; the only cancellation-like mechanism is a
/// consumer returning [`ConsumerResult::Abort`], which ends that batch's
/// journey without affecting any other batch or the worker itself.
pub struct BatchDispatcher<T> {
    name: &'static str,
    to_worker: mpsc::Sender<Job<T>>,
    next_id: AtomicU64,
    policy: FullnessPolicy,
    worker: tokio::task::JoinHandle<()>,
}

impl<T: Send + 'static> BatchDispatcher<T> {
    /// The name of the pipeline.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Submit a batch for processing and return its assigned id.
    ///
    /// Depending on the configured [`FullnessPolicy`] a full queue either
    /// blocks the submitter or fails with [`DispatchError::QueueFull`].
    pub async fn dispatch(&self, input: ConsumerInput<T>) -> Result<u64, DispatchError> {
        self.submit(input, None).await
    }

    /// Submit a batch and await its final result.
    ///
    /// The wait is per batch; it does not block other submitters, which may
    /// continue to enqueue behind this batch.
    pub async fn dispatch_and_wait(
        &self,
        input: ConsumerInput<T>,
    ) -> Result<ConsumerResult, DispatchError> {
        let (tx, rx) = oneshot::channel();
        self.submit(input, Some(tx)).await?;
        rx.await.map_err(|_| DispatchError::Closed)
    }

    async fn submit(
        &self,
        mut input: ConsumerInput<T>,
        drain: Option<oneshot::Sender<ConsumerResult>>,
    ) -> Result<u64, DispatchError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        input.assign_id(id);

        let job = Job { input, drain };
        match self.policy {
            FullnessPolicy::Block => {
                self.to_worker.send(job).await.map_err(|_| DispatchError::Closed)?
            }
            FullnessPolicy::Reject => self.to_worker.try_send(job).map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => {
                    counter!("sync.pipeline.rejected", "pipeline" => self.name).increment(1);
                    DispatchError::QueueFull
                }
                mpsc::error::TrySendError::Closed(_) => DispatchError::Closed,
            })?,
        }
        // Counted only once the batch is actually queued.
        counter!("sync.pipeline.dispatched", "pipeline" => self.name).increment(1);
        Ok(id)
    }

    /// Stop accepting batches and wait for the queue to drain.
    pub async fn close(self) {
        drop(self.to_worker);
        let _ = self.worker.await;
    }
}

async fn run_worker<T>(
    name: &'static str,
    mut jobs: mpsc::Receiver<Job<T>>,
    mut consumers: Vec<Box<dyn Consumer<T>>>,
    mut inspector: Box<dyn Inspector<T>>,
) {
    while let Some(Job { mut input, drain }) = jobs.recv().await {
        let result = process_batch(name, &mut consumers, &mut input).await;

        match &result {
            ConsumerResult::Abort(err) => {
                counter!("sync.pipeline.aborted", "pipeline" => name).increment(1);
                debug!(target: "sync::pipeline", pipeline = name, id = input.id(), %err, "Batch aborted");
            }
            _ => {
                counter!("sync.pipeline.consumed", "pipeline" => name).increment(1);
            }
        }

        // The inspector runs exactly once per batch, even on abort, so that
        // counters and reputation bookkeeping never go missing.
        inspector.inspect(&input, &result);

        if let Some(tx) = drain {
            let _ = tx.send(result);
        }
        // The batch and any elements still attached are reclaimed here.
    }
    debug!(target: "sync::pipeline", pipeline = name, "Worker stopped");
}

async fn process_batch<T>(
    name: &'static str,
    consumers: &mut [Box<dyn Consumer<T>>],
    input: &mut ConsumerInput<T>,
) -> ConsumerResult {
    if input.is_empty() {
        return ConsumerResult::Abort(ConsumeError::EmptyInput)
    }

    for consumer in consumers.iter_mut() {
        trace!(target: "sync::pipeline", pipeline = name, consumer = consumer.name(), id = input.id(), "Running consumer");
        match consumer.consume(input).await {
            ConsumerResult::Continue => {}
            terminal => {
                trace!(target: "sync::pipeline", pipeline = name, consumer = consumer.name(), id = input.id(), "Consumer terminated batch");
                return terminal
            }
        }
    }
    ConsumerResult::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use palisade_interfaces::error::Severity;
    use palisade_primitives::{InputSource, PeerId};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::sync::Notify;

    #[derive(Clone, Default)]
    struct Trace(Arc<Mutex<Vec<(&'static str, u64)>>>);

    struct TestConsumer {
        name: &'static str,
        trace: Trace,
        result: ConsumerResult,
        gate: Option<Arc<Notify>>,
    }

    impl TestConsumer {
        fn passing(name: &'static str, trace: Trace) -> Self {
            Self { name, trace, result: ConsumerResult::Continue, gate: None }
        }
    }

    #[async_trait]
    impl Consumer<u32> for TestConsumer {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn consume(&mut self, input: &mut ConsumerInput<u32>) -> ConsumerResult {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.trace.0.lock().push((self.name, input.id()));
            self.result.clone()
        }
    }

    struct RecordingInspector {
        results: Arc<Mutex<Vec<(u64, ConsumerResult)>>>,
    }

    impl Inspector<u32> for RecordingInspector {
        fn inspect(&mut self, input: &ConsumerInput<u32>, result: &ConsumerResult) {
            self.results.lock().push((input.id(), result.clone()));
        }
    }

    fn batch(elements: Vec<u32>) -> ConsumerInput<u32> {
        ConsumerInput::new(InputSource::RemotePush, PeerId::repeat_byte(1), elements)
    }

    #[tokio::test]
    async fn consumers_run_in_registration_order() {
        let trace = Trace::default();
        let dispatcher = DispatcherBuilder::new("test", DispatcherConfig::default())
            .with_consumer(TestConsumer::passing("a", trace.clone()))
            .with_consumer(TestConsumer::passing("b", trace.clone()))
            .build();

        let result = dispatcher.dispatch_and_wait(batch(vec![1])).await.unwrap();
        assert_eq!(result, ConsumerResult::Continue);
        assert_eq!(*trace.0.lock(), vec![("a", 1), ("b", 1)]);
        dispatcher.close().await;
    }

    #[tokio::test]
    async fn batches_process_in_submission_order() {
        let trace = Trace::default();
        let dispatcher = DispatcherBuilder::new("test", DispatcherConfig::default())
            .with_consumer(TestConsumer::passing("a", trace.clone()))
            .build();

        dispatcher.dispatch(batch(vec![1])).await.unwrap();
        dispatcher.dispatch(batch(vec![2])).await.unwrap();
        let result = dispatcher.dispatch_and_wait(batch(vec![3])).await.unwrap();

        assert_eq!(result, ConsumerResult::Continue);
        assert_eq!(*trace.0.lock(), vec![("a", 1), ("a", 2), ("a", 3)]);
        dispatcher.close().await;
    }

    #[tokio::test]
    async fn abort_short_circuits_but_inspector_still_runs() {
        let trace = Trace::default();
        let results = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = DispatcherBuilder::new("test", DispatcherConfig::default())
            .with_consumer(TestConsumer {
                name: "rejects",
                trace: trace.clone(),
                result: ConsumerResult::Abort(ConsumeError::Unlinked),
                gate: None,
            })
            .with_consumer(TestConsumer::passing("unreached", trace.clone()))
            .with_inspector(RecordingInspector { results: results.clone() })
            .build();

        let result = dispatcher.dispatch_and_wait(batch(vec![1])).await.unwrap();
        assert_eq!(result, ConsumerResult::Abort(ConsumeError::Unlinked));
        assert_eq!(result.severity(), Some(Severity::Failure));
        assert_eq!(*trace.0.lock(), vec![("rejects", 1)]);
        assert_eq!(*results.lock(), vec![(1, ConsumerResult::Abort(ConsumeError::Unlinked))]);
        dispatcher.close().await;
    }

    #[tokio::test]
    async fn empty_batch_is_rejected_without_running_consumers() {
        let trace = Trace::default();
        let results = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = DispatcherBuilder::new("test", DispatcherConfig::default())
            .with_consumer(TestConsumer::passing("unreached", trace.clone()))
            .with_inspector(RecordingInspector { results: results.clone() })
            .build();

        let result = dispatcher.dispatch_and_wait(batch(vec![])).await.unwrap();
        assert_eq!(result, ConsumerResult::Abort(ConsumeError::EmptyInput));
        assert!(trace.0.lock().is_empty());
        assert_eq!(results.lock().len(), 1);
        dispatcher.close().await;
    }

    #[tokio::test]
    async fn reject_policy_signals_overflow() {
        let gate = Arc::new(Notify::new());
        let trace = Trace::default();
        let config =
            DispatcherConfig { queue_capacity: 1, fullness_policy: FullnessPolicy::Reject };
        let dispatcher = DispatcherBuilder::new("test", config)
            .with_consumer(TestConsumer {
                name: "gated",
                trace: trace.clone(),
                result: ConsumerResult::Continue,
                gate: Some(gate.clone()),
            })
            .build();

        // First batch occupies the worker, second fills the queue.
        dispatcher.dispatch(batch(vec![1])).await.unwrap();
        tokio::task::yield_now().await;
        dispatcher.dispatch(batch(vec![2])).await.unwrap();

        assert_matches!(
            dispatcher.dispatch(batch(vec![3])).await,
            Err(DispatchError::QueueFull)
        );

        gate.notify_one();
        gate.notify_one();
        dispatcher.close().await;
    }

    #[test]
    fn full_queue_rejection_is_not_counted_as_dispatched() {
        let recorder = metrics_util::debugging::DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let gate = Arc::new(Notify::new());
                let trace = Trace::default();
                let config = DispatcherConfig {
                    queue_capacity: 1,
                    fullness_policy: FullnessPolicy::Reject,
                };
                let dispatcher = DispatcherBuilder::new("test", config)
                    .with_consumer(TestConsumer {
                        name: "gated",
                        trace: trace.clone(),
                        result: ConsumerResult::Continue,
                        gate: Some(gate.clone()),
                    })
                    .build();

                dispatcher.dispatch(batch(vec![1])).await.unwrap();
                tokio::task::yield_now().await;
                dispatcher.dispatch(batch(vec![2])).await.unwrap();
                assert_matches!(
                    dispatcher.dispatch(batch(vec![3])).await,
                    Err(DispatchError::QueueFull)
                );

                gate.notify_one();
                gate.notify_one();
                dispatcher.close().await;
            });
        });

        let counters: std::collections::HashMap<String, u64> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter_map(|(key, _, _, value)| match value {
                metrics_util::debugging::DebugValue::Counter(count) => {
                    Some((key.key().name().to_string(), count))
                }
                _ => None,
            })
            .collect();

        assert_eq!(counters.get("sync.pipeline.dispatched"), Some(&2));
        assert_eq!(counters.get("sync.pipeline.rejected"), Some(&1));
        assert_eq!(counters.get("sync.pipeline.consumed"), Some(&2));
    }
}
