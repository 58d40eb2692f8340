use crate::{ConsumerInput, ConsumerResult};
use palisade_interfaces::error::Severity;
use palisade_primitives::{InputSource, PeerId};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::warn;

/// Runs after every batch with the batch's final result.
///
/// The inspector is where per-batch side effects live: counters, peer
/// reputation, notification of failed-transaction sinks. It is invoked
/// exactly once per batch regardless of outcome.
pub trait Inspector<T>: Send {
    /// Inspect a finished batch.
    fn inspect(&mut self, input: &ConsumerInput<T>, result: &ConsumerResult);
}

/// An inspector that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInspector;

impl<T> Inspector<T> for NoopInspector {
    fn inspect(&mut self, _input: &ConsumerInput<T>, _result: &ConsumerResult) {}
}

#[derive(Debug, Default, Clone, Copy)]
struct PeerStats {
    failures: u32,
    banned: bool,
}

/// Shared, lock-protected per-peer reputation counters.
///
/// Created by the hosting process before the first batch is dispatched and
/// torn down after the worker stops; dispatchers never own it exclusively.
#[derive(Debug, Default)]
pub struct ReputationStore {
    peers: Mutex<HashMap<PeerId, PeerStats>>,
}

impl ReputationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of recorded validation failures for a peer.
    pub fn failures(&self, peer: PeerId) -> u32 {
        self.peers.lock().get(&peer).map(|stats| stats.failures).unwrap_or_default()
    }

    /// Returns `true` if the peer has been banned.
    pub fn is_banned(&self, peer: PeerId) -> bool {
        self.peers.lock().get(&peer).map(|stats| stats.banned).unwrap_or_default()
    }

    fn record_failure(&self, peer: PeerId, ban_threshold: u32) -> bool {
        let mut peers = self.peers.lock();
        let stats = peers.entry(peer).or_default();
        stats.failures += 1;
        if stats.failures >= ban_threshold {
            stats.banned = true;
        }
        stats.banned
    }

    fn ban(&self, peer: PeerId) {
        self.peers.lock().entry(peer).or_default().banned = true;
    }
}

/// An inspector that feeds batch outcomes into a [`ReputationStore`].
///
/// `Failure` rejections count toward a ban threshold, `Fatal` rejections ban
/// immediately, `Neutral` rejections and successful batches leave the peer's
/// reputation untouched. Locally produced batches are never penalized.
#[derive(Debug)]
pub struct ReputationInspector {
    store: std::sync::Arc<ReputationStore>,
    ban_threshold: u32,
}

impl ReputationInspector {
    /// Create an inspector over the given shared store.
    pub fn new(store: std::sync::Arc<ReputationStore>, ban_threshold: u32) -> Self {
        Self { store, ban_threshold: ban_threshold.max(1) }
    }
}

impl<T> Inspector<T> for ReputationInspector {
    fn inspect(&mut self, input: &ConsumerInput<T>, result: &ConsumerResult) {
        if input.source() == InputSource::Local {
            return
        }
        match result.severity() {
            None | Some(Severity::Neutral) => {}
            Some(Severity::Failure) => {
                if self.store.record_failure(input.peer(), self.ban_threshold) {
                    warn!(target: "sync::pipeline", peer = %input.peer(), "Peer exceeded failure threshold, banning");
                }
            }
            Some(Severity::Fatal) => {
                self.store.ban(input.peer());
                warn!(target: "sync::pipeline", peer = %input.peer(), "Peer supplied fatal input, banning");
            }
        }
    }
}
