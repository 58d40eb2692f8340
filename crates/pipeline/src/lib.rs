//! Generic batch consumer pipeline.
//!
//! Every incoming block or transaction batch flows through an ordered chain
//! of [`Consumer`]s owned by a [`BatchDispatcher`]. The dispatcher owns one
//! bounded queue and one worker task; batches are processed strictly in
//! submission order, a batch's journey ends at the first non-`Continue`
//! result, and the [`Inspector`] runs exactly once per batch regardless of
//! outcome so that side-effect bookkeeping never goes missing.

mod audit;
mod config;
mod consumer;
mod dispatcher;
mod input;
mod inspector;

pub use audit::AuditConsumer;
pub use config::{DispatcherConfig, FullnessPolicy};
pub use consumer::{Consumer, ConsumerResult};
pub use dispatcher::{BatchDispatcher, DispatchError, DispatcherBuilder};
pub use input::ConsumerInput;
pub use inspector::{Inspector, NoopInspector, ReputationInspector, ReputationStore};
