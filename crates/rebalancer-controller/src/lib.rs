//! rebalancer-controller — drives every `Rebalance` toward its desired weight.
//!
//! # Architecture
//!
//! ```text
//! trigger (API change, startup, requeue)
//!        │
//!        ▼
//!   WorkQueue ──dedup / dirty / delayed add / backoff──┐
//!        │                                             │
//!        ▼  N workers, one pass per key at a time      │
//!   Reconciler::reconcile(key)  ── deadline ──▶ Action ┘
//!        │
//!        ├── Registries: metrics / target / policy
//!        ├── StateStore: read resource, write status on change
//!        └── Gauges:     per-resource flags and values
//! ```
//!
//! A pass either completes and schedules the next one after the resource's
//! `interval`, or fails and is retried with per-key exponential backoff.

pub mod condition;
pub mod controller;
pub mod error;
pub mod gauges;
pub mod queue;
pub mod reconcile;

#[cfg(test)]
mod fakes;

pub use condition::health_condition;
pub use controller::{Controller, ControllerSettings};
pub use error::{ControllerError, ControllerResult};
pub use gauges::{GaugeSet, Gauges};
pub use queue::WorkQueue;
pub use reconcile::{Action, Reconciler};
