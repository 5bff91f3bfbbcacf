//! rebalancer-target — the weighted resources a `Rebalance` steers.
//!
//! # Architecture
//!
//! ```text
//! Route53Source ──new_client──▶ Route53Client ──▶ dyn RecordSetApi
//!                                                   ├── StoreRecordSets (redb)
//!                                                   └── (cloud provider adapters)
//! ```
//!
//! `Route53Client` owns the record-selection rules (zone, trailing-dot name,
//! type, set identifier). Transport is behind `RecordSetApi`, so the daemon
//! can run against its own store and tests against an in-memory one. Every
//! call carries a `ZoneRef` with the region and, when `auth.secretRef` is
//! set, the secret keys holding the access key pair.

pub mod record_sets;
pub mod route53;

use std::sync::Arc;

use rebalancer_core::RebalanceTarget;
use rebalancer_strategy::Registries;

pub use record_sets::{
    CredentialRefs, DEFAULT_MAX_ITEMS, ListStart, RecordSetApi, SecretKeyRef, StoreRecordSets,
    ZoneRef,
};
pub use route53::{Route53Client, Route53Source};

/// Register every target this crate provides, backed by `api`.
pub fn register(registries: &Registries, api: Arc<dyn RecordSetApi>) {
    registries
        .targets
        .register(RebalanceTarget::ROUTE53, Arc::new(Route53Source::new(api)));
}
