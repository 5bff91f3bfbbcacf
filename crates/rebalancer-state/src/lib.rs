//! rebalancer-state — embedded state store for the rebalancer.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and in-memory
//! storage for `Rebalance` resources and for the local record sets used when
//! the daemon runs without a cloud DNS provider.
//!
//! # Architecture
//!
//! All values are JSON-serialized into redb's `&[u8]` value columns.
//! Resources are keyed `{namespace}/{name}`, record sets
//! `{zone}/{name}/{type}/{set_identifier}`, so a zone's records come back
//! from a prefix scan in lexical order.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
