//! rebalancer-core — shared types for the rebalancer workspace.
//!
//! Holds the `Rebalance` resource schema (spec, strategy unions, status),
//! the "exactly one of" check used to pick a strategy out of a union,
//! duration parsing for `interval` strings, and the daemon's
//! `rebalancer.toml` configuration.

pub mod config;
pub mod duration;
pub mod types;
pub mod union;

pub use config::RebalancerConfig;
pub use duration::{DurationError, parse_interval};
pub use types::*;
pub use union::{Union, UnionError};
