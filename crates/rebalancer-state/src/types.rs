//! Persisted types owned by the state store.
//!
//! `Rebalance` itself lives in `rebalancer-core`; this module adds the
//! local record-set type backing the store-based DNS provider.

use serde::{Deserialize, Serialize};

pub use rebalancer_core::types::*;

/// A DNS record set held in the local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSet {
    /// Fully-qualified name, trailing dot included.
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub set_identifier: String,
    /// Routing weight; absent for non-weighted records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub values: Vec<String>,
}

impl RecordSet {
    /// Build the composite key for the record sets table.
    pub fn table_key(&self, zone: &str) -> String {
        format!(
            "{zone}/{}/{}/{}",
            self.name, self.record_type, self.set_identifier
        )
    }
}
