//! redb table definitions for the rebalancer state store.

use redb::TableDefinition;

/// `Rebalance` resources keyed by `{namespace}/{name}`.
pub const REBALANCES: TableDefinition<&str, &[u8]> = TableDefinition::new("rebalances");

/// Local record sets keyed by `{zone}/{name}/{type}/{set_identifier}`.
pub const RECORD_SETS: TableDefinition<&str, &[u8]> = TableDefinition::new("record_sets");
