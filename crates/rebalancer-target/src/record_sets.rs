//! Record-set API contract and the store-backed implementation.

use async_trait::async_trait;
use tracing::debug;

use rebalancer_state::{RecordSet, StateStore};
use rebalancer_strategy::{RebalanceError, RebalanceResult};

/// Page size used when a caller does not need more.
pub const DEFAULT_MAX_ITEMS: usize = 100;

/// Position in a zone's record listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListStart {
    pub name: String,
    pub record_type: String,
    pub identifier: String,
}

/// A key inside a named secret, with its namespace already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretKeyRef {
    pub namespace: String,
    pub name: String,
    pub key: String,
}

/// Where a transport reads the static access key pair from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRefs {
    pub access_key_id: SecretKeyRef,
    pub secret_access_key: SecretKeyRef,
}

/// Which hosted zone a call addresses, and as whom.
#[derive(Debug, Clone, Copy)]
pub struct ZoneRef<'a> {
    pub zone_id: &'a str,
    pub region: &'a str,
    /// `None` means the transport's ambient credentials.
    pub credentials: Option<&'a CredentialRefs>,
}

/// Read and write weighted record sets of a hosted zone.
#[async_trait]
pub trait RecordSetApi: Send + Sync {
    /// Records of the zone ordered by (name, type, identifier), starting at
    /// `start` inclusive, at most `max_items` of them.
    async fn list_record_sets(
        &self,
        zone: ZoneRef<'_>,
        start: &ListStart,
        max_items: usize,
    ) -> RebalanceResult<Vec<RecordSet>>;

    /// Create or replace a record set.
    async fn upsert_record_set(&self, zone: ZoneRef<'_>, record: RecordSet) -> RebalanceResult<()>;
}

/// `RecordSetApi` over the local state store.
///
/// Zones are local, so region and credentials are not consulted.
#[derive(Clone)]
pub struct StoreRecordSets {
    store: StateStore,
}

impl StoreRecordSets {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RecordSetApi for StoreRecordSets {
    async fn list_record_sets(
        &self,
        zone: ZoneRef<'_>,
        start: &ListStart,
        max_items: usize,
    ) -> RebalanceResult<Vec<RecordSet>> {
        let records = self
            .store
            .list_record_sets(zone.zone_id)
            .map_err(|e| RebalanceError::Retrieval(format!("list record sets: {e}")))?;

        let from = (
            start.name.as_str(),
            start.record_type.as_str(),
            start.identifier.as_str(),
        );
        let page: Vec<RecordSet> = records
            .into_iter()
            .filter(|r| {
                (
                    r.name.as_str(),
                    r.record_type.as_str(),
                    r.set_identifier.as_str(),
                ) >= from
            })
            .take(max_items)
            .collect();

        debug!(zone = %zone.zone_id, start = %start.name, count = page.len(), "record sets listed");
        Ok(page)
    }

    async fn upsert_record_set(
        &self,
        zone: ZoneRef<'_>,
        record: RecordSet,
    ) -> RebalanceResult<()> {
        self.store
            .put_record_set(zone.zone_id, &record)
            .map_err(|e| RebalanceError::Convergence(format!("upsert record set: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, id: &str, weight: i64) -> RecordSet {
        RecordSet {
            name: name.to_string(),
            record_type: "A".to_string(),
            set_identifier: id.to_string(),
            weight: Some(weight),
            ttl: Some(60),
            values: vec!["192.0.2.1".to_string()],
        }
    }

    fn zone(zone_id: &str) -> ZoneRef<'_> {
        ZoneRef {
            zone_id,
            region: "us-east-1",
            credentials: None,
        }
    }

    fn start(name: &str, id: &str) -> ListStart {
        ListStart {
            name: name.to_string(),
            record_type: "A".to_string(),
            identifier: id.to_string(),
        }
    }

    #[tokio::test]
    async fn list_starts_at_position() {
        let api = StoreRecordSets::new(StateStore::open_in_memory().unwrap());
        for r in [
            record("a.example.com.", "x", 1),
            record("www.example.com.", "blue", 2),
            record("www.example.com.", "green", 3),
        ] {
            api.upsert_record_set(zone("Z1"), r).await.unwrap();
        }

        let page = api
            .list_record_sets(zone("Z1"), &start("www.example.com.", "blue"), DEFAULT_MAX_ITEMS)
            .await
            .unwrap();
        let ids: Vec<_> = page.iter().map(|r| r.set_identifier.as_str()).collect();
        assert_eq!(ids, vec!["blue", "green"]);

        let one = api
            .list_record_sets(zone("Z1"), &ListStart::default(), 1)
            .await
            .unwrap();
        assert_eq!(one[0].name, "a.example.com.");
    }

    #[tokio::test]
    async fn zones_are_isolated() {
        let api = StoreRecordSets::new(StateStore::open_in_memory().unwrap());
        api.upsert_record_set(zone("Z1"), record("www.example.com.", "blue", 2))
            .await
            .unwrap();

        let other = api
            .list_record_sets(zone("Z2"), &ListStart::default(), DEFAULT_MAX_ITEMS)
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn upsert_replaces_weight() {
        let api = StoreRecordSets::new(StateStore::open_in_memory().unwrap());
        api.upsert_record_set(zone("Z1"), record("www.example.com.", "blue", 2))
            .await
            .unwrap();
        api.upsert_record_set(zone("Z1"), record("www.example.com.", "blue", 9))
            .await
            .unwrap();

        let all = api
            .list_record_sets(zone("Z1"), &ListStart::default(), DEFAULT_MAX_ITEMS)
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].weight, Some(9));
    }
}
