//! Weighted Route53 record set target.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use rebalancer_core::{AwsAuth, Rebalance, SecretKeySelector};
use rebalancer_state::RecordSet;
use rebalancer_strategy::{
    RebalanceError, RebalanceResult, TargetClient, TargetSource,
};

use crate::record_sets::{
    CredentialRefs, DEFAULT_MAX_ITEMS, ListStart, RecordSetApi, SecretKeyRef, ZoneRef,
};

/// Factory registered under the `route53` discriminant.
pub struct Route53Source {
    api: Arc<dyn RecordSetApi>,
}

impl Route53Source {
    pub fn new(api: Arc<dyn RecordSetApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl TargetSource for Route53Source {
    async fn new_client(&self, resource: &Rebalance) -> RebalanceResult<Arc<dyn TargetClient>> {
        let key = resource.key();
        let spec = resource.spec.target.route53.as_ref().ok_or_else(|| {
            RebalanceError::Config(format!("{key}: route53 target is not set"))
        })?;

        if spec.region.trim().is_empty() {
            return Err(RebalanceError::Config(format!(
                "{key}: route53 target requires region"
            )));
        }
        if spec.hosted_zone_id.trim().is_empty() {
            return Err(RebalanceError::Config(format!(
                "{key}: route53 target requires hostedZoneID"
            )));
        }
        if spec.resource.name.trim().is_empty() {
            return Err(RebalanceError::Config(format!(
                "{key}: route53 target requires resource.name"
            )));
        }

        let credentials = credential_refs(&spec.auth, &resource.metadata.namespace)
            .map_err(|e| RebalanceError::Config(format!("{key}: route53 auth: {e}")))?;

        Ok(Arc::new(Route53Client {
            api: Arc::clone(&self.api),
            hosted_zone_id: spec.hosted_zone_id.clone(),
            region: spec.region.clone(),
            credentials,
            start: ListStart {
                name: spec.resource.name.clone(),
                record_type: spec.resource.record_type.clone(),
                identifier: spec.resource.identifier.clone(),
            },
        }))
    }
}

/// Resolve `auth.secretRef`, defaulting each namespace to the resource's.
fn credential_refs(auth: &AwsAuth, namespace: &str) -> Result<Option<CredentialRefs>, String> {
    let Some(secret) = &auth.secret_ref else {
        return Ok(None);
    };

    let resolve = |field: &str, sel: &SecretKeySelector| {
        if sel.name.trim().is_empty() || sel.key.trim().is_empty() {
            return Err(format!("{field} needs a secret name and key"));
        }
        Ok(SecretKeyRef {
            namespace: sel
                .namespace
                .clone()
                .filter(|ns| !ns.is_empty())
                .unwrap_or_else(|| namespace.to_string()),
            name: sel.name.clone(),
            key: sel.key.clone(),
        })
    };

    Ok(Some(CredentialRefs {
        access_key_id: resolve("accessKeyIDSecretRef", &secret.access_key_id)?,
        secret_access_key: resolve("secretAccessKeySecretRef", &secret.secret_access_key)?,
    }))
}

/// One weighted record: zone + name + type + set identifier.
pub struct Route53Client {
    api: Arc<dyn RecordSetApi>,
    hosted_zone_id: String,
    region: String,
    credentials: Option<CredentialRefs>,
    start: ListStart,
}

impl Route53Client {
    fn zone(&self) -> ZoneRef<'_> {
        ZoneRef {
            zone_id: &self.hosted_zone_id,
            region: &self.region,
            credentials: self.credentials.as_ref(),
        }
    }

    /// Record names come back fully qualified.
    fn fqdn(&self) -> String {
        let name = self.start.name.trim();
        if name.ends_with('.') {
            name.to_string()
        } else {
            format!("{name}.")
        }
    }

    async fn find_record(&self) -> RebalanceResult<RecordSet> {
        let start = ListStart {
            name: self.fqdn(),
            ..self.start.clone()
        };
        let records = self
            .api
            .list_record_sets(self.zone(), &start, DEFAULT_MAX_ITEMS)
            .await?;

        records
            .into_iter()
            .find(|r| r.name == start.name && r.set_identifier == start.identifier)
            .ok_or_else(|| {
                RebalanceError::Retrieval(format!(
                    "record {} ({}) not found in zone {}",
                    start.name, start.identifier, self.hosted_zone_id
                ))
            })
    }
}

#[async_trait]
impl TargetClient for Route53Client {
    async fn get_weight(&self) -> RebalanceResult<i64> {
        let record = self.find_record().await?;
        record.weight.ok_or_else(|| {
            RebalanceError::Retrieval(format!(
                "record {} ({}) is not weighted",
                record.name, record.set_identifier
            ))
        })
    }

    async fn set_weight(&self, value: i64) -> RebalanceResult<()> {
        let mut record = self.find_record().await?;
        let previous = record.weight;
        record.weight = Some(value);

        self.api.upsert_record_set(self.zone(), record).await?;

        info!(
            zone = %self.hosted_zone_id,
            region = %self.region,
            name = %self.start.name,
            identifier = %self.start.identifier,
            ?previous,
            weight = value,
            "record weight updated"
        );
        Ok(())
    }
}
