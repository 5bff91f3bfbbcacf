//! Prometheus instant-query source.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http_body_util::BodyExt;
use serde::Deserialize;
use tracing::{debug, warn};

use rebalancer_core::{PrometheusMetrics, Rebalance};
use rebalancer_strategy::{
    MetricsClient, MetricsSource, RebalanceError, RebalanceResult,
};

use crate::condition::{self, QueryValue};

const QUERY_PATH: &str = "/api/v1/query";

/// Factory registered under the `prometheus` discriminant.
pub struct PrometheusSource;

#[async_trait]
impl MetricsSource for PrometheusSource {
    async fn new_client(&self, resource: &Rebalance) -> RebalanceResult<Arc<dyn MetricsClient>> {
        let spec = resource.spec.metrics.prometheus.as_ref().ok_or_else(|| {
            RebalanceError::Config(format!("{}: prometheus metrics are not set", resource.key()))
        })?;
        Ok(Arc::new(PrometheusClient::new(spec)?))
    }
}

/// Where to send queries: `host:port` plus an optional path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Endpoint {
    authority: String,
    connect_addr: String,
    base_path: String,
}

impl Endpoint {
    fn parse(address: &str) -> RebalanceResult<Self> {
        let invalid =
            |why: String| RebalanceError::Config(format!("prometheus address {address:?}: {why}"));

        let uri: http::Uri = address
            .trim()
            .parse()
            .map_err(|e: http::uri::InvalidUri| invalid(e.to_string()))?;

        match uri.scheme_str() {
            Some("http") => {}
            Some("https") => return Err(invalid("https is not supported".to_string())),
            Some(other) => return Err(invalid(format!("unsupported scheme {other:?}"))),
            None => return Err(invalid("missing scheme".to_string())),
        }

        let authority = uri
            .authority()
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let host = authority.host();
        if host.is_empty() {
            return Err(invalid("missing host".to_string()));
        }

        // `port_u16` hides a malformed port as `None`, so read the raw text.
        let host_port = authority.as_str().rsplit('@').next().unwrap_or_default();
        let port = match host_port.strip_prefix(host).and_then(|rest| rest.strip_prefix(':')) {
            None => 80,
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| invalid(format!("bad port {raw:?}")))?,
        };

        Ok(Self {
            authority: host_port.to_string(),
            connect_addr: format!("{host}:{port}"),
            base_path: uri.path().trim_end_matches('/').to_string(),
        })
    }

    fn query_uri(&self, query: &str, time: &str) -> String {
        format!(
            "http://{}{}{QUERY_PATH}?query={}&time={}",
            self.authority,
            self.base_path,
            encode_component(query),
            encode_component(time)
        )
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Issues one instant query per call.
pub struct PrometheusClient {
    endpoint: Endpoint,
    query: String,
    timeout: Duration,
}

impl PrometheusClient {
    pub fn new(spec: &PrometheusMetrics) -> RebalanceResult<Self> {
        if spec.timeout <= 0 {
            return Err(RebalanceError::Config(format!(
                "prometheus timeout must be positive, got {}",
                spec.timeout
            )));
        }
        if spec.query.trim().is_empty() {
            return Err(RebalanceError::Config("prometheus query is empty".to_string()));
        }

        Ok(Self {
            endpoint: Endpoint::parse(&spec.address)?,
            query: spec.query.clone(),
            timeout: Duration::from_secs(spec.timeout as u64),
        })
    }

    /// Run the query at the current instant.
    pub async fn query(&self) -> RebalanceResult<QueryValue> {
        let now = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
        let uri = self.endpoint.query_uri(&self.query, &format!("{now:.3}"));

        let body = tokio::time::timeout(self.timeout, self.get(&uri))
            .await
            .map_err(|_| {
                RebalanceError::Retrieval(format!(
                    "prometheus query timed out after {:?}",
                    self.timeout
                ))
            })??;

        let response: QueryResponse = serde_json::from_slice(&body).map_err(|e| {
            RebalanceError::Retrieval(format!("malformed prometheus response: {e}"))
        })?;

        for warning in &response.warnings {
            warn!(query = %self.query, %warning, "prometheus query warning");
        }

        let value = response.into_value()?;
        debug!(query = %self.query, ?value, "prometheus query");
        Ok(value)
    }

    async fn get(&self, uri: &str) -> RebalanceResult<bytes::Bytes> {
        let retrieval = |stage: &str, e: &dyn std::fmt::Display| {
            RebalanceError::Retrieval(format!("prometheus {stage} {uri}: {e}"))
        };

        let stream = tokio::net::TcpStream::connect(&self.endpoint.connect_addr)
            .await
            .map_err(|e| retrieval("connect", &e))?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| retrieval("handshake", &e))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = http::Request::builder()
            .method("GET")
            .uri(uri)
            .header("host", &self.endpoint.authority)
            .header("accept", "application/json")
            .header("user-agent", "rebalancer/0.1")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .map_err(|e| retrieval("request", &e))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| retrieval("request", &e))?;
        let status = resp.status();

        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| retrieval("read", &e))?
            .to_bytes();

        // Prometheus reports query errors as JSON with a 4xx/5xx status.
        if !status.is_success() {
            let detail = serde_json::from_slice::<QueryResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_default();
            return Err(RebalanceError::Retrieval(format!(
                "prometheus returned {status} for {uri}: {detail}"
            )));
        }

        Ok(body)
    }
}

#[async_trait]
impl MetricsClient for PrometheusClient {
    async fn fetch(&self) -> RebalanceResult<f64> {
        match self.query().await? {
            QueryValue::Scalar(v) => Ok(v),
            QueryValue::Vector(_) => Err(RebalanceError::Retrieval(format!(
                "query {:?} returned a vector, fetch requires a scalar",
                self.query
            ))),
        }
    }

    async fn evaluate(&self, expression: &str) -> RebalanceResult<bool> {
        let value = self.query().await?;
        condition::evaluate(expression, &value)
    }
}

// ── Wire format ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    result_type: String,
    result: serde_json::Value,
}

/// `[<unix time>, "<value>"]`
#[derive(Debug, Deserialize)]
struct SamplePair(serde_json::Value, String);

#[derive(Debug, Deserialize)]
struct VectorSample {
    value: SamplePair,
}

impl SamplePair {
    fn value(&self) -> RebalanceResult<f64> {
        self.1.parse::<f64>().map_err(|_| {
            RebalanceError::Retrieval(format!("sample value {:?} is not a number", self.1))
        })
    }
}

impl QueryResponse {
    fn into_value(self) -> RebalanceResult<QueryValue> {
        if self.status != "success" {
            return Err(RebalanceError::Retrieval(format!(
                "prometheus query failed ({}): {}",
                self.error_type.unwrap_or_default(),
                self.error.unwrap_or_default()
            )));
        }

        let data = self.data.ok_or_else(|| {
            RebalanceError::Retrieval("prometheus response has no data".to_string())
        })?;
        let malformed =
            |e: serde_json::Error| RebalanceError::Retrieval(format!("malformed result: {e}"));

        match data.result_type.as_str() {
            "scalar" => {
                let pair: SamplePair = serde_json::from_value(data.result).map_err(malformed)?;
                Ok(QueryValue::Scalar(pair.value()?))
            }
            "vector" => {
                let samples: Vec<VectorSample> =
                    serde_json::from_value(data.result).map_err(malformed)?;
                let values = samples
                    .iter()
                    .map(|s| s.value.value())
                    .collect::<RebalanceResult<Vec<_>>>()?;
                Ok(QueryValue::Vector(values))
            }
            other => Err(RebalanceError::Retrieval(format!(
                "unsupported result type {other:?}"
            ))),
        }
    }
}
