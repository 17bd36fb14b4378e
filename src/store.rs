//! Log store access: the `LogStore` seam and the Loki HTTP client behind it.

use crate::config::StoreConfig;
use crate::query::LogQuery;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("log store unavailable: {0}")]
    Unavailable(String),
    #[error("log store did not answer within {}s", .0.as_secs_f64())]
    Timeout(Duration),
    #[error("log store returned HTTP {0}")]
    Status(u16),
    #[error("log store query failed with status '{0}'")]
    QueryFailed(String),
    #[error("could not decode log store response: {0}")]
    Decode(String),
}

/// One retrieved line. `timestamp` is kept as the store's token
/// (Loki sends epoch nanoseconds as a string).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: String,
    pub line: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl LogLine {
    pub fn new(timestamp: impl Into<String>, line: impl Into<String>) -> Self {
        Self { timestamp: timestamp.into(), line: line.into(), labels: BTreeMap::new() }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Decode the token as epoch nanoseconds or RFC 3339.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        if let Ok(ns) = self.timestamp.parse::<i64>() {
            return Some(Utc.timestamp_nanos(ns));
        }
        DateTime::parse_from_rfc3339(&self.timestamp).ok().map(|t| t.with_timezone(&Utc))
    }
}

/// Request/response facade over a time-indexed log store.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn query_range(&self, query: &LogQuery) -> Result<Vec<LogLine>, StoreError>;
}

#[async_trait]
impl<T: LogStore + ?Sized> LogStore for Arc<T> {
    async fn query_range(&self, query: &LogQuery) -> Result<Vec<LogLine>, StoreError> {
        (**self).query_range(query).await
    }
}

#[derive(Debug, Deserialize)]
struct QueryRangeResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryRangeData>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryRangeData {
    #[serde(default)]
    result: Vec<StreamResult>,
}

#[derive(Debug, Deserialize)]
struct StreamResult {
    #[serde(default)]
    stream: BTreeMap<String, String>,
    #[serde(default)]
    values: Vec<(String, String)>,
}

/// Flatten a `/loki/api/v1/query_range` body into lines, stream by stream.
pub fn decode_query_range(body: &[u8]) -> Result<Vec<LogLine>, StoreError> {
    let resp: QueryRangeResponse =
        serde_json::from_slice(body).map_err(|e| StoreError::Decode(e.to_string()))?;
    if resp.status != "success" {
        return Err(StoreError::QueryFailed(resp.status));
    }
    let mut out = Vec::new();
    for stream in resp.data.unwrap_or_default().result {
        for (timestamp, line) in stream.values {
            out.push(LogLine { timestamp, line, labels: stream.stream.clone() });
        }
    }
    Ok(out)
}

pub struct LokiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl LokiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self::with_client(http, base_url, timeout))
    }

    /// Use a preconfigured HTTP client. `timeout` is only used for error reporting;
    /// the client's own timeout bounds the request.
    pub fn with_client(http: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string(), timeout }
    }

    pub fn from_config(cfg: &StoreConfig) -> Result<Self, StoreError> {
        Self::new(&cfg.url, cfg.timeout())
    }

    fn endpoint(&self) -> String {
        format!("{}/loki/api/v1/query_range", self.base_url)
    }

    fn transport_error(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout(self.timeout)
        } else {
            StoreError::Unavailable(e.to_string())
        }
    }
}

#[async_trait]
impl LogStore for LokiClient {
    async fn query_range(&self, query: &LogQuery) -> Result<Vec<LogLine>, StoreError> {
        let logql = query.logql();
        let start = query.window.start_rfc3339();
        let end = query.window.end_rfc3339();
        let limit = query.limit.to_string();
        tracing::info!(query = %logql, %start, %end, "querying loki");

        let resp = self
            .http
            .get(self.endpoint())
            .query(&[
                ("query", logql.as_str()),
                ("start", start.as_str()),
                ("end", end.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "loki rejected query");
            return Err(StoreError::Status(status.as_u16()));
        }
        let body = resp.bytes().await.map_err(|e| self.transport_error(e))?;
        let lines = decode_query_range(&body)?;
        tracing::info!(count = lines.len(), "retrieved log entries from loki");
        Ok(lines)
    }
}
