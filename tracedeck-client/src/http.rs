// Copyright 2025 Tracedeck Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP log backend client
//!
//! Talks to the local log backend: `/get_available_logs` and `/get_log` for
//! fetching, `/evaluate` for scoring records, `/metrics` for backend
//! counters. Every request is a single attempt; non-success statuses map to
//! [`ClientError::Api`] with the response body as the message.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use tracedeck_core::CallRecord;

use crate::error::{ClientError, Result};
use crate::source::LogSource;

/// Default backend address, where the bundled log server listens.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Backend connection settings.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the log backend.
    pub base_url: String,
    /// Request timeout (default: 30 seconds).
    pub timeout: Duration,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Score returned by the backend for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalOutcome {
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// A record merged with the evaluation outcome the backend returned for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    pub record: CallRecord,
    pub outcome: EvalOutcome,
}

/// Client for the HTTP log backend.
pub struct HttpLogSource {
    config: BackendConfig,
    http: Client,
}

impl HttpLogSource {
    pub fn new(config: BackendConfig) -> Self {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, http }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: Option<&[(&str, &str)]>,
    ) -> Result<T> {
        let mut request = self.http.get(self.url(path));
        if let Some(params) = params {
            request = request.query(params);
        }
        Self::decode(request.send().await?).await
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let request = self.http.post(self.url(path)).json(body);
        Self::decode(request.send().await?).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }

    /// Score one record via the backend's `/evaluate` endpoint.
    pub async fn evaluate(&self, record: &CallRecord) -> Result<EvalOutcome> {
        self.post("/evaluate", &json!({ "record": record })).await
    }

    /// Score records one at a time, merging each outcome with its record.
    /// Requests are sequential single attempts; the first failure aborts.
    pub async fn evaluate_many(&self, records: &[CallRecord]) -> Result<Vec<ScoredRecord>> {
        let mut scored = Vec::with_capacity(records.len());
        for record in records {
            let outcome = self.evaluate(record).await?;
            scored.push(ScoredRecord {
                record: record.clone(),
                outcome,
            });
        }
        debug!(record_count = scored.len(), "evaluated records");
        Ok(scored)
    }

    /// Backend counters, passed through untyped.
    pub async fn metrics(&self) -> Result<serde_json::Value> {
        self.get("/metrics", None).await
    }
}

#[async_trait]
impl LogSource for HttpLogSource {
    async fn available_logs(&self) -> Result<Vec<String>> {
        self.get("/get_available_logs", None).await
    }

    async fn fetch_log(&self, name: &str) -> Result<Vec<CallRecord>> {
        let records: Vec<CallRecord> = self.get("/get_log", Some(&[("name", name)])).await?;
        debug!(log = name, record_count = records.len(), "fetched log");
        Ok(records)
    }
}
