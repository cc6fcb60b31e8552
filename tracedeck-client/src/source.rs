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

//! Log sources
//!
//! A log source knows which logs exist and how to fetch one log's records.
//! Sources are pure transport: records come back in wire shape and are
//! normalized later, at the store boundary.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use tracedeck_core::CallRecord;

use crate::error::{ClientError, Result};

/// Where call-trace logs come from.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Names of the logs this source can serve.
    async fn available_logs(&self) -> Result<Vec<String>>;

    /// Fetch one log's records, in the order the backend returns them.
    async fn fetch_log(&self, name: &str) -> Result<Vec<CallRecord>>;
}

/// Local directory of log files: every `*.json` file is one log, named by
/// its file stem. Listing is sorted so the order is stable across platforms.
#[derive(Debug, Clone)]
pub struct DirLogSource {
    dir: PathBuf,
}

impl DirLogSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl LogSource for DirLogSource {
    async fn available_logs(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn fetch_log(&self, name: &str) -> Result<Vec<CallRecord>> {
        // Log names are file stems; anything path-like is not a log name.
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(ClientError::UnknownLog(name.to_string()));
        }

        let path = self.dir.join(format!("{name}.json"));
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ClientError::UnknownLog(name.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        let records: Vec<CallRecord> = serde_json::from_str(&raw)?;
        debug!(log = name, record_count = records.len(), "read log file");
        Ok(records)
    }
}
