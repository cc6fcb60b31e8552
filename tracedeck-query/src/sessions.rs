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

//! Session grouping
//!
//! Partitions a flat record stream into session buckets. Records with an
//! explicit `sessionId` share a bucket; ungrouped records each become their
//! own singleton bucket under the `adhoc-` id convention. Buckets appear in
//! first-appearance order of the underlying records.

use std::collections::HashMap;

use serde::Serialize;
use tracedeck_core::{CallRecord, SessionKey};

use crate::stats::TokenTotals;

/// Aggregate view of one session bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    /// True for singleton buckets synthesized from ungrouped records.
    pub is_adhoc: bool,
    pub record_count: usize,
    /// Records with a canonical trace of at least two frames, i.e. the ones
    /// a call forest can be built from.
    pub traced_record_count: usize,
    pub first_timestamp: f64,
    pub last_timestamp: f64,
    pub tokens: TokenTotals,
    /// Distinct models observed, in first-appearance order.
    pub models: Vec<String>,
}

impl SessionSummary {
    fn start(key: &SessionKey, record: &CallRecord) -> Self {
        let mut summary = Self {
            id: key.id(),
            is_adhoc: key.is_adhoc(),
            record_count: 0,
            traced_record_count: 0,
            first_timestamp: record.timestamp,
            last_timestamp: record.timestamp,
            tokens: TokenTotals::default(),
            models: Vec::new(),
        };
        summary.absorb(record);
        summary
    }

    fn absorb(&mut self, record: &CallRecord) {
        self.record_count += 1;
        if record.has_full_trace() {
            self.traced_record_count += 1;
        }
        if record.timestamp < self.first_timestamp {
            self.first_timestamp = record.timestamp;
        }
        if record.timestamp > self.last_timestamp {
            self.last_timestamp = record.timestamp;
        }
        self.tokens.absorb(record);
        if let Some(model) = &record.model {
            if !self.models.iter().any(|m| m == model) {
                self.models.push(model.clone());
            }
        }
    }
}

/// Group records into session summaries, first-appearance order.
pub fn summarize_sessions(records: &[CallRecord]) -> Vec<SessionSummary> {
    let mut summaries: Vec<SessionSummary> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();

    for record in records {
        let key = SessionKey::for_record(record);
        match by_id.get(&key.id()) {
            Some(&idx) => summaries[idx].absorb(record),
            None => {
                by_id.insert(key.id(), summaries.len());
                summaries.push(SessionSummary::start(&key, record));
            }
        }
    }

    summaries
}
