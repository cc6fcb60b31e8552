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

//! In-memory log store
//!
//! Owns the records of one loaded log and is the single place where wire
//! records are normalized to their canonical shape. Everything downstream
//! (grouping, filtering, hierarchy builds, stats) reads from here without
//! mutating. There is no persistence and no cross-build caching: views are
//! recomputed from the full record set on every call.

use tracing::debug;

use tracedeck_core::{build_hierarchy, CallNode, CallRecord};

use crate::filter::RecordFilter;
use crate::sessions::{summarize_sessions, SessionSummary};
use crate::stats::{compute_stats, TraceStats};

/// Query facade over one loaded log.
#[derive(Debug, Clone, Default)]
pub struct LogStore {
    records: Vec<CallRecord>,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from freshly fetched records, normalizing legacy
    /// single-frame captures on the way in.
    pub fn from_records(records: Vec<CallRecord>) -> Self {
        let mut store = Self::new();
        store.ingest(records);
        store
    }

    /// Append a fetched batch, normalizing each record.
    pub fn ingest(&mut self, batch: Vec<CallRecord>) {
        let batch_len = batch.len();
        self.records
            .extend(batch.into_iter().map(CallRecord::normalized));
        debug!(
            ingested = batch_len,
            record_count = self.records.len(),
            "ingested record batch"
        );
    }

    /// All records, in ingest order, canonical shape.
    pub fn records(&self) -> &[CallRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Session buckets in first-appearance order.
    pub fn sessions(&self) -> Vec<SessionSummary> {
        summarize_sessions(&self.records)
    }

    /// Call forest for one session, rebuilt from scratch.
    pub fn hierarchy(&self, target_session: &str) -> Vec<CallNode> {
        build_hierarchy(&self.records, target_session)
    }

    /// Records matching a filter, in ingest order.
    pub fn filter(&self, filter: &RecordFilter) -> Vec<&CallRecord> {
        filter.apply(&self.records)
    }

    /// Aggregate rollup over the whole store.
    pub fn stats(&self) -> TraceStats {
        compute_stats(&self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracedeck_core::StackFrame;

    fn traced_record(session: &str, timestamp: f64) -> CallRecord {
        CallRecord {
            session_id: Some(session.to_string()),
            timestamp,
            stack_trace: Some(vec![
                StackFrame::new("app.py", 10, "main"),
                StackFrame::new("llm.py", 7, "chat"),
            ]),
            ..Default::default()
        }
    }

    #[test]
    fn test_ingest_normalizes_legacy_records() {
        let legacy = CallRecord {
            timestamp: 1.0,
            stack_info: Some(StackFrame::new("old.py", 3, "call_llm")),
            ..Default::default()
        };

        let store = LogStore::from_records(vec![legacy]);
        let record = &store.records()[0];
        assert!(record.stack_info.is_none());
        assert_eq!(record.frames().len(), 1);
    }

    #[test]
    fn test_ingest_appends_in_order() {
        let mut store = LogStore::new();
        store.ingest(vec![traced_record("a", 1.0)]);
        store.ingest(vec![traced_record("b", 2.0), traced_record("a", 3.0)]);

        assert_eq!(store.len(), 3);
        let stamps: Vec<f64> = store.records().iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_hierarchy_respects_session_target() {
        let store = LogStore::from_records(vec![
            traced_record("a", 1.0),
            traced_record("a", 2.0),
            traced_record("b", 3.0),
        ]);

        let forest = store.hierarchy("a");
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].subtree_run_count(), 2);
        assert!(store.hierarchy("missing").is_empty());
    }

    #[test]
    fn test_sessions_and_stats_views() {
        let store = LogStore::from_records(vec![
            traced_record("a", 1.0),
            traced_record("b", 2.0),
        ]);

        assert_eq!(store.sessions().len(), 2);
        let stats = store.stats();
        assert_eq!(stats.record_count, 2);
        assert_eq!(stats.with_full_trace, 2);
    }

    #[test]
    fn test_filter_wires_through() {
        let store = LogStore::from_records(vec![
            traced_record("a", 1.0),
            traced_record("b", 2.0),
        ]);

        let hits = store.filter(&RecordFilter::new().with_session("b"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].timestamp, 2.0);
    }

    #[test]
    fn test_empty_store() {
        let store = LogStore::new();
        assert!(store.is_empty());
        assert!(store.sessions().is_empty());
        assert!(store.hierarchy("any").is_empty());
    }
}
