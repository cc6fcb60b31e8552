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

//! End-to-end tests for the record model and hierarchy builder, plus
//! randomized structural properties of the forest.

use std::collections::HashSet;

use proptest::prelude::*;
use tracedeck_core::{build_forest, CallNode, CallRecord, SessionKey, StackFrame};

fn records_from(traces: &[Vec<(u8, u8, u8)>]) -> Vec<CallRecord> {
    traces
        .iter()
        .enumerate()
        .map(|(idx, trace)| CallRecord {
            timestamp: idx as f64,
            stack_trace: Some(
                trace
                    .iter()
                    .map(|&(file, func, line)| {
                        StackFrame::new(
                            format!("file{file}.py"),
                            u32::from(line) + 1,
                            format!("func{func}"),
                        )
                    })
                    .collect(),
            ),
            ..Default::default()
        })
        .collect()
}

fn triple(node: &CallNode) -> (&str, &str, u32) {
    (&node.filename, &node.function, node.lineno)
}

fn siblings_unique(nodes: &[CallNode]) -> bool {
    let mut seen = HashSet::new();
    for node in nodes {
        if !seen.insert(triple(node)) {
            return false;
        }
        if !siblings_unique(&node.children) {
            return false;
        }
    }
    true
}

fn node_at_path<'a>(forest: &'a [CallNode], frames: &[StackFrame]) -> Option<&'a CallNode> {
    let (first, rest) = frames.split_first()?;
    let mut node = forest
        .iter()
        .find(|n| triple(n) == (first.filename.as_str(), first.function.as_str(), first.lineno))?;
    for frame in rest {
        node = node
            .children
            .iter()
            .find(|n| triple(n) == (frame.filename.as_str(), frame.function.as_str(), frame.lineno))?;
    }
    Some(node)
}

fn trace_strategy() -> impl Strategy<Value = Vec<(u8, u8, u8)>> {
    prop::collection::vec((0u8..3, 0u8..3, 0u8..2), 0..5)
}

proptest! {
    #[test]
    fn prop_build_is_deterministic(traces in prop::collection::vec(trace_strategy(), 0..24)) {
        let records = records_from(&traces);
        prop_assert_eq!(build_forest(&records), build_forest(&records));
    }

    #[test]
    fn prop_every_full_trace_attaches_exactly_once(
        traces in prop::collection::vec(trace_strategy(), 0..24),
    ) {
        let records = records_from(&traces);
        let forest = build_forest(&records);

        let qualifying = records.iter().filter(|r| r.frames().len() >= 2).count();
        let attached: usize = forest.iter().map(CallNode::subtree_run_count).sum();
        prop_assert_eq!(attached, qualifying);
    }

    #[test]
    fn prop_siblings_never_repeat_a_call_site(
        traces in prop::collection::vec(trace_strategy(), 0..24),
    ) {
        let records = records_from(&traces);
        let forest = build_forest(&records);
        prop_assert!(siblings_unique(&forest));
    }

    #[test]
    fn prop_roots_are_distinct_first_frames_in_discovery_order(
        traces in prop::collection::vec(trace_strategy(), 0..24),
    ) {
        let records = records_from(&traces);
        let forest = build_forest(&records);

        // A root exists for every distinct outermost frame among qualifying
        // records and for nothing else, ordered by first discovery.
        let mut expected: Vec<(String, String, u32)> = Vec::new();
        for record in records.iter().filter(|r| r.frames().len() >= 2) {
            let frame = &record.frames()[0];
            let site = (frame.filename.clone(), frame.function.clone(), frame.lineno);
            if !expected.contains(&site) {
                expected.push(site);
            }
        }

        let actual: Vec<(String, String, u32)> = forest
            .iter()
            .map(|n| (n.filename.clone(), n.function.clone(), n.lineno))
            .collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_each_run_sits_at_its_own_leaf_path(
        traces in prop::collection::vec(trace_strategy(), 0..24),
    ) {
        let records = records_from(&traces);
        let forest = build_forest(&records);

        for record in records.iter().filter(|r| r.has_full_trace()) {
            let node = node_at_path(&forest, record.frames());
            prop_assert!(node.is_some(), "leaf path missing from forest");
            if let Some(node) = node {
                // Timestamps are unique per input record here.
                prop_assert!(node.runs.iter().any(|r| r.timestamp == record.timestamp));
            }
        }
    }
}

#[test]
fn test_session_filter_then_build() {
    let batch = r#"[
        {"sessionId": "demo", "timestamp": 1.0,
         "stackTrace": [
            {"filename": "app.py", "lineno": 10, "function": "main"},
            {"filename": "llm.py", "lineno": 7, "function": "chat"}]},
        {"sessionId": "other", "timestamp": 2.0,
         "stackTrace": [
            {"filename": "app.py", "lineno": 10, "function": "main"},
            {"filename": "llm.py", "lineno": 7, "function": "chat"}]},
        {"timestamp": 3.0,
         "stackTrace": [
            {"filename": "app.py", "lineno": 10, "function": "main"},
            {"filename": "llm.py", "lineno": 21, "function": "embed"}]}
    ]"#;

    let records: Vec<CallRecord> = serde_json::from_str(batch).unwrap();
    let key = SessionKey::parse("demo");
    let selected: Vec<CallRecord> = records
        .into_iter()
        .filter(|r| key.matches(r))
        .map(CallRecord::normalized)
        .collect();

    let forest = build_forest(&selected);
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].subtree_run_count(), 1);
    assert_eq!(forest[0].children[0].runs[0].timestamp, 1.0);
}

#[test]
fn test_adhoc_session_selects_single_record() {
    let batch = r#"[
        {"timestamp": 1723651200.25,
         "stackTrace": [
            {"filename": "app.py", "lineno": 10, "function": "main"},
            {"filename": "llm.py", "lineno": 7, "function": "chat"}]},
        {"timestamp": 1723651201.5,
         "stackTrace": [
            {"filename": "app.py", "lineno": 10, "function": "main"},
            {"filename": "llm.py", "lineno": 7, "function": "chat"}]}
    ]"#;

    let records: Vec<CallRecord> = serde_json::from_str(batch).unwrap();
    let key = SessionKey::parse("adhoc-1723651200.25");
    let selected: Vec<CallRecord> = records.into_iter().filter(|r| key.matches(r)).collect();

    assert_eq!(selected.len(), 1);
    let forest = build_forest(&selected);
    assert_eq!(forest[0].children[0].runs.len(), 1);
}

#[test]
fn test_legacy_records_normalize_but_stay_out_of_the_forest() {
    let batch = r#"[
        {"timestamp": 1.0,
         "stackInfo": {"filename": "old.py", "lineno": 3, "function": "call_llm"}},
        {"timestamp": 2.0,
         "stackTrace": [
            {"filename": "app.py", "lineno": 10, "function": "main"},
            {"filename": "llm.py", "lineno": 7, "function": "chat"}]}
    ]"#;

    let records: Vec<CallRecord> = serde_json::from_str(batch).unwrap();
    let normalized: Vec<CallRecord> = records.into_iter().map(CallRecord::normalized).collect();

    // The legacy record now has a canonical one-frame trace.
    assert_eq!(normalized[0].frames().len(), 1);

    // One frame cannot establish a caller relationship.
    let forest = build_forest(&normalized);
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].function, "main");
    assert_eq!(forest[0].subtree_run_count(), 1);
}
