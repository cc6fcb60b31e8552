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

//! Aggregate statistics over a record set
//!
//! Token and call-count rollups for the stats view: one overall block plus
//! a per-model breakdown sorted by total tokens. Records without a model
//! are grouped under a placeholder bucket.

use std::collections::HashMap;

use serde::Serialize;
use tracedeck_core::CallRecord;

use crate::sessions::summarize_sessions;

/// Bucket name for records whose payload carried no model field.
pub const UNKNOWN_MODEL: &str = "(unknown)";

/// Summed token counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTotals {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenTotals {
    /// Fold one record's reported usage into the totals. Records without
    /// usage contribute nothing.
    pub fn absorb(&mut self, record: &CallRecord) {
        if let Some(usage) = record.usage {
            self.prompt_tokens += u64::from(usage.prompt_tokens);
            self.completion_tokens += u64::from(usage.completion_tokens);
            self.total_tokens += u64::from(usage.effective_total());
        }
    }
}

/// Rollup for one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStats {
    pub model: String,
    pub call_count: usize,
    pub tokens: TokenTotals,
}

/// Rollup over a whole record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceStats {
    pub record_count: usize,
    pub session_count: usize,
    /// Records whose canonical trace can contribute to a call forest.
    pub with_full_trace: usize,
    pub tool_call_count: usize,
    pub tokens: TokenTotals,
    /// Heaviest models first; ties break on model name.
    pub by_model: Vec<ModelStats>,
}

/// Compute the stats rollup for a record set.
pub fn compute_stats(records: &[CallRecord]) -> TraceStats {
    let mut tokens = TokenTotals::default();
    let mut with_full_trace = 0usize;
    let mut tool_call_count = 0usize;
    let mut by_model: Vec<ModelStats> = Vec::new();
    let mut model_index: HashMap<String, usize> = HashMap::new();

    for record in records {
        tokens.absorb(record);
        if record.has_full_trace() {
            with_full_trace += 1;
        }
        tool_call_count += record.tool_calls.len();
        tool_call_count += record
            .messages
            .iter()
            .filter_map(|m| m.tool_calls.as_ref())
            .map(Vec::len)
            .sum::<usize>();

        let model = record.model.as_deref().unwrap_or(UNKNOWN_MODEL);
        let idx = match model_index.get(model) {
            Some(&idx) => idx,
            None => {
                model_index.insert(model.to_string(), by_model.len());
                by_model.push(ModelStats {
                    model: model.to_string(),
                    call_count: 0,
                    tokens: TokenTotals::default(),
                });
                by_model.len() - 1
            }
        };
        by_model[idx].call_count += 1;
        by_model[idx].tokens.absorb(record);
    }

    by_model.sort_by(|a, b| {
        b.tokens
            .total_tokens
            .cmp(&a.tokens.total_tokens)
            .then_with(|| a.model.cmp(&b.model))
    });

    TraceStats {
        record_count: records.len(),
        session_count: summarize_sessions(records).len(),
        with_full_trace,
        tool_call_count,
        tokens,
        by_model,
    }
}
