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

//! Plain-text rendering of call forests.

use tracedeck_core::{CallNode, CallRecord};

/// Render a call forest as an indented tree, one call site per line.
///
/// Each node line shows `function (filename:lineno)` and, when nonzero, the
/// number of runs attached to it. Runs are listed beneath their node with
/// timestamp, model, and token usage; children follow with box-drawing
/// connectors. Sibling and run order is the builder's insertion order.
pub fn render_forest(forest: &[CallNode]) -> String {
    let mut out = String::new();
    for root in forest {
        push_node(&mut out, root, "", "");
    }
    out
}

fn push_node(out: &mut String, node: &CallNode, line_prefix: &str, child_prefix: &str) {
    out.push_str(line_prefix);
    out.push_str(&node.label());
    let runs = node.run_count();
    if runs > 0 {
        out.push_str(&format!(
            "  [{} run{}]",
            runs,
            if runs == 1 { "" } else { "s" }
        ));
    }
    out.push('\n');

    for record in &node.runs {
        out.push_str(child_prefix);
        out.push_str("  · ");
        out.push_str(&run_line(record));
        out.push('\n');
    }

    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        let (connector, continuation) = if i + 1 == count {
            ("└─ ", "   ")
        } else {
            ("├─ ", "│  ")
        };
        push_node(
            out,
            child,
            &format!("{}{}", child_prefix, connector),
            &format!("{}{}", child_prefix, continuation),
        );
    }
}

fn run_line(record: &CallRecord) -> String {
    let mut line = format_timestamp(record.timestamp);
    if let Some(model) = &record.model {
        line.push_str("  ");
        line.push_str(model);
    }
    let tokens = record.total_tokens();
    if tokens > 0 {
        line.push_str(&format!("  {} tokens", tokens));
    }
    line
}

/// Epoch-seconds timestamp as wall-clock UTC with millisecond precision.
/// Falls back to the raw number for pre-epoch values, where the fractional
/// part would not survive the nanosecond split, and anything outside
/// chrono's range.
pub fn format_timestamp(timestamp: f64) -> String {
    if timestamp < 0.0 {
        return timestamp.to_string();
    }
    let secs = timestamp.trunc() as i64;
    let nanos = (timestamp.fract() * 1e9) as u32;
    chrono::DateTime::from_timestamp(secs, nanos)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
