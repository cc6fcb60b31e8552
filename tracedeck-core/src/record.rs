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

//! Call record data model
//!
//! A call record is one logged LLM API invocation together with the stack
//! trace captured at the moment of the call. Records arrive as JSON from the
//! log backend; field names follow the backend's wire format (camelCase for
//! the logging layer's own fields, provider-style snake_case inside the
//! payload). Records are immutable once fetched: consumers filter, group,
//! and walk them, but never modify them.

use serde::{Deserialize, Serialize};

/// One captured stack location.
///
/// A stack trace is an ordered sequence of frames from outermost caller to
/// innermost callee, terminating at the frame where the LLM invocation
/// occurred. Only `filename`, `function`, and `lineno` take part in call-site
/// identity; `code_context` is display-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackFrame {
    pub filename: String,
    pub lineno: u32,
    pub function: String,
    /// Source lines surrounding the call, as captured by the logger.
    #[serde(rename = "codeContext", default, skip_serializing_if = "Vec::is_empty")]
    pub code_context: Vec<String>,
}

impl StackFrame {
    /// Create a frame with no code context.
    pub fn new(filename: impl Into<String>, lineno: u32, function: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            lineno,
            function: function.into(),
            code_context: Vec::new(),
        }
    }
}

/// Message in a logged conversation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// Tool call attached to a message or a record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Arguments as the provider logged them (usually a JSON string).
    #[serde(default)]
    pub arguments: String,
}

/// Token usage reported by the provider for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Total tokens, falling back to the component sum when the logger left
    /// `total_tokens` at zero.
    pub fn effective_total(&self) -> u32 {
        if self.total_tokens > 0 {
            self.total_tokens
        } else {
            self.prompt_tokens + self.completion_tokens
        }
    }
}

/// One logged LLM invocation ("run").
///
/// `stack_trace` is the modern capture: the full frame sequence. Legacy
/// records instead carry a single flattened `stack_info` frame; see
/// [`CallRecord::captured_stack`] and [`CallRecord::normalized`]. Everything
/// past the stack data is payload: opaque to the hierarchy builder, carried
/// along for display. Unknown fields survive a round-trip through `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    /// Session this record was logged under; absent for ungrouped calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Seconds since the Unix epoch, as the logger recorded it.
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<Vec<StackFrame>>,
    /// Legacy single-frame capture, superseded by `stack_trace`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_info: Option<StackFrame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub response: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Discriminated view of a record's stack data.
///
/// Records come in two wire shapes: modern ones with a full `stackTrace`
/// and legacy ones with a single flattened `stackInfo` frame. This view
/// makes the distinction explicit so that normalization happens in exactly
/// one place instead of ad-hoc field probing at every consumer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CapturedStack<'a> {
    /// Full frame sequence, outermost to innermost.
    Trace(&'a [StackFrame]),
    /// Legacy flattened capture: one frame, no caller chain.
    Flattened(&'a StackFrame),
    /// No stack data was captured at all.
    Missing,
}

impl CallRecord {
    /// Classify this record's stack data. A record carrying both shapes is
    /// treated as modern; the legacy field is ignored.
    pub fn captured_stack(&self) -> CapturedStack<'_> {
        match (&self.stack_trace, &self.stack_info) {
            (Some(frames), _) => CapturedStack::Trace(frames),
            (None, Some(frame)) => CapturedStack::Flattened(frame),
            (None, None) => CapturedStack::Missing,
        }
    }

    /// Convert a legacy record into the canonical shape: a flattened
    /// `stack_info` becomes a one-frame `stack_trace`. Canonical records
    /// pass through unchanged. Downstream consumers (the hierarchy builder
    /// in particular) only ever see the canonical shape.
    pub fn normalized(mut self) -> Self {
        if self.stack_trace.is_none() {
            if let Some(frame) = self.stack_info.take() {
                self.stack_trace = Some(vec![frame]);
            }
        }
        self
    }

    /// Canonical frames for this record, empty when no stack was captured.
    /// Meaningful after [`CallRecord::normalized`].
    pub fn frames(&self) -> &[StackFrame] {
        self.stack_trace.as_deref().unwrap_or_default()
    }

    /// Whether this record can contribute edges to a call hierarchy: a
    /// canonical trace of at least two frames. Single-frame traces cannot
    /// establish a call relationship and are excluded from the forest.
    pub fn has_full_trace(&self) -> bool {
        self.frames().len() >= 2
    }

    /// Total token count for display and filtering; zero when the logger
    /// reported no usage.
    pub fn total_tokens(&self) -> u32 {
        self.usage.map(|u| u.effective_total()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modern_record_deserializes() {
        let json = r#"{
            "sessionId": "sess-1",
            "timestamp": 1723651200.25,
            "stackTrace": [
                {"filename": "app.py", "lineno": 10, "function": "main",
                 "codeContext": ["result = agent.run()"]},
                {"filename": "agent.py", "lineno": 42, "function": "run"}
            ],
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "hi"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;

        let record: CallRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.session_id.as_deref(), Some("sess-1"));
        assert_eq!(record.timestamp, 1723651200.25);
        assert_eq!(record.frames().len(), 2);
        assert_eq!(record.frames()[0].function, "main");
        assert_eq!(record.frames()[0].code_context, vec!["result = agent.run()"]);
        assert_eq!(record.model.as_deref(), Some("gpt-4o"));
        assert_eq!(record.total_tokens(), 15);
        assert!(matches!(record.captured_stack(), CapturedStack::Trace(_)));
    }

    #[test]
    fn test_legacy_record_normalizes_to_one_frame_trace() {
        let json = r#"{
            "timestamp": 123.0,
            "stackInfo": {"filename": "old.py", "lineno": 7, "function": "call_llm"}
        }"#;

        let record: CallRecord = serde_json::from_str(json).unwrap();
        assert!(matches!(record.captured_stack(), CapturedStack::Flattened(_)));

        let record = record.normalized();
        assert!(record.stack_info.is_none());
        assert_eq!(record.frames().len(), 1);
        assert_eq!(record.frames()[0].function, "call_llm");
        assert!(!record.has_full_trace());
    }

    #[test]
    fn test_record_without_stack_data() {
        let record: CallRecord = serde_json::from_str(r#"{"timestamp": 1.0}"#).unwrap();
        assert!(matches!(record.captured_stack(), CapturedStack::Missing));

        let record = record.normalized();
        assert!(record.frames().is_empty());
        assert!(!record.has_full_trace());
    }

    #[test]
    fn test_modern_shape_wins_over_legacy() {
        let json = r#"{
            "timestamp": 1.0,
            "stackTrace": [
                {"filename": "a.py", "lineno": 1, "function": "f"},
                {"filename": "b.py", "lineno": 2, "function": "g"}
            ],
            "stackInfo": {"filename": "old.py", "lineno": 9, "function": "h"}
        }"#;

        let record = serde_json::from_str::<CallRecord>(json).unwrap().normalized();
        assert_eq!(record.frames().len(), 2);
        assert_eq!(record.frames()[0].filename, "a.py");
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let json = r#"{"timestamp": 5.5, "customTag": "alpha", "retries": 2}"#;
        let record: CallRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.extra["customTag"], "alpha");
        assert_eq!(record.extra["retries"], 2);

        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["customTag"], "alpha");
        assert_eq!(out["retries"], 2);
        assert_eq!(out["timestamp"], 5.5);
    }

    #[test]
    fn test_token_usage_effective_total() {
        let reported = TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        };
        assert_eq!(reported.effective_total(), 15);

        let unreported = TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 0,
        };
        assert_eq!(unreported.effective_total(), 15);
    }
}
