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

//! Read-only record filtering
//!
//! A filter is a conjunction of optional criteria applied to an immutable
//! record slice. Records are never modified or reordered; filtering yields
//! references in input order. An empty filter matches everything.

use regex::Regex;
use tracedeck_core::{CallRecord, SessionKey};

/// Conjunction of filter criteria over call records.
///
/// Built incrementally with `with_*` methods; every criterion left unset
/// matches all records.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    session: Option<SessionKey>,
    model: Option<String>,
    text: Option<String>,
    site: Option<Regex>,
    min_tokens: Option<u32>,
    require_tool_calls: bool,
    since: Option<f64>,
    until: Option<f64>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one session, including the `adhoc-` singleton convention.
    pub fn with_session(mut self, target: &str) -> Self {
        self.session = Some(SessionKey::parse(target));
        self
    }

    /// Exact model name match.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Case-insensitive substring search over message contents, the raw
    /// response, the model name, and captured frame functions and files.
    pub fn with_text(mut self, needle: impl Into<String>) -> Self {
        self.text = Some(needle.into().to_lowercase());
        self
    }

    /// Regex over captured call sites, tested against every frame's
    /// `function` and `filename:lineno` rendering. The one fallible filter
    /// operation; the pattern compiles here, once.
    pub fn matching_regex(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.site = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Keep records whose effective token total is at least `min`.
    pub fn with_min_tokens(mut self, min: u32) -> Self {
        self.min_tokens = Some(min);
        self
    }

    /// Keep only records that carry tool calls, either at the record level
    /// or inside a message.
    pub fn with_tool_calls(mut self) -> Self {
        self.require_tool_calls = true;
        self
    }

    /// Keep records with `timestamp >= since` (seconds since epoch).
    pub fn with_since(mut self, since: f64) -> Self {
        self.since = Some(since);
        self
    }

    /// Keep records with `timestamp <= until` (seconds since epoch).
    pub fn with_until(mut self, until: f64) -> Self {
        self.until = Some(until);
        self
    }

    /// Whether the record satisfies every configured criterion.
    pub fn matches(&self, record: &CallRecord) -> bool {
        if let Some(session) = &self.session {
            if !session.matches(record) {
                return false;
            }
        }
        if let Some(model) = &self.model {
            if record.model.as_deref() != Some(model.as_str()) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if record.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if record.timestamp > until {
                return false;
            }
        }
        if let Some(min) = self.min_tokens {
            if record.total_tokens() < min {
                return false;
            }
        }
        if self.require_tool_calls && !has_tool_calls(record) {
            return false;
        }
        if let Some(needle) = &self.text {
            if !text_matches(record, needle) {
                return false;
            }
        }
        if let Some(site) = &self.site {
            if !site_matches(record, site) {
                return false;
            }
        }
        true
    }

    /// Apply to a record slice, preserving input order.
    pub fn apply<'a>(&self, records: &'a [CallRecord]) -> Vec<&'a CallRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

fn has_tool_calls(record: &CallRecord) -> bool {
    if !record.tool_calls.is_empty() {
        return true;
    }
    record
        .messages
        .iter()
        .any(|m| m.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty()))
}

fn text_matches(record: &CallRecord, needle: &str) -> bool {
    if record
        .messages
        .iter()
        .any(|m| m.content.to_lowercase().contains(needle))
    {
        return true;
    }
    if let Some(model) = &record.model {
        if model.to_lowercase().contains(needle) {
            return true;
        }
    }
    if !record.response.is_null() && record.response.to_string().to_lowercase().contains(needle) {
        return true;
    }
    record.frames().iter().any(|frame| {
        frame.function.to_lowercase().contains(needle)
            || frame.filename.to_lowercase().contains(needle)
    })
}

fn site_matches(record: &CallRecord, site: &Regex) -> bool {
    record.frames().iter().any(|frame| {
        site.is_match(&frame.function) || site.is_match(&format!("{}:{}", frame.filename, frame.lineno))
    })
}
