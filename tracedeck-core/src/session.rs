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

//! Session identity and matching
//!
//! Records logged under an explicit `sessionId` belong to that session.
//! Records logged without one are not grouped: each forms its own synthetic
//! singleton session, addressed by the reserved id `adhoc-<timestamp>` where
//! `<timestamp>` is the record's timestamp rendered through `f64` `Display`.
//! The comparison is textual, so a selector only ever matches the exact
//! rendering it was built from.

use crate::record::CallRecord;

/// Reserved prefix for synthetic singleton sessions. Ids beginning with this
/// prefix are never treated as explicit session names.
pub const ADHOC_PREFIX: &str = "adhoc-";

/// Synthetic session id for an ungrouped record with the given timestamp.
pub fn adhoc_id(timestamp: f64) -> String {
    format!("{ADHOC_PREFIX}{timestamp}")
}

/// Parsed session selector.
///
/// Built from a raw id string with [`SessionKey::parse`] or derived from a
/// record with [`SessionKey::for_record`]. The two forms never cross-match:
/// an adhoc selector ignores records that carry an explicit session id, and
/// a named selector ignores records that lack one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionKey {
    /// Explicit session name, matched against `sessionId` by equality.
    Named(String),
    /// Singleton selector carrying the timestamp text after the prefix.
    Adhoc(String),
}

impl SessionKey {
    /// Interpret a raw session id. Anything under the reserved prefix is a
    /// singleton selector; everything else is an explicit name.
    pub fn parse(id: &str) -> Self {
        match id.strip_prefix(ADHOC_PREFIX) {
            Some(ts) => SessionKey::Adhoc(ts.to_string()),
            None => SessionKey::Named(id.to_string()),
        }
    }

    /// The session this record belongs to.
    pub fn for_record(record: &CallRecord) -> Self {
        match &record.session_id {
            Some(id) => SessionKey::Named(id.clone()),
            None => SessionKey::Adhoc(record.timestamp.to_string()),
        }
    }

    /// Whether the record belongs to this session.
    pub fn matches(&self, record: &CallRecord) -> bool {
        match (self, &record.session_id) {
            (SessionKey::Named(name), Some(id)) => name == id,
            (SessionKey::Adhoc(ts), None) => *ts == record.timestamp.to_string(),
            _ => false,
        }
    }

    /// Render back to the raw id form.
    pub fn id(&self) -> String {
        match self {
            SessionKey::Named(name) => name.clone(),
            SessionKey::Adhoc(ts) => format!("{ADHOC_PREFIX}{ts}"),
        }
    }

    /// True for synthetic singleton selectors.
    pub fn is_adhoc(&self) -> bool {
        matches!(self, SessionKey::Adhoc(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_in_session(session: &str, timestamp: f64) -> CallRecord {
        CallRecord {
            session_id: Some(session.to_string()),
            timestamp,
            ..Default::default()
        }
    }

    fn ungrouped_record(timestamp: f64) -> CallRecord {
        CallRecord {
            timestamp,
            ..Default::default()
        }
    }

    #[test]
    fn test_named_selector_matches_by_equality() {
        let key = SessionKey::parse("experiment-7");
        assert!(key.matches(&record_in_session("experiment-7", 1.0)));
        assert!(!key.matches(&record_in_session("experiment-8", 1.0)));
        assert!(!key.matches(&ungrouped_record(1.0)));
    }

    #[test]
    fn test_adhoc_selector_matches_ungrouped_by_timestamp_text() {
        let key = SessionKey::parse("adhoc-1723651200.25");
        assert!(key.matches(&ungrouped_record(1723651200.25)));
        assert!(!key.matches(&ungrouped_record(1723651200.5)));
        // Explicit session id always wins over a timestamp coincidence.
        assert!(!key.matches(&record_in_session("s", 1723651200.25)));
    }

    #[test]
    fn test_integer_timestamps_render_without_fraction() {
        assert_eq!(adhoc_id(123.0), "adhoc-123");
        let key = SessionKey::parse("adhoc-123");
        assert!(key.matches(&ungrouped_record(123.0)));
    }

    #[test]
    fn test_for_record_round_trips_through_parse() {
        let ungrouped = ungrouped_record(42.5);
        let key = SessionKey::for_record(&ungrouped);
        assert!(key.is_adhoc());
        assert_eq!(key.id(), "adhoc-42.5");
        assert_eq!(SessionKey::parse(&key.id()), key);
        assert!(key.matches(&ungrouped));

        let grouped = record_in_session("run-3", 42.5);
        let key = SessionKey::for_record(&grouped);
        assert!(!key.is_adhoc());
        assert_eq!(key.id(), "run-3");
        assert!(key.matches(&grouped));
    }

    #[test]
    fn test_prefix_is_reserved_for_singletons() {
        // A raw id under the prefix parses as a singleton selector, never a name.
        let key = SessionKey::parse("adhoc-anything");
        assert!(key.is_adhoc());
        assert!(!key.matches(&record_in_session("adhoc-anything", 1.0)));
    }
}
