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

//! Tracedeck Query
//!
//! Read-side views over fetched call-trace logs: session grouping,
//! filtering, and aggregate statistics.

pub mod filter;
pub mod sessions;
pub mod stats;
pub mod store;

pub use filter::RecordFilter;
pub use sessions::{summarize_sessions, SessionSummary};
pub use stats::{compute_stats, ModelStats, TokenTotals, TraceStats, UNKNOWN_MODEL};
pub use store::LogStore;
