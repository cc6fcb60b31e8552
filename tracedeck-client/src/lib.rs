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

//! Tracedeck Client
//!
//! Async access to call-trace logs: the local HTTP backend and plain
//! directories of JSON log files, behind one [`LogSource`] seam, plus the
//! backend's record-scoring endpoint.

pub mod error;
pub mod http;
pub mod source;

pub use error::{ClientError, Result};
pub use http::{BackendConfig, EvalOutcome, HttpLogSource, ScoredRecord, DEFAULT_BASE_URL};
pub use source::{DirLogSource, LogSource};
