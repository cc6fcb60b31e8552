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

//! Tracedeck Core
//!
//! Record model and call-hierarchy reconstruction for LLM call-trace logs.

pub mod hierarchy;
pub mod record;
pub mod session;

pub use hierarchy::{build_forest, build_hierarchy, CallNode};
pub use record::{CallRecord, CapturedStack, Message, StackFrame, TokenUsage, ToolCall};
pub use session::{adhoc_id, SessionKey, ADHOC_PREFIX};
