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

//! Call-hierarchy reconstruction
//!
//! Rebuilds the call structure of an instrumented program from the stack
//! traces its records captured. Every record with a full trace contributes
//! one root-to-leaf path; paths from different records are merged into a
//! forest by deduplicating shared prefixes.
//!
//! Node identity is the whole path. Two frames with the same filename,
//! function, and line number are the same node only when every ancestor
//! frame above them also matches; a helper invoked from two different
//! callers produces two distinct nodes. The builder encodes this by keying
//! nodes on `(parent slot, frame triple)`: the parent link carries the rest
//! of the path transitively, so prefix sharing and sibling deduplication
//! both fall out of a single map lookup.
//!
//! A record attaches only at its innermost frame's node. Interior nodes
//! exist purely as structure and carry runs only when some other record
//! bottoms out there. Records whose canonical trace has fewer than two
//! frames cannot establish a caller relationship and are excluded from the
//! forest entirely.
//!
//! Output order is deterministic: roots and children appear in first
//! insertion order, and runs at a node appear in input order. Building
//! twice from the same records yields equal forests.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::record::{CallRecord, StackFrame};
use crate::session::SessionKey;

/// One node of the reconstructed forest.
///
/// Owns its subtree and the records that bottomed out at this call site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallNode {
    pub filename: String,
    pub lineno: u32,
    pub function: String,
    /// Callees observed under this site, in first insertion order.
    pub children: Vec<CallNode>,
    /// Records whose innermost frame was this site, in input order.
    pub runs: Vec<CallRecord>,
}

impl CallNode {
    /// Records attached directly at this node.
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Records attached anywhere in this subtree.
    pub fn subtree_run_count(&self) -> usize {
        self.runs.len()
            + self
                .children
                .iter()
                .map(CallNode::subtree_run_count)
                .sum::<usize>()
    }

    /// Nodes in this subtree, counting self.
    pub fn subtree_node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(CallNode::subtree_node_count)
            .sum::<usize>()
    }

    /// Short display label for this call site.
    pub fn label(&self) -> String {
        format!("{} ({}:{})", self.function, self.filename, self.lineno)
    }
}

/// Frame identity within one parent: the triple that names a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FrameId<'a> {
    filename: &'a str,
    function: &'a str,
    lineno: u32,
}

impl<'a> FrameId<'a> {
    fn of(frame: &'a StackFrame) -> Self {
        Self {
            filename: &frame.filename,
            function: &frame.function,
            lineno: frame.lineno,
        }
    }
}

/// Arena slot holding one node during the build. Slots are append-only and
/// a child's slot index is always greater than its parent's.
struct ArenaNode<'a> {
    /// Representative frame, taken from the first record that created this
    /// slot. Later records sharing the path may carry different code
    /// context; the first capture wins.
    frame: &'a StackFrame,
    parent: Option<usize>,
    /// Indices into the input slice for records attached here.
    runs: Vec<usize>,
}

/// Build the call forest for one session.
///
/// Filters `records` down to those matching `target_session` (explicit id
/// equality, or the `adhoc-` singleton convention for ungrouped records),
/// then reconstructs the forest from the survivors. This is the operation
/// a session view calls on every input change; each call builds from
/// scratch and shares nothing with previous builds.
pub fn build_hierarchy(records: &[CallRecord], target_session: &str) -> Vec<CallNode> {
    let key = SessionKey::parse(target_session);
    let selected: Vec<&CallRecord> = records.iter().filter(|r| key.matches(r)).collect();
    build(&selected)
}

/// Build the call forest for records already selected by the caller.
///
/// Records must already be canonical (see [`CallRecord::normalized`]); a
/// legacy record still carrying only `stack_info` has no canonical frames
/// here and drops out with the other traceless records.
pub fn build_forest(records: &[CallRecord]) -> Vec<CallNode> {
    let refs: Vec<&CallRecord> = records.iter().collect();
    build(&refs)
}

fn build(records: &[&CallRecord]) -> Vec<CallNode> {
    let mut nodes: Vec<ArenaNode> = Vec::new();
    let mut index: HashMap<(Option<usize>, FrameId), usize> = HashMap::new();
    let mut roots: Vec<usize> = Vec::new();
    let mut excluded = 0usize;

    for (record_idx, record) in records.iter().enumerate() {
        let frames = record.frames();
        if frames.len() < 2 {
            excluded += 1;
            continue;
        }

        let mut parent: Option<usize> = None;
        for frame in frames {
            let key = (parent, FrameId::of(frame));
            let slot = match index.get(&key) {
                Some(&slot) => slot,
                None => {
                    let slot = nodes.len();
                    nodes.push(ArenaNode {
                        frame,
                        parent,
                        runs: Vec::new(),
                    });
                    index.insert(key, slot);
                    // A slot joins the root list or its parent exactly once,
                    // at creation; the structural key rules out duplicates.
                    if parent.is_none() {
                        roots.push(slot);
                    }
                    slot
                }
            };
            parent = Some(slot);
        }

        // At least two frames were walked, so the leaf slot exists.
        if let Some(leaf) = parent {
            nodes[leaf].runs.push(record_idx);
        }
    }

    let forest = materialize(&nodes, &roots, records);
    debug!(
        record_count = records.len(),
        excluded,
        node_count = nodes.len(),
        root_count = forest.len(),
        "built call forest"
    );
    forest
}

/// Turn the arena into owned trees.
///
/// Children were created after their parents, so a single reverse pass can
/// move each finished subtree into its parent without recursion. Pushing in
/// reverse index order also reverses sibling order, which the per-node
/// `reverse()` undoes once a node's children are complete.
fn materialize(nodes: &[ArenaNode], roots: &[usize], records: &[&CallRecord]) -> Vec<CallNode> {
    let mut built: Vec<Option<CallNode>> = nodes
        .iter()
        .map(|node| {
            Some(CallNode {
                filename: node.frame.filename.clone(),
                lineno: node.frame.lineno,
                function: node.frame.function.clone(),
                children: Vec::new(),
                runs: node.runs.iter().map(|&idx| records[idx].clone()).collect(),
            })
        })
        .collect();

    for idx in (0..nodes.len()).rev() {
        let Some(mut node) = built[idx].take() else {
            continue;
        };
        node.children.reverse();
        match nodes[idx].parent {
            Some(parent) => {
                if let Some(parent_node) = built[parent].as_mut() {
                    parent_node.children.push(node);
                }
            }
            None => built[idx] = Some(node),
        }
    }

    roots.iter().filter_map(|&root| built[root].take()).collect()
}
