//! Identifier generation for nodes, subgraphs and expanded nodes
//!
//! New nodes get `"{type}_{counter}"` IDs with one counter per node type.
//! Counters are seeded from whatever IDs a loaded workflow already uses and
//! every candidate is checked against the target scope, so a renamed node
//! can never be shadowed by a later `add_node`.

use std::collections::{HashMap, HashSet};

use crate::types::{GraphScope, Node, NodeId, NodeType};

/// Produces collision-free IDs for one editing session
#[derive(Debug, Default, Clone)]
pub struct IdGenerator {
    counters: HashMap<NodeType, u64>,
    /// Last timestamp handed out for expansion IDs
    last_timestamp: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator whose counters continue after the given nodes' IDs
    pub fn seeded(nodes: &[Node]) -> Self {
        let mut ids = Self::new();
        ids.seed_from(nodes);
        ids
    }

    /// Raise counters past every `"{type}_{n}"` ID present in `nodes`
    pub fn seed_from(&mut self, nodes: &[Node]) {
        for node in nodes {
            for node_type in NodeType::ALL {
                if let Some(n) = parse_counter(&node.id, node_type) {
                    let counter = self.counters.entry(node_type).or_insert(0);
                    *counter = (*counter).max(n);
                }
            }
        }
    }

    /// Forget all counters (used on context switch before reseeding)
    pub fn reset(&mut self) {
        self.counters.clear();
    }

    /// Next free `"{type}_{counter}"` ID in the given scope
    ///
    /// Once a counter is exhausted (a loaded ID carried `u64::MAX`), IDs fall
    /// back to `"{type}_{uuid}"`.
    pub fn next_node_id<S: GraphScope + ?Sized>(
        &mut self,
        node_type: NodeType,
        scope: &S,
    ) -> NodeId {
        let counter = self.counters.entry(node_type).or_insert(0);
        loop {
            let candidate = match counter.checked_add(1) {
                Some(next) => {
                    *counter = next;
                    format!("{}_{}", node_type.as_str(), next)
                }
                None => {
                    log::warn!("ID counter for {} exhausted, using a UUID", node_type);
                    format!("{}_{}", node_type.as_str(), uuid::Uuid::new_v4().simple())
                }
            };
            if !scope.has_node(&candidate) {
                return candidate;
            }
        }
    }

    /// Fresh `"{innerId}_{timestamp}_{index}"` IDs for nodes spliced out of a subgraph
    ///
    /// The timestamp is strictly increasing per generator and bumped further
    /// until none of the produced IDs is already `taken`.
    pub fn expansion_ids(&mut self, inner_ids: &[&str], taken: &HashSet<&str>) -> Vec<NodeId> {
        let mut timestamp = chrono::Utc::now().timestamp_millis().max(self.last_timestamp + 1);
        loop {
            let candidates: Vec<NodeId> = inner_ids
                .iter()
                .enumerate()
                .map(|(index, id)| format!("{}_{}_{}", id, timestamp, index))
                .collect();
            if candidates.iter().all(|c| !taken.contains(c.as_str())) {
                self.last_timestamp = timestamp;
                return candidates;
            }
            log::debug!("Expansion IDs at timestamp {} collide, retrying", timestamp);
            timestamp += 1;
        }
    }
}

fn parse_counter(id: &str, node_type: NodeType) -> Option<u64> {
    id.strip_prefix(node_type.as_str())?
        .strip_prefix('_')?
        .parse()
        .ok()
}
