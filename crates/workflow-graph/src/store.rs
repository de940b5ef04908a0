//! The graph store: single owner of the workflow being edited
//!
//! All mutation goes through [`GraphStore`]. Operations that would break an
//! invariant (removing start/end, duplicate edges, unresolvable edge
//! references, ineligible groupings) are silent no-ops that return
//! `false`/`None`; they come from UI gestures racing each other and must
//! never interrupt the session.
//!
//! History is explicit: the host calls [`GraphStore::push_undo`] before a
//! gesture, so a multi-step gesture produces one undo entry.
//!
//! The store is single-writer. Hosts embedding it behind a network API
//! must serialize mutations per workflow themselves.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::events::{EventSink, GraphEvent, HistoryDirection};
use crate::groups::{GroupOperations, GroupRequest};
use crate::ids::IdGenerator;
use crate::layout::{positions_by_id, LayoutEngine};
use crate::recipe::Recipe;
use crate::resolver::EdgeResolver;
use crate::types::{
    Edge, EdgeCondition, EdgeId, Graph, GraphScope, Node, NodeId, NodeKind, NodeType, Position,
    Workflow,
};
use crate::undo::{Snapshot, UndoStack};
use crate::validation::validate_scope;

/// Partial update for a node; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub position: Option<Position>,
    /// `Some(None)` clears the label
    pub label: Option<Option<String>>,
    pub kind: Option<NodeKind>,
}

impl NodePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, position: impl Into<Position>) -> Self {
        self.position = Some(position.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(Some(label.into()));
        self
    }

    pub fn clear_label(mut self) -> Self {
        self.label = Some(None);
        self
    }

    pub fn kind(mut self, kind: NodeKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Partial update for an edge; endpoints are not patchable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgePatch {
    pub is_conditional: Option<bool>,
    /// `Some(None)` clears the condition
    pub condition: Option<Option<EdgeCondition>>,
    /// `Some(None)` clears the label
    pub label: Option<Option<String>>,
}

impl EdgePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conditional(mut self, is_conditional: bool) -> Self {
        self.is_conditional = Some(is_conditional);
        self
    }

    pub fn condition(mut self, condition: Option<EdgeCondition>) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(Some(label.into()));
        self
    }

    pub fn clear_label(mut self) -> Self {
        self.label = Some(None);
        self
    }
}

/// Nodes and edges spliced into the parent graph by one operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Splice {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Owner of the live workflow, its ID counters and its history
pub struct GraphStore {
    workflow: Workflow,
    config: EngineConfig,
    ids: IdGenerator,
    resolver: EdgeResolver,
    history: UndoStack,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl GraphStore {
    /// Create a store over `workflow` with the default configuration
    pub fn new(workflow: Workflow) -> Self {
        Self::with_config(workflow, EngineConfig::default())
    }

    pub fn with_config(workflow: Workflow, config: EngineConfig) -> Self {
        Self {
            ids: IdGenerator::seeded(&workflow.nodes),
            resolver: EdgeResolver::new(&config.foreign_edge_prefix),
            history: UndoStack::new(config.max_undo_stack),
            workflow,
            config,
            sinks: Vec::new(),
        }
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn into_workflow(self) -> Workflow {
        self.workflow
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &EdgeResolver {
        &self.resolver
    }

    pub fn nodes(&self) -> &[Node] {
        &self.workflow.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.workflow.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.workflow.find_node(id)
    }

    /// Look up an edge by any reference encoding the resolver accepts
    pub fn edge(&self, edge_ref: &str) -> Option<&Edge> {
        self.resolver.resolve(&self.workflow, edge_ref)
    }

    /// Register a sink for change events
    pub fn subscribe(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    fn emit(&self, event: GraphEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.send(event.clone()) {
                log::warn!("Dropped graph event: {}", e);
            }
        }
    }

    /// Replace the workflow (context switch)
    ///
    /// Reseeds ID counters and clears both history stacks.
    pub fn load_workflow(&mut self, workflow: Workflow) {
        self.ids.reset();
        self.ids.seed_from(&workflow.nodes);
        self.history.clear();
        self.workflow = workflow;
        log::info!("Loaded workflow '{}'", self.workflow.id);
        self.emit(GraphEvent::WorkflowReplaced {
            workflow_id: self.workflow.id.clone(),
        });
    }

    // =========================================================================
    // Node operations
    // =========================================================================

    /// Add a node of `node_type` with its default payload
    ///
    /// Returns None for start/end when the workflow already has one.
    pub fn add_node(&mut self, node_type: NodeType, position: impl Into<Position>) -> Option<Node> {
        if node_type.is_terminal() && self.nodes().iter().any(|n| n.node_type() == node_type) {
            log::debug!("Rejected adding a second {} node", node_type);
            return None;
        }
        let id = self.ids.next_node_id(node_type, &self.workflow);
        let node = Node::with_defaults(id, node_type, position);
        self.workflow.nodes.push(node.clone());
        self.emit(GraphEvent::NodeAdded {
            node_id: node.id.clone(),
        });
        Some(node)
    }

    /// Merge `patch` into a node and optionally rename it
    ///
    /// A rename rewrites every incident edge (and branch targets) in the same
    /// step. Returns false if the node is missing, the new ID is empty or
    /// taken, or the patch would turn a node into or out of start/end.
    pub fn update_node(&mut self, id: &str, patch: NodePatch, new_id: Option<&str>) -> bool {
        let Some(current_type) = self.node(id).map(Node::node_type) else {
            log::debug!("Update rejected: node '{}' not found", id);
            return false;
        };
        if let Some(kind) = &patch.kind {
            let next_type = kind.node_type();
            let crosses_terminal = next_type.is_terminal() || current_type.is_terminal();
            if next_type != current_type && crosses_terminal {
                log::debug!(
                    "Update rejected: cannot change '{}' from {} to {}",
                    id,
                    current_type,
                    next_type
                );
                return false;
            }
        }
        let rename = new_id.filter(|n| *n != id);
        if let Some(new_id) = rename {
            if new_id.is_empty() || self.workflow.has_node(new_id) {
                log::debug!("Update rejected: ID '{}' is empty or taken", new_id);
                return false;
            }
        }

        let Some(node) = self.workflow.find_node_mut(id) else {
            return false;
        };
        if let Some(position) = patch.position {
            node.position = position;
        }
        if let Some(label) = patch.label {
            node.label = label;
        }
        if let Some(kind) = patch.kind {
            node.kind = kind;
        }
        if let Some(new_id) = rename {
            node.id = new_id.to_string();
            rename_in_edges(&mut self.workflow.edges, id, new_id);
        }

        let node_id = rename.unwrap_or(id).to_string();
        self.emit(GraphEvent::NodeUpdated {
            node_id,
            previous_id: rename.map(|_| id.to_string()),
        });
        true
    }

    /// Delete a node and every edge incident to it
    ///
    /// Start and end nodes are never removed.
    pub fn remove_node(&mut self, id: &str) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        if node.is_terminal() {
            log::debug!("Rejected removing {} node '{}'", node.node_type(), id);
            return false;
        }

        self.workflow.nodes.retain(|n| n.id != id);
        let mut removed_edges = Vec::new();
        self.workflow.edges.retain(|e| {
            let incident = e.touches(id);
            if incident {
                removed_edges.push(e.id.clone());
            }
            !incident
        });

        self.emit(GraphEvent::NodeRemoved {
            node_id: id.to_string(),
            removed_edges,
        });
        true
    }

    /// Replace a node's position; no other checks
    pub fn update_node_position(&mut self, id: &str, position: impl Into<Position>) -> bool {
        let Some(node) = self.workflow.find_node_mut(id) else {
            return false;
        };
        node.position = position.into();
        self.emit(GraphEvent::NodeMoved {
            node_id: id.to_string(),
        });
        true
    }

    /// Replace a subgraph node's inner graph
    ///
    /// Returns false for non-subgraph nodes or an inner graph that is not a
    /// consistent scope.
    pub fn update_subgraph(&mut self, id: &str, graph: Graph) -> bool {
        let errors = validate_scope(&graph);
        if !errors.is_empty() {
            log::debug!("Rejected inner graph for '{}': {} problem(s)", id, errors.len());
            return false;
        }
        let Some(inner) = self.workflow.find_node_mut(id).and_then(Node::inner_graph_mut) else {
            return false;
        };
        *inner = graph;
        self.emit(GraphEvent::SubgraphUpdated {
            subgraph_id: id.to_string(),
        });
        true
    }

    // =========================================================================
    // Edge operations
    // =========================================================================

    /// Connect two nodes under the canonical `"{source}-{target}"` ID
    ///
    /// Returns None if that edge already exists or an endpoint is missing.
    pub fn add_edge(&mut self, source: &str, target: &str, conditional: bool) -> Option<Edge> {
        let id = Edge::canonical_id(source, target);
        if self.workflow.find_edge(&id).is_some()
            || self.workflow.find_edge_by_pair(source, target).is_some()
        {
            log::debug!("Rejected duplicate edge '{}'", id);
            return None;
        }
        if !self.workflow.has_node(source) || !self.workflow.has_node(target) {
            log::debug!("Rejected edge '{}': endpoint not found", id);
            return None;
        }

        let mut edge = Edge::new(source, target);
        edge.is_conditional = conditional;
        self.workflow.edges.push(edge.clone());
        self.emit(GraphEvent::EdgeAdded { edge_id: id });
        Some(edge)
    }

    /// Delete the edge `edge_ref` resolves to
    pub fn remove_edge(&mut self, edge_ref: &str) -> bool {
        let Some(index) = self.resolver.resolve_index(&self.workflow.edges, edge_ref) else {
            return false;
        };
        let edge = self.workflow.edges.remove(index);
        self.emit(GraphEvent::EdgeRemoved { edge_id: edge.id });
        true
    }

    /// Merge `patch` into the edge `edge_ref` resolves to
    pub fn update_edge(&mut self, edge_ref: &str, patch: EdgePatch) -> bool {
        let Some(index) = self.resolver.resolve_index(&self.workflow.edges, edge_ref) else {
            return false;
        };
        let edge = &mut self.workflow.edges[index];
        if let Some(is_conditional) = patch.is_conditional {
            edge.is_conditional = is_conditional;
        }
        if let Some(condition) = patch.condition {
            edge.condition = condition;
        }
        if let Some(label) = patch.label {
            edge.label = label;
        }
        let edge_id = edge.id.clone();
        self.emit(GraphEvent::EdgeUpdated { edge_id });
        true
    }

    // =========================================================================
    // Structural transformations
    // =========================================================================

    /// Collapse the given nodes into one new subgraph node
    ///
    /// Returns the new node, or None if the selection is not groupable.
    pub fn group_nodes_as_subgraph(
        &mut self,
        node_ids: &[NodeId],
        name: &str,
        description: Option<&str>,
    ) -> Option<Node> {
        let request = GroupRequest {
            node_ids,
            name,
            description,
            subgraph_id: self.peek_subgraph_id(),
            padding: self.config.subgraph_padding,
        };
        let plan = GroupOperations::plan_group(&request, self.nodes(), self.edges())?;
        // Commit the ID only once the plan is accepted
        self.ids.next_node_id(NodeType::Subgraph, &self.workflow);

        let grouped: HashSet<&str> = plan.grouped_ids.iter().map(|s| s.as_str()).collect();
        let removed: HashSet<&EdgeId> = plan.removed_edge_ids.iter().collect();
        self.workflow.nodes.retain(|n| !grouped.contains(n.id.as_str()));
        self.workflow.edges.retain(|e| !removed.contains(&e.id));
        self.workflow.nodes.push(plan.subgraph.clone());
        self.workflow.edges.extend(plan.rewired_edges);

        log::debug!("Grouped {} nodes into '{}'", plan.grouped_ids.len(), plan.subgraph.id);
        self.emit(GraphEvent::NodesGrouped {
            subgraph_id: plan.subgraph.id.clone(),
            grouped: plan.grouped_ids,
        });
        Some(plan.subgraph)
    }

    fn peek_subgraph_id(&self) -> NodeId {
        self.ids.clone().next_node_id(NodeType::Subgraph, &self.workflow)
    }

    /// Splice a subgraph node's inner graph back into the workflow
    ///
    /// Edges that touched the subgraph node are dropped, not reconnected.
    /// Returns the spliced nodes and edges, or None if `id` is not a
    /// populated subgraph.
    pub fn expand_subgraph(&mut self, id: &str) -> Option<Splice> {
        let subgraph = self.workflow.find_node(id)?;
        let plan = GroupOperations::plan_expand(
            subgraph,
            &mut self.ids,
            &self.workflow.nodes,
            &self.workflow.edges,
        )?;

        let removed: HashSet<&EdgeId> = plan.removed_edge_ids.iter().collect();
        self.workflow.nodes.retain(|n| n.id != id);
        self.workflow.edges.retain(|e| !removed.contains(&e.id));
        self.workflow.nodes.extend(plan.nodes.iter().cloned());
        self.workflow.edges.extend(plan.edges.iter().cloned());

        log::debug!(
            "Expanded '{}' into {} nodes, dropped {} boundary edges",
            id,
            plan.nodes.len(),
            plan.removed_edge_ids.len()
        );
        self.emit(GraphEvent::SubgraphExpanded {
            subgraph_id: plan.subgraph_id,
            nodes: plan.nodes.iter().map(|n| n.id.clone()).collect(),
        });
        Some(Splice {
            nodes: plan.nodes,
            edges: plan.edges,
        })
    }

    /// Wrap a node/edge template in a new, unconnected subgraph node
    ///
    /// `offset` defaults to the configured recipe offset and `name` to
    /// `"Recipe"`. Returns None if the template is not a valid inner graph
    /// (dangling edges, duplicates, start/end nodes).
    pub fn add_recipe_to_workflow(
        &mut self,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        offset: Option<Position>,
        name: Option<&str>,
    ) -> Option<Splice> {
        let name = name.unwrap_or(crate::constants::layout::RECIPE_NAME);
        self.add_recipe(Recipe::new(name, nodes, edges), offset)
    }

    /// Insert a recipe as a new, unconnected subgraph node
    pub fn add_recipe(&mut self, recipe: Recipe, offset: Option<Position>) -> Option<Splice> {
        let errors = recipe.validate();
        if !errors.is_empty() {
            log::debug!("Rejected recipe '{}': {} problem(s)", recipe.name, errors.len());
            return None;
        }
        let id = self.ids.next_node_id(NodeType::Subgraph, &self.workflow);
        let position = offset.unwrap_or(self.config.recipe_offset);
        let node = recipe.into_subgraph(id, position, self.config.subgraph_padding);
        self.workflow.nodes.push(node.clone());

        self.emit(GraphEvent::RecipeInserted {
            subgraph_id: node.id.clone(),
        });
        Some(Splice {
            nodes: vec![node],
            edges: Vec::new(),
        })
    }

    /// Apply positions computed by a layout collaborator
    ///
    /// Returns how many nodes were moved. Unknown IDs are ignored.
    pub fn apply_layout(&mut self, engine: &dyn LayoutEngine) -> usize {
        let positions = positions_by_id(engine.layout(self.nodes(), self.edges()));
        let mut moved = 0;
        for node in &mut self.workflow.nodes {
            if let Some(position) = positions.get(&node.id) {
                node.position = *position;
                moved += 1;
            }
        }
        self.emit(GraphEvent::LayoutApplied { moved });
        moved
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Deep copy of the live nodes and edges
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.nodes(), self.edges())
    }

    /// Record the current state before a mutation; clears redo history
    pub fn push_undo(&mut self) {
        let snapshot = self.snapshot();
        if let Err(e) = self.history.push(&snapshot) {
            log::error!("Failed to record undo snapshot: {}", e);
        }
    }

    /// Restore the most recent snapshot; false if there is none
    pub fn undo(&mut self) -> bool {
        let current = self.snapshot();
        let restored = self.history.undo(&current);
        self.restore(restored, HistoryDirection::Undo)
    }

    /// Re-apply the most recently undone state; false if there is none
    pub fn redo(&mut self) -> bool {
        let current = self.snapshot();
        let restored = self.history.redo(&current);
        self.restore(restored, HistoryDirection::Redo)
    }

    fn restore(
        &mut self,
        restored: Option<crate::Result<Snapshot>>,
        direction: HistoryDirection,
    ) -> bool {
        match restored {
            None => false,
            Some(Err(e)) => {
                log::error!("Failed to restore snapshot ({:?}): {}", direction, e);
                false
            }
            Some(Ok(snapshot)) => {
                self.workflow.nodes = snapshot.nodes;
                self.workflow.edges = snapshot.edges;
                self.ids.seed_from(&self.workflow.nodes);
                self.emit(GraphEvent::HistoryRestored { direction });
                true
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_len(&self) -> usize {
        self.history.undo_len()
    }

    pub fn redo_len(&self) -> usize {
        self.history.redo_len()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

/// Point every edge endpoint and branch target at `new_id`
fn rename_in_edges(edges: &mut [Edge], old_id: &str, new_id: &str) {
    for edge in edges.iter_mut() {
        if !edge.touches(old_id) && edge.condition.is_none() {
            continue;
        }
        let had_canonical_id = edge.id == Edge::canonical_id(&edge.source, &edge.target);
        if edge.source == old_id {
            edge.source = new_id.to_string();
        }
        if edge.target == old_id {
            edge.target = new_id.to_string();
        }
        if had_canonical_id {
            edge.id = Edge::canonical_id(&edge.source, &edge.target);
        }
        if let Some(condition) = edge.condition.as_mut() {
            for value in condition.path_map.values_mut() {
                if value == old_id {
                    *value = new_id.to_string();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::WorkflowBuilder;
    use crate::events::VecEventSink;
    use crate::layout::GridLayout;
    use crate::validation::validate_workflow;
    use std::collections::BTreeMap;

    fn ids(list: &[&str]) -> Vec<NodeId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// START -> A -> B -> END with A at (100, 200) and B at (300, 400)
    fn linear_store() -> GraphStore {
        GraphStore::new(
            WorkflowBuilder::new("wf", "Linear")
                .add_node("A", NodeType::Llm, (100.0, 200.0))
                .add_node("B", NodeType::Agent, (300.0, 400.0))
                .connect("start", "A")
                .connect("A", "B")
                .connect("B", "end")
                .build(),
        )
    }

    fn edge_pairs(store: &GraphStore) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = store
            .edges()
            .iter()
            .map(|e| (e.source.clone(), e.target.clone()))
            .collect();
        pairs.sort();
        pairs
    }

    fn pair(source: &str, target: &str) -> (String, String) {
        (source.to_string(), target.to_string())
    }

    #[test]
    fn test_add_node_ids_never_collide() {
        let mut store = GraphStore::new(Workflow::new_empty("wf"));
        let types = [NodeType::Llm, NodeType::Agent, NodeType::Llm, NodeType::Lambda];
        for i in 0..40 {
            store.add_node(types[i % types.len()], (0.0, 0.0)).unwrap();
            // A rename that lands on the next counter value must not cause a clash
            if i == 10 {
                assert!(store.update_node("llm_6", NodePatch::new(), Some("llm_7")));
            }
        }

        let unique: HashSet<&str> = store.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(unique.len(), store.nodes().len());
        assert!(validate_workflow(store.workflow()).is_empty());
    }

    #[test]
    fn test_add_node_after_loading_max_counter() {
        let max_id = format!("llm_{}", u64::MAX);
        let workflow = WorkflowBuilder::new("wf", "Huge counter")
            .add_node(max_id.as_str(), NodeType::Llm, (0.0, 0.0))
            .build();
        assert!(validate_workflow(&workflow).is_empty());
        let mut store = GraphStore::new(workflow);

        let first = store.add_node(NodeType::Llm, (0.0, 0.0)).unwrap();
        let second = store.add_node(NodeType::Llm, (0.0, 0.0)).unwrap();
        assert_ne!(first.id, max_id);
        assert_ne!(first.id, second.id);
        assert!(validate_workflow(store.workflow()).is_empty());
    }

    #[test]
    fn test_add_node_applies_defaults() {
        let mut store = GraphStore::new(Workflow::new_empty("wf"));
        let node = store.add_node(NodeType::Agent, (5.0, 6.0)).unwrap();
        assert_eq!(node.id, "agent_1");
        assert_eq!(node.position, Position::new(5.0, 6.0));
        assert_eq!(node.kind, NodeKind::default_for(NodeType::Agent));
        assert!(store.edges().is_empty());

        assert!(store.add_node(NodeType::Start, (0.0, 0.0)).is_none());
        assert!(store.add_node(NodeType::End, (0.0, 0.0)).is_none());
    }

    #[test]
    fn test_add_edge_rejects_duplicates_and_dangling() {
        let mut store = linear_store();
        assert!(store.add_edge("A", "B", false).is_none());
        assert!(store.add_edge("A", "ghost", false).is_none());

        let edge = store.add_edge("start", "B", true).unwrap();
        assert_eq!(edge.id, "start-B");
        assert!(edge.is_conditional);
        assert!(store.add_edge("start", "B", false).is_none());
    }

    #[test]
    fn test_update_node_rename_rewrites_edges() {
        let mut path_map = BTreeMap::new();
        path_map.insert("go".to_string(), "A".to_string());
        let mut store = linear_store();
        assert!(store.update_edge(
            "start-A",
            EdgePatch::new().conditional(true).condition(Some(EdgeCondition {
                condition_path: "route".to_string(),
                path_map,
            }))
        ));

        assert!(store.update_node("A", NodePatch::new().label("First"), Some("first")));

        assert!(store.node("A").is_none());
        assert_eq!(store.node("first").unwrap().label.as_deref(), Some("First"));
        assert_eq!(
            edge_pairs(&store),
            vec![pair("B", "end"), pair("first", "B"), pair("start", "first")]
        );
        let edge = store.edge("start-first").unwrap();
        assert_eq!(edge.condition.as_ref().unwrap().path_map["go"], "first");
        assert!(validate_workflow(store.workflow()).is_empty());
    }

    #[test]
    fn test_update_node_rejections() {
        let mut store = linear_store();
        assert!(!store.update_node("ghost", NodePatch::new(), None));
        assert!(!store.update_node("A", NodePatch::new(), Some("B")));
        assert!(!store.update_node("A", NodePatch::new(), Some("")));
        assert!(!store.update_node("A", NodePatch::new().kind(NodeKind::Start), None));
        assert!(!store.update_node(
            "start",
            NodePatch::new().kind(NodeKind::default_for(NodeType::Llm)),
            None
        ));

        // Same-ID rename is just an update
        assert!(store.update_node("A", NodePatch::new().position((1.0, 1.0)), Some("A")));
        assert_eq!(store.node("A").unwrap().position, Position::new(1.0, 1.0));

        // Changing payload within non-terminal types is allowed
        let lambda = NodePatch::new().kind(NodeKind::default_for(NodeType::Lambda));
        assert!(store.update_node("A", lambda, None));
        assert_eq!(store.node("A").unwrap().node_type(), NodeType::Lambda);
    }

    #[test]
    fn test_remove_node_cascades_exactly() {
        let mut store = linear_store();
        store.add_edge("start", "B", false).unwrap();

        assert!(store.remove_node("A"));
        assert_eq!(edge_pairs(&store), vec![pair("B", "end"), pair("start", "B")]);
        assert!(!store.remove_node("A"));
    }

    #[test]
    fn test_remove_terminal_nodes_rejected() {
        let mut store = linear_store();
        assert!(!store.remove_node("start"));
        assert!(!store.remove_node("end"));
        assert_eq!(store.nodes().len(), 4);
        assert_eq!(store.edges().len(), 3);
    }

    #[test]
    fn test_edge_operations_resolve_references() {
        let mut store = linear_store();

        assert!(store.update_edge("xy-edge__A-B", EdgePatch::new().label("next")));
        assert_eq!(store.edge("A-B").unwrap().label.as_deref(), Some("next"));
        assert!(store.update_edge("A-B", EdgePatch::new().clear_label()));
        assert!(store.edge("A-B").unwrap().label.is_none());

        assert!(!store.update_edge("nope", EdgePatch::new().label("x")));
        assert!(!store.remove_edge("B-A"));

        assert!(store.remove_edge("xy-edge__B-end"));
        assert_eq!(store.edges().len(), 2);
    }

    #[test]
    fn test_group_concrete_scenario() {
        let mut store = linear_store();
        let grp = store
            .group_nodes_as_subgraph(&ids(&["A", "B"]), "grp", None)
            .unwrap();

        let node_ids: HashSet<&str> = store.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(node_ids, ["start", grp.id.as_str(), "end"].into_iter().collect());
        assert_eq!(
            edge_pairs(&store),
            vec![pair("start", &grp.id), pair(&grp.id, "end")]
        );

        let inner = grp.inner_graph().unwrap();
        assert_eq!(inner.find_node("A").unwrap().position, Position::new(20.0, 20.0));
        assert_eq!(inner.find_node("B").unwrap().position, Position::new(220.0, 220.0));
        assert_eq!(inner.edges.len(), 1);
        assert!(inner.edges[0].connects("A", "B"));
        assert!(validate_workflow(store.workflow()).is_empty());
    }

    #[test]
    fn test_group_dedups_incoming_from_same_source() {
        let mut store = GraphStore::new(
            WorkflowBuilder::new("wf", "Fan")
                .add_node("A", NodeType::Llm, (0.0, 100.0))
                .add_node("B", NodeType::Llm, (100.0, 100.0))
                .connect("start", "A")
                .connect("start", "B")
                .connect("A", "end")
                .connect("B", "end")
                .build(),
        );
        let grp = store
            .group_nodes_as_subgraph(&ids(&["A", "B"]), "grp", Some("fan"))
            .unwrap();

        assert_eq!(store.edges().len(), 2);
        assert_eq!(store.workflow().incoming_edges(&grp.id).count(), 1);
        assert_eq!(store.workflow().outgoing_edges(&grp.id).count(), 1);
        match &grp.kind {
            NodeKind::Subgraph(config) => assert_eq!(config.description.as_deref(), Some("fan")),
            other => panic!("Expected subgraph, got {:?}", other),
        }
    }

    #[test]
    fn test_rejected_group_leaves_graph_untouched() {
        let mut store = linear_store();
        let before = store.snapshot();

        assert!(store.group_nodes_as_subgraph(&ids(&["A"]), "g", None).is_none());
        assert!(store.group_nodes_as_subgraph(&ids(&["A", "start"]), "g", None).is_none());
        assert_eq!(store.snapshot(), before);

        // A rejected grouping does not burn a subgraph ID
        let grp = store.group_nodes_as_subgraph(&ids(&["A", "B"]), "g", None).unwrap();
        assert_eq!(grp.id, "subgraph_1");
    }

    #[test]
    fn test_group_expand_round_trip() {
        let mut store = GraphStore::new(
            WorkflowBuilder::new("wf", "Diamond")
                .add_node("A", NodeType::Branch, (0.0, 100.0))
                .add_node("B", NodeType::Llm, (-100.0, 200.0))
                .add_node("C", NodeType::Llm, (100.0, 200.0))
                .add_node("D", NodeType::Lambda, (0.0, 300.0))
                .connect("start", "A")
                .connect("A", "B")
                .connect("A", "C")
                .connect("B", "D")
                .connect("C", "D")
                .connect("D", "end")
                .build(),
        );
        let original: Vec<Node> = store.nodes()[2..].to_vec();

        let grp = store
            .group_nodes_as_subgraph(&ids(&["A", "B", "C", "D"]), "diamond", None)
            .unwrap();
        let splice = store.expand_subgraph(&grp.id).unwrap();

        // Same internal structure under new IDs
        assert_eq!(splice.nodes.len(), 4);
        assert_eq!(splice.edges.len(), 4);
        let renamed = |old: &str| {
            splice
                .nodes
                .iter()
                .find(|n| n.id.starts_with(&format!("{}_", old)))
                .unwrap()
                .id
                .clone()
        };
        for (source, target) in [("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")] {
            assert!(store.edge(&Edge::canonical_id(&renamed(source), &renamed(target))).is_some());
        }

        // Relative layout survives: offsets between nodes are unchanged
        let a = store.node(&renamed("A")).unwrap().position;
        let d = store.node(&renamed("D")).unwrap().position;
        assert_eq!(d.y - a.y, original[3].position.y - original[0].position.y);

        // External connectivity is intentionally not restored
        assert!(store.node(&grp.id).is_none());
        assert_eq!(store.workflow().outgoing_edges("start").count(), 0);
        assert_eq!(store.workflow().incoming_edges("end").count(), 0);
        assert!(validate_workflow(store.workflow()).is_empty());
    }

    #[test]
    fn test_expand_rejects_non_subgraph() {
        let mut store = linear_store();
        assert!(store.expand_subgraph("A").is_none());
        assert!(store.expand_subgraph("ghost").is_none());

        let empty = store.add_node(NodeType::Subgraph, (0.0, 0.0)).unwrap();
        assert!(store.expand_subgraph(&empty.id).is_none());
    }

    #[test]
    fn test_recipe_lands_disconnected() {
        let mut store = linear_store();
        let before_edges = store.edges().to_vec();

        let splice = store.add_recipe_to_workflow(
            vec![
                Node::with_defaults("x", NodeType::Llm, (900.0, 900.0)),
                Node::with_defaults("y", NodeType::Llm, (900.0, 1000.0)),
            ],
            vec![Edge::new("x", "y")],
            None,
            None,
        )
        .unwrap();

        assert_eq!(splice.nodes.len(), 1);
        assert!(splice.edges.is_empty());
        let node = &splice.nodes[0];
        assert_eq!(node.position, Position::new(250.0, 250.0));
        assert_eq!(node.label.as_deref(), Some("Recipe"));
        assert_eq!(
            node.inner_graph().unwrap().find_node("y").unwrap().position,
            Position::new(20.0, 120.0)
        );
        assert_eq!(store.edges(), &before_edges[..]);
        assert!(store.node(&node.id).is_some());

        let second = store
            .add_recipe_to_workflow(Vec::new(), Vec::new(), Some((1.0, 2.0).into()), Some("Empty"))
            .unwrap();
        assert_ne!(second.nodes[0].id, node.id);
        assert_eq!(second.nodes[0].position, Position::new(1.0, 2.0));
    }

    #[test]
    fn test_terminal_nodes_never_reach_inner_graphs() {
        let mut store = linear_store();
        let before = store.snapshot();

        let with_start = vec![
            Node::with_defaults("begin", NodeType::Start, (0.0, 0.0)),
            Node::with_defaults("x", NodeType::Llm, (0.0, 100.0)),
        ];
        assert!(store
            .add_recipe_to_workflow(with_start, vec![Edge::new("begin", "x")], None, None)
            .is_none());
        let dangling = vec![Node::with_defaults("x", NodeType::Llm, (0.0, 0.0))];
        assert!(store
            .add_recipe_to_workflow(dangling, vec![Edge::new("x", "ghost")], None, None)
            .is_none());
        assert_eq!(store.snapshot(), before);

        let grp = store.group_nodes_as_subgraph(&ids(&["A", "B"]), "grp", None).unwrap();
        let with_end = WorkflowBuilder::bare("-", "grp")
            .add_node("finish", NodeType::End, (0.0, 0.0))
            .build_graph();
        assert!(!store.update_subgraph(&grp.id, with_end));
        assert_eq!(store.node(&grp.id), Some(&grp));
    }

    #[test]
    fn test_expand_refuses_terminal_nodes_from_loaded_data() {
        // Loaded data bypasses the editing checks
        let inner = WorkflowBuilder::bare("-", "inner")
            .add_node("begin", NodeType::Start, (0.0, 0.0))
            .add_node("x", NodeType::Llm, (0.0, 100.0))
            .build_graph();
        let workflow = WorkflowBuilder::new("wf", "Loaded")
            .add_node_with_kind(
                "subgraph_1",
                NodeKind::Subgraph(crate::types::SubgraphConfig {
                    description: None,
                    inner_graph: inner,
                }),
                (0.0, 200.0),
            )
            .build();
        let mut store = GraphStore::new(workflow);

        assert!(store.expand_subgraph("subgraph_1").is_none());
        let starts = store.nodes().iter().filter(|n| n.node_type() == NodeType::Start).count();
        assert_eq!(starts, 1);
        assert!(store.node("subgraph_1").is_some());
    }

    #[test]
    fn test_update_subgraph() {
        let mut store = linear_store();
        let grp = store.group_nodes_as_subgraph(&ids(&["A", "B"]), "grp", None).unwrap();

        let replacement = WorkflowBuilder::bare("-", "grp")
            .add_node("only", NodeType::Lambda, (20.0, 20.0))
            .build_graph();
        assert!(store.update_subgraph(&grp.id, replacement));
        assert_eq!(store.node(&grp.id).unwrap().inner_graph().unwrap().nodes.len(), 1);

        let broken = WorkflowBuilder::bare("-", "grp").connect("a", "b").build_graph();
        assert!(!store.update_subgraph(&grp.id, broken));
        assert!(!store.update_subgraph("start", Graph::new("x")));
    }

    #[test]
    fn test_undo_redo_symmetry() {
        let mut store = linear_store();
        let before = store.snapshot();

        store.push_undo();
        store.group_nodes_as_subgraph(&ids(&["A", "B"]), "grp", None).unwrap();
        let after = store.snapshot();

        assert!(store.undo());
        assert_eq!(store.snapshot(), before);
        assert!(store.redo());
        assert_eq!(store.snapshot(), after);
        assert!(!store.redo());
    }

    #[test]
    fn test_multi_step_gesture_is_one_entry() {
        let mut store = linear_store();
        let before = store.snapshot();

        store.push_undo();
        store.update_node_position("A", (0.0, 0.0));
        store.update_node_position("B", (10.0, 10.0));
        store.remove_edge("A-B");

        assert_eq!(store.undo_len(), 1);
        assert!(store.undo());
        assert_eq!(store.snapshot(), before);
        assert!(!store.undo());
    }

    #[test]
    fn test_new_push_discards_redo() {
        let mut store = linear_store();
        store.push_undo();
        store.remove_node("A");
        assert!(store.undo());
        assert!(store.can_redo());

        store.push_undo();
        store.remove_node("B");
        assert!(!store.can_redo());
        assert!(!store.redo());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut store = GraphStore::new(Workflow::new_empty("wf"));
        for i in 0..60 {
            store.push_undo();
            store.update_node_position("start", (i as f64, 0.0));
        }
        assert_eq!(store.undo_len(), 50);

        let mut steps = 0;
        while store.undo() {
            steps += 1;
        }
        assert_eq!(steps, 50);
        // Oldest reachable state is the one pushed before move #10
        assert_eq!(store.node("start").unwrap().position, Position::new(9.0, 0.0));
    }

    #[test]
    fn test_ids_stay_unique_after_undo() {
        let mut store = GraphStore::new(Workflow::new_empty("wf"));
        store.add_node(NodeType::Llm, (0.0, 0.0)).unwrap();
        store.push_undo();
        store.remove_node("llm_1");
        store.add_node(NodeType::Llm, (0.0, 0.0)).unwrap();
        assert!(store.undo());

        let next = store.add_node(NodeType::Llm, (0.0, 0.0)).unwrap();
        assert_ne!(next.id, "llm_1");
    }

    #[test]
    fn test_load_workflow_clears_history() {
        let mut store = linear_store();
        store.push_undo();
        store.remove_node("A");

        let replacement = WorkflowBuilder::new("wf-2", "Other")
            .add_node("llm_4", NodeType::Llm, (0.0, 0.0))
            .build();
        store.load_workflow(replacement);

        assert!(!store.can_undo());
        assert!(!store.can_redo());
        assert_eq!(store.workflow().id, "wf-2");
        assert_eq!(store.add_node(NodeType::Llm, (0.0, 0.0)).unwrap().id, "llm_5");
    }

    #[test]
    fn test_apply_layout() {
        let mut store = linear_store();
        let moved = store.apply_layout(&GridLayout::default());
        assert_eq!(moved, 4);
        assert_eq!(store.node("start").unwrap().position, Position::new(0.0, 0.0));
        assert_eq!(store.node("A").unwrap().position, Position::new(500.0, 0.0));
        assert_eq!(store.edges().len(), 3);
    }

    #[test]
    fn test_events_follow_applied_mutations_only() {
        let sink = Arc::new(VecEventSink::new());
        let mut store = linear_store();
        store.subscribe(sink.clone());

        store.remove_node("start");
        store.add_edge("A", "B", false);
        assert!(sink.events().is_empty());

        store.remove_node("A");
        store.push_undo();
        store.add_node(NodeType::Lambda, (0.0, 0.0));
        store.undo();

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            GraphEvent::NodeRemoved {
                node_id: "A".to_string(),
                removed_edges: vec!["start-A".to_string(), "A-B".to_string()],
            }
        );
        assert!(matches!(events[1], GraphEvent::NodeAdded { .. }));
        assert_eq!(
            events[2],
            GraphEvent::HistoryRestored {
                direction: HistoryDirection::Undo
            }
        );
    }

    #[test]
    fn test_no_dangling_edges_through_mixed_operations() {
        let mut store = linear_store();
        let c = store.add_node(NodeType::Lambda, (500.0, 500.0)).unwrap();
        store.add_edge("B", &c.id, false).unwrap();
        store.add_edge(&c.id, "end", false).unwrap();

        store.push_undo();
        let grp = store.group_nodes_as_subgraph(&ids(&["B", c.id.as_str()]), "grp", None).unwrap();
        assert!(validate_workflow(store.workflow()).is_empty());

        store.update_node(&grp.id, NodePatch::new(), Some("renamed"));
        assert!(validate_workflow(store.workflow()).is_empty());

        store.expand_subgraph("renamed").unwrap();
        assert!(validate_workflow(store.workflow()).is_empty());

        store.remove_node("A");
        assert!(validate_workflow(store.workflow()).is_empty());

        assert!(store.undo());
        assert!(validate_workflow(store.workflow()).is_empty());
    }

    #[test]
    fn test_custom_config() {
        let config = EngineConfig {
            max_undo_stack: 2,
            subgraph_padding: 0.0,
            recipe_offset: Position::new(0.0, 0.0),
            foreign_edge_prefix: "rf".to_string(),
        };
        let mut store = GraphStore::with_config(linear_store().into_workflow(), config);

        assert!(store.edge("rf__A-B").is_some());
        assert!(store.edge("xy-edge__A-B").is_none());

        for _ in 0..5 {
            store.push_undo();
        }
        assert_eq!(store.undo_len(), 2);

        let grp = store.group_nodes_as_subgraph(&ids(&["A", "B"]), "grp", None).unwrap();
        assert_eq!(
            grp.inner_graph().unwrap().find_node("A").unwrap().position,
            Position::new(0.0, 0.0)
        );
    }
}
