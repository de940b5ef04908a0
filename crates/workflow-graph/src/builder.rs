//! Fluent builder for workflows and nested graphs
//!
//! Provides a terse API for constructing graphs programmatically.

use crate::constants;
use crate::types::{Edge, EdgeCondition, Graph, Node, NodeKind, NodeType, Position, Workflow};

/// Fluent builder for workflows and inner graphs
///
/// # Example
///
/// ```
/// use workflow_graph::builder::WorkflowBuilder;
/// use workflow_graph::types::NodeType;
///
/// let workflow = WorkflowBuilder::new("wf-1", "My Workflow")
///     .add_node("llm_1", NodeType::Llm, (0.0, 100.0))
///     .with_label("Summarize")
///     .connect("start", "llm_1")
///     .connect("llm_1", "end")
///     .build();
/// assert_eq!(workflow.nodes.len(), 3);
/// ```
pub struct WorkflowBuilder {
    id: String,
    name: String,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl WorkflowBuilder {
    /// Create a builder pre-populated with the `start` and `end` nodes
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::bare(id, name)
            .add_node_with_kind(constants::nodes::START_ID, NodeKind::Start, (0.0, 0.0))
            .add_node_with_kind(constants::nodes::END_ID, NodeKind::End, (0.0, 400.0))
    }

    /// Create a builder with no nodes, for inner graphs and recipes
    pub fn bare(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Add a node with the default payload for its type
    pub fn add_node(
        self,
        id: impl Into<String>,
        node_type: NodeType,
        position: impl Into<Position>,
    ) -> Self {
        self.add_node_with_kind(id, NodeKind::default_for(node_type), position)
    }

    /// Add a node with an explicit payload
    pub fn add_node_with_kind(
        mut self,
        id: impl Into<String>,
        kind: NodeKind,
        position: impl Into<Position>,
    ) -> Self {
        self.nodes.push(Node::new(id, kind, position));
        self
    }

    /// Set the label on the most recently added node
    ///
    /// Must be called immediately after `add_node`.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            node.label = Some(label.into());
        }
        self
    }

    /// Add an unconditional edge with the canonical ID
    pub fn connect(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.edges.push(Edge::new(source, target));
        self
    }

    /// Add a conditional edge with the canonical ID
    pub fn connect_conditional(
        mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        condition: Option<EdgeCondition>,
    ) -> Self {
        self.edges.push(Edge::new(source, target).conditional(condition));
        self
    }

    /// Add a prebuilt edge as-is
    pub fn add_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Build the workflow without validation
    pub fn build(self) -> Workflow {
        let mut workflow = Workflow::new(self.id, self.name);
        workflow.nodes = self.nodes;
        workflow.edges = self.edges;
        workflow
    }

    /// Build a nested graph named after the builder, without validation
    pub fn build_graph(self) -> Graph {
        Graph {
            name: self.name,
            nodes: self.nodes,
            edges: self.edges,
        }
    }
}
