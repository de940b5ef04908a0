//! Core types for workflow graphs
//!
//! These types define the structure of workflow graphs: nodes with typed
//! payloads, edges with optional branch conditions, nested subgraph scopes
//! and the top-level workflow.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants;

/// Unique identifier for a node within one scope
pub type NodeId = String;

/// Unique identifier for an edge within one scope
pub type EdgeId = String;

/// Position on the canvas
///
/// Opaque to the engine beyond storage and translation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Shift this position by `(dx, dy)`
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// The kind of a node, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Entry point. Exactly one per workflow.
    Start,
    /// Exit point. Exactly one per workflow.
    End,
    /// Input data declaration
    Data,
    /// Output declaration
    Output,
    /// Single LLM call
    Llm,
    /// Tool-using agent loop
    Agent,
    /// Reference to a user function
    Lambda,
    /// Nested graph
    Subgraph,
    /// Conditional routing
    Branch,
    /// Weighted random routing
    WeightedSampler,
}

impl NodeType {
    /// Every node type, in declaration order
    pub const ALL: [NodeType; 10] = [
        NodeType::Start,
        NodeType::End,
        NodeType::Data,
        NodeType::Output,
        NodeType::Llm,
        NodeType::Agent,
        NodeType::Lambda,
        NodeType::Subgraph,
        NodeType::Branch,
        NodeType::WeightedSampler,
    ];

    /// The snake_case name used in IDs and on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Start => "start",
            NodeType::End => "end",
            NodeType::Data => "data",
            NodeType::Output => "output",
            NodeType::Llm => "llm",
            NodeType::Agent => "agent",
            NodeType::Lambda => "lambda",
            NodeType::Subgraph => "subgraph",
            NodeType::Branch => "branch",
            NodeType::WeightedSampler => "weighted_sampler",
        }
    }

    /// Start and end nodes can be neither removed nor grouped
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeType::Start | NodeType::End)
    }

    /// Whether a node of this type may be collapsed into a subgraph
    pub fn is_groupable(&self) -> bool {
        !matches!(
            self,
            NodeType::Start | NodeType::End | NodeType::Data | NodeType::Output
        )
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model settings shared by LLM and agent nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelConfig {
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: Some(0.7),
            max_tokens: None,
        }
    }
}

/// Payload of a data node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataConfig {
    /// Declared input fields and their default values
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Payload of an output node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputConfig {
    /// State keys surfaced as workflow output
    pub output_keys: Vec<String>,
}

/// Payload of an LLM node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmConfig {
    pub model: ModelConfig,
    pub system_prompt: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
}

/// Payload of an agent node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    pub model: ModelConfig,
    pub system_prompt: String,
    pub tools: Vec<String>,
    pub max_iterations: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            system_prompt: String::new(),
            tools: Vec::new(),
            max_iterations: 10,
        }
    }
}

/// Payload of a lambda node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LambdaConfig {
    /// Reference to the function the runtime resolves
    pub function_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Payload of a branch node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BranchConfig {
    /// Function deciding which conditional edge path to follow
    pub function_ref: String,
}

/// Payload of a weighted sampler node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeightedSamplerConfig {
    /// Relative weight per outgoing path
    pub weights: BTreeMap<String, f64>,
}

/// Payload of a subgraph node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubgraphConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Independent nested scope owned by this node
    pub inner_graph: Graph,
}

/// A node's type together with its type-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "nodeType", content = "data", rename_all = "snake_case")]
pub enum NodeKind {
    Start,
    End,
    Data(DataConfig),
    Output(OutputConfig),
    Llm(LlmConfig),
    Agent(AgentConfig),
    Lambda(LambdaConfig),
    Subgraph(SubgraphConfig),
    Branch(BranchConfig),
    WeightedSampler(WeightedSamplerConfig),
}

impl NodeKind {
    /// The default payload for a freshly added node of the given type
    pub fn default_for(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Start => NodeKind::Start,
            NodeType::End => NodeKind::End,
            NodeType::Data => NodeKind::Data(DataConfig::default()),
            NodeType::Output => NodeKind::Output(OutputConfig::default()),
            NodeType::Llm => NodeKind::Llm(LlmConfig::default()),
            NodeType::Agent => NodeKind::Agent(AgentConfig::default()),
            NodeType::Lambda => NodeKind::Lambda(LambdaConfig::default()),
            NodeType::Subgraph => NodeKind::Subgraph(SubgraphConfig {
                description: None,
                inner_graph: Graph::new("Subgraph"),
            }),
            NodeType::Branch => NodeKind::Branch(BranchConfig::default()),
            NodeType::WeightedSampler => {
                NodeKind::WeightedSampler(WeightedSamplerConfig::default())
            }
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Start => NodeType::Start,
            NodeKind::End => NodeType::End,
            NodeKind::Data(_) => NodeType::Data,
            NodeKind::Output(_) => NodeType::Output,
            NodeKind::Llm(_) => NodeType::Llm,
            NodeKind::Agent(_) => NodeType::Agent,
            NodeKind::Lambda(_) => NodeType::Lambda,
            NodeKind::Subgraph(_) => NodeType::Subgraph,
            NodeKind::Branch(_) => NodeType::Branch,
            NodeKind::WeightedSampler(_) => NodeType::WeightedSampler,
        }
    }
}

/// A node instance in a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique identifier within the node's scope
    pub id: NodeId,
    /// Position in the UI
    pub position: Position,
    /// Optional display label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Type and payload
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind, position: impl Into<Position>) -> Self {
        Self {
            id: id.into(),
            position: position.into(),
            label: None,
            kind,
        }
    }

    /// Create a node with the default payload for its type
    pub fn with_defaults(
        id: impl Into<String>,
        node_type: NodeType,
        position: impl Into<Position>,
    ) -> Self {
        Self::new(id, NodeKind::default_for(node_type), position)
    }

    /// Set the display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn is_terminal(&self) -> bool {
        self.node_type().is_terminal()
    }

    pub fn is_groupable(&self) -> bool {
        self.node_type().is_groupable()
    }

    /// The nested graph of a subgraph node
    pub fn inner_graph(&self) -> Option<&Graph> {
        match &self.kind {
            NodeKind::Subgraph(config) => Some(&config.inner_graph),
            _ => None,
        }
    }

    /// The nested graph of a subgraph node (mutable)
    pub fn inner_graph_mut(&mut self) -> Option<&mut Graph> {
        match &mut self.kind {
            NodeKind::Subgraph(config) => Some(&mut config.inner_graph),
            _ => None,
        }
    }
}

/// Branch routing attached to a conditional edge
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeCondition {
    /// State path the branch function reads
    pub condition_path: String,
    /// Branch outcome to target node
    #[serde(default)]
    pub path_map: BTreeMap<String, NodeId>,
}

/// A directed edge between two nodes of the same scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Unique identifier for this edge
    pub id: EdgeId,
    /// Source node ID
    pub source: NodeId,
    /// Target node ID
    pub target: NodeId,
    #[serde(default)]
    pub is_conditional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<EdgeCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Edge {
    /// Create an unconditional edge with the canonical ID
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: Self::canonical_id(&source, &target),
            source,
            target,
            is_conditional: false,
            condition: None,
            label: None,
        }
    }

    /// The store's own `"{source}-{target}"` identifier
    pub fn canonical_id(source: &str, target: &str) -> EdgeId {
        format!("{}{}{}", source, constants::edges::PAIR_SEPARATOR, target)
    }

    pub fn conditional(mut self, condition: Option<EdgeCondition>) -> Self {
        self.is_conditional = true;
        self.condition = condition;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }

    pub fn connects(&self, source: &str, target: &str) -> bool {
        self.source == source && self.target == target
    }
}

/// Read access shared by the top-level workflow and nested inner graphs
pub trait GraphScope {
    fn nodes(&self) -> &[Node];
    fn edges(&self) -> &[Edge];

    /// Find a node by ID
    fn find_node(&self, id: &str) -> Option<&Node> {
        self.nodes().iter().find(|n| n.id == id)
    }

    fn has_node(&self, id: &str) -> bool {
        self.find_node(id).is_some()
    }

    /// Find an edge by its exact ID
    fn find_edge(&self, id: &str) -> Option<&Edge> {
        self.edges().iter().find(|e| e.id == id)
    }

    /// Find the edge connecting `source` to `target`
    fn find_edge_by_pair(&self, source: &str, target: &str) -> Option<&Edge> {
        self.edges().iter().find(|e| e.connects(source, target))
    }

    /// Get edges coming into a node
    fn incoming_edges<'a>(&'a self, node_id: &'a str) -> Box<dyn Iterator<Item = &'a Edge> + 'a> {
        Box::new(self.edges().iter().filter(move |e| e.target == node_id))
    }

    /// Get edges going out of a node
    fn outgoing_edges<'a>(&'a self, node_id: &'a str) -> Box<dyn Iterator<Item = &'a Edge> + 'a> {
        Box::new(self.edges().iter().filter(move |e| e.source == node_id))
    }
}

/// A nested graph owned by a subgraph node
///
/// Node IDs are scoped to this graph and may collide with IDs in the parent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

impl GraphScope for Graph {
    fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    fn edges(&self) -> &[Edge] {
        &self.edges
    }
}

/// The top-level workflow being edited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Unique identifier for this workflow
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Nodes in the top-level scope
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Edges between top-level nodes
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Auxiliary configuration the engine carries without interpreting
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Workflow {
    /// Create a workflow with no nodes at all
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Create a fresh workflow holding only the start and end nodes
    pub fn new_empty(name: impl Into<String>) -> Self {
        let mut workflow = Self::new(uuid::Uuid::new_v4().to_string(), name);
        workflow.nodes.push(Node::new(
            constants::nodes::START_ID,
            NodeKind::Start,
            (0.0, 0.0),
        ));
        workflow.nodes.push(Node::new(
            constants::nodes::END_ID,
            NodeKind::End,
            (0.0, 400.0),
        ));
        workflow
    }

    /// Find a node by ID (mutable)
    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }
}

impl GraphScope for Workflow {
    fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    fn edges(&self) -> &[Edge] {
        &self.edges
    }
}
