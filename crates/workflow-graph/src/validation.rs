//! Structural validation for workflows and nested scopes
//!
//! The editing operations keep these invariants on their own; validation
//! exists for data entering from outside (loads, recipes, inner graph
//! replacement) and for tests.

use std::collections::HashSet;

use crate::types::{Edge, Graph, Node, NodeId, NodeType, Workflow};

/// Validation error with location context
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Two nodes in one scope share an ID
    DuplicateNodeId { node_id: NodeId },
    /// Two edges in one scope share an ID
    DuplicateEdgeId { edge_id: String },
    /// Two edges connect the same ordered pair
    DuplicateEdgePair { source: NodeId, target: NodeId },
    /// An edge references a node missing from its scope
    UnknownNode { edge_id: String, node_id: NodeId },
    /// Workflow has no start node
    MissingStartNode,
    /// Workflow has no end node
    MissingEndNode,
    /// Workflow has more than one start node
    MultipleStartNodes,
    /// Workflow has more than one end node
    MultipleEndNodes,
    /// A start or end node inside a nested scope
    TerminalInScope { node_id: NodeId, node_type: NodeType },
    /// A problem inside a subgraph's inner graph
    InSubgraph {
        subgraph_id: NodeId,
        error: Box<ValidationError>,
    },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateNodeId { node_id } => write!(f, "Duplicate node ID '{}'", node_id),
            Self::DuplicateEdgeId { edge_id } => write!(f, "Duplicate edge ID '{}'", edge_id),
            Self::DuplicateEdgePair { source, target } => {
                write!(f, "More than one edge from '{}' to '{}'", source, target)
            }
            Self::UnknownNode { edge_id, node_id } => {
                write!(f, "Edge '{}' references unknown node '{}'", edge_id, node_id)
            }
            Self::MissingStartNode => write!(f, "Workflow has no start node"),
            Self::MissingEndNode => write!(f, "Workflow has no end node"),
            Self::MultipleStartNodes => write!(f, "Workflow has multiple start nodes"),
            Self::MultipleEndNodes => write!(f, "Workflow has multiple end nodes"),
            Self::TerminalInScope { node_id, node_type } => {
                write!(f, "Nested scope holds {} node '{}'", node_type, node_id)
            }
            Self::InSubgraph { subgraph_id, error } => {
                write!(f, "In subgraph '{}': {}", subgraph_id, error)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a top-level workflow
///
/// Returns all validation errors found (not just the first).
pub fn validate_workflow(workflow: &Workflow) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_start_end_presence(&workflow.nodes, &mut errors);
    validate_nodes_and_edges(&workflow.nodes, &workflow.edges, &mut errors);

    errors
}

/// Validate a nested graph on its own
///
/// Inner scopes have no start/end requirement, and may not hold start or
/// end nodes at all: expanding them would splice a second one into the
/// workflow.
pub fn validate_scope(graph: &Graph) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for node in graph.nodes.iter().filter(|n| n.is_terminal()) {
        errors.push(ValidationError::TerminalInScope {
            node_id: node.id.clone(),
            node_type: node.node_type(),
        });
    }
    validate_nodes_and_edges(&graph.nodes, &graph.edges, &mut errors);
    errors
}

fn validate_nodes_and_edges(nodes: &[Node], edges: &[Edge], errors: &mut Vec<ValidationError>) {
    validate_unique_nodes(nodes, errors);
    validate_edge_references(nodes, edges, errors);
    validate_unique_edges(edges, errors);

    for node in nodes {
        if let Some(inner) = node.inner_graph() {
            for error in validate_scope(inner) {
                errors.push(ValidationError::InSubgraph {
                    subgraph_id: node.id.clone(),
                    error: Box::new(error),
                });
            }
        }
    }
}

fn validate_unique_nodes(nodes: &[Node], errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for node in nodes {
        if !seen.insert(node.id.as_str()) {
            errors.push(ValidationError::DuplicateNodeId {
                node_id: node.id.clone(),
            });
        }
    }
}

/// Check that all edge source/target nodes exist in the same scope
fn validate_edge_references(nodes: &[Node], edges: &[Edge], errors: &mut Vec<ValidationError>) {
    let node_ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();

    for edge in edges {
        for endpoint in [&edge.source, &edge.target] {
            if !node_ids.contains(endpoint.as_str()) {
                errors.push(ValidationError::UnknownNode {
                    edge_id: edge.id.clone(),
                    node_id: endpoint.clone(),
                });
            }
        }
    }
}

fn validate_unique_edges(edges: &[Edge], errors: &mut Vec<ValidationError>) {
    let mut ids = HashSet::new();
    let mut pairs = HashSet::new();
    for edge in edges {
        if !ids.insert(edge.id.as_str()) {
            errors.push(ValidationError::DuplicateEdgeId {
                edge_id: edge.id.clone(),
            });
        }
        if !pairs.insert((edge.source.as_str(), edge.target.as_str())) {
            errors.push(ValidationError::DuplicateEdgePair {
                source: edge.source.clone(),
                target: edge.target.clone(),
            });
        }
    }
}

fn validate_start_end_presence(nodes: &[Node], errors: &mut Vec<ValidationError>) {
    let count = |node_type: NodeType| nodes.iter().filter(|n| n.node_type() == node_type).count();

    match count(NodeType::Start) {
        0 => errors.push(ValidationError::MissingStartNode),
        1 => {}
        _ => errors.push(ValidationError::MultipleStartNodes),
    }
    match count(NodeType::End) {
        0 => errors.push(ValidationError::MissingEndNode),
        1 => {}
        _ => errors.push(ValidationError::MultipleEndNodes),
    }
}
