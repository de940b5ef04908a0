//! Recipes: reusable node/edge templates inserted as subgraphs
//!
//! A recipe is treated as the inner graph of a brand-new subgraph node. Its
//! positions are normalized the same way grouping normalizes a selection,
//! and the resulting node always lands disconnected from the parent graph.

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::groups::normalize_positions;
use crate::types::{Edge, Graph, Node, NodeId, NodeKind, Position, SubgraphConfig};
use crate::validation::{validate_scope, ValidationError};

/// A node/edge template supplied by a recipe collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Recipe {
    pub fn new(name: impl Into<String>, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            name: name.into(),
            description: None,
            nodes,
            edges,
        }
    }

    /// Parse a recipe and check its nodes and edges form a consistent scope
    pub fn from_json_str(json: &str) -> Result<Self> {
        let recipe: Self = serde_json::from_str(json)?;
        let errors = recipe.validate();
        if !errors.is_empty() {
            return Err(GraphError::Validation(errors));
        }
        Ok(recipe)
    }

    /// Problems that keep this recipe from being a valid inner graph
    pub fn validate(&self) -> Vec<ValidationError> {
        validate_scope(&self.as_graph())
    }

    fn as_graph(&self) -> Graph {
        Graph {
            name: self.name.clone(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    /// Wrap this recipe into a subgraph node placed at `position`
    pub fn into_subgraph(self, subgraph_id: NodeId, position: Position, padding: f64) -> Node {
        let mut nodes = self.nodes;
        normalize_positions(&mut nodes, padding);

        Node::new(
            subgraph_id,
            NodeKind::Subgraph(SubgraphConfig {
                description: self.description,
                inner_graph: Graph {
                    name: self.name.clone(),
                    nodes,
                    edges: self.edges,
                },
            }),
            position,
        )
        .with_label(self.name)
    }
}
