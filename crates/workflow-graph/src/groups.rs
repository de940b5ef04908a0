//! Grouping nodes into subgraphs and expanding them back
//!
//! Grouping collapses a selection into one subgraph node whose inner graph
//! owns the selected nodes and the edges between them. Boundary edges are
//! collapsed onto the new node, one edge per distinct external neighbor.
//!
//! Expansion splices an inner graph back into the parent under fresh IDs.
//! Edges that touched the subgraph node are dropped, not redistributed to
//! inner nodes; callers rewire by hand afterwards.
//!
//! Both operations are computed here as plans over borrowed slices; the
//! store applies them in one step.

use std::collections::{HashMap, HashSet};

use crate::constants;
use crate::ids::IdGenerator;
use crate::types::{Edge, EdgeId, Graph, Node, NodeId, NodeKind, Position, SubgraphConfig};

/// Axis-aligned bounds of a set of node positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Bounds of the given nodes' positions, or None if there are none
    pub fn of<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Option<Self> {
        nodes.into_iter().fold(None, |bounds, node| {
            let Position { x, y } = node.position;
            Some(match bounds {
                None => Self {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                },
                Some(b) => Self {
                    min_x: b.min_x.min(x),
                    min_y: b.min_y.min(y),
                    max_x: b.max_x.max(x),
                    max_y: b.max_y.max(y),
                },
            })
        })
    }

    pub fn center(&self) -> Position {
        Position::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// Translate nodes so their bounding-box minimum sits at `(padding, padding)`
pub fn normalize_positions(nodes: &mut [Node], padding: f64) {
    let Some(bounds) = BoundingBox::of(nodes.iter()) else {
        return;
    };
    for node in nodes {
        node.position = node
            .position
            .translated(padding - bounds.min_x, padding - bounds.min_y);
    }
}

/// Everything needed to apply a grouping to the parent graph
#[derive(Debug, Clone, PartialEq)]
pub struct GroupPlan {
    /// The new subgraph node
    pub subgraph: Node,
    /// IDs of the nodes moved into the subgraph
    pub grouped_ids: Vec<NodeId>,
    /// Parent edges to delete (internal, incoming and outgoing)
    pub removed_edge_ids: Vec<EdgeId>,
    /// New parent edges between the subgraph node and its neighbors
    pub rewired_edges: Vec<Edge>,
}

/// Everything needed to apply an expansion to the parent graph
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandPlan {
    pub subgraph_id: NodeId,
    /// Inner nodes under fresh IDs, translated into parent coordinates
    pub nodes: Vec<Node>,
    /// Inner edges remapped onto the fresh IDs
    pub edges: Vec<Edge>,
    /// Parent edges that touched the subgraph node
    pub removed_edge_ids: Vec<EdgeId>,
}

/// Inputs to a grouping that do not come from the graph itself
#[derive(Debug, Clone)]
pub struct GroupRequest<'a> {
    pub node_ids: &'a [NodeId],
    pub name: &'a str,
    pub description: Option<&'a str>,
    /// ID for the new subgraph node, unused in the parent scope
    pub subgraph_id: NodeId,
    pub padding: f64,
}

/// Operations for grouping and expanding subgraphs
pub struct GroupOperations;

impl GroupOperations {
    /// Plan collapsing `request.node_ids` into one subgraph node
    ///
    /// Returns None, without partially grouping, when fewer than two
    /// distinct nodes are selected, when a selected ID is not in `nodes`,
    /// or when a selected node is start/end/data/output.
    pub fn plan_group(
        request: &GroupRequest<'_>,
        nodes: &[Node],
        edges: &[Edge],
    ) -> Option<GroupPlan> {
        let selected: HashSet<&str> = request.node_ids.iter().map(|s| s.as_str()).collect();
        if selected.len() < 2 {
            log::debug!("Grouping rejected: need at least 2 nodes");
            return None;
        }

        let mut inner_nodes: Vec<Node> = nodes
            .iter()
            .filter(|n| selected.contains(n.id.as_str()))
            .cloned()
            .collect();
        if inner_nodes.len() != selected.len() {
            log::debug!("Grouping rejected: some selected nodes do not exist");
            return None;
        }
        if let Some(node) = inner_nodes.iter().find(|n| !n.is_groupable()) {
            log::debug!(
                "Grouping rejected: node '{}' of type {} cannot be grouped",
                node.id,
                node.node_type()
            );
            return None;
        }

        let bounds = BoundingBox::of(inner_nodes.iter())?;

        // Categorize edges
        let mut internal = Vec::new();
        let mut incoming = Vec::new();
        let mut outgoing = Vec::new();
        for edge in edges {
            let source_inside = selected.contains(edge.source.as_str());
            let target_inside = selected.contains(edge.target.as_str());
            match (source_inside, target_inside) {
                (true, true) => internal.push(edge),
                (false, true) => incoming.push(edge),
                (true, false) => outgoing.push(edge),
                (false, false) => {}
            }
        }

        let removed_edge_ids = internal
            .iter()
            .chain(&incoming)
            .chain(&outgoing)
            .map(|e| e.id.clone())
            .collect();

        let inner_edges = internal
            .iter()
            .map(|edge| Edge {
                id: format!("{}{}", constants::edges::INNER_PREFIX, edge.id),
                ..(*edge).clone()
            })
            .collect();

        let subgraph_id = request.subgraph_id.clone();
        let mut rewired_edges = Vec::new();
        let mut seen_sources = HashSet::new();
        for edge in incoming {
            if seen_sources.insert(edge.source.as_str()) {
                rewired_edges.push(rewire(edge, &edge.source, &subgraph_id, &selected));
            }
        }
        let mut seen_targets = HashSet::new();
        for edge in outgoing {
            if seen_targets.insert(edge.target.as_str()) {
                rewired_edges.push(rewire(edge, &subgraph_id, &edge.target, &selected));
            }
        }

        let grouped_ids = inner_nodes.iter().map(|n| n.id.clone()).collect();
        normalize_positions(&mut inner_nodes, request.padding);

        let subgraph = Node::new(
            subgraph_id,
            NodeKind::Subgraph(SubgraphConfig {
                description: request.description.map(str::to_string),
                inner_graph: Graph {
                    name: request.name.to_string(),
                    nodes: inner_nodes,
                    edges: inner_edges,
                },
            }),
            bounds.center(),
        )
        .with_label(request.name);

        Some(GroupPlan {
            subgraph,
            grouped_ids,
            removed_edge_ids,
            rewired_edges,
        })
    }

    /// Plan splicing a subgraph node's inner graph into its parent
    ///
    /// Returns None if `subgraph` is not a subgraph node, its inner graph
    /// has no nodes, or it holds a start/end node. Inner edges whose
    /// endpoints are missing from the inner graph are dropped.
    pub fn plan_expand(
        subgraph: &Node,
        ids: &mut IdGenerator,
        parent_nodes: &[Node],
        parent_edges: &[Edge],
    ) -> Option<ExpandPlan> {
        let inner = subgraph.inner_graph()?;
        if inner.nodes.is_empty() {
            log::debug!("Expansion rejected: subgraph '{}' is empty", subgraph.id);
            return None;
        }
        if let Some(node) = inner.nodes.iter().find(|n| n.is_terminal()) {
            log::debug!(
                "Expansion rejected: subgraph '{}' holds {} node '{}'",
                subgraph.id,
                node.node_type(),
                node.id
            );
            return None;
        }

        let taken: HashSet<&str> = parent_nodes.iter().map(|n| n.id.as_str()).collect();
        let inner_ids: Vec<&str> = inner.nodes.iter().map(|n| n.id.as_str()).collect();
        let fresh_ids = ids.expansion_ids(&inner_ids, &taken);
        let remap: HashMap<&str, &NodeId> =
            inner_ids.iter().copied().zip(fresh_ids.iter()).collect();

        let offset = subgraph.position;
        let nodes = inner
            .nodes
            .iter()
            .zip(&fresh_ids)
            .map(|(node, fresh)| Node {
                id: fresh.clone(),
                position: node.position.translated(offset.x, offset.y),
                ..node.clone()
            })
            .collect();

        let mut pairs = HashSet::new();
        let mut edges = Vec::new();
        for edge in &inner.edges {
            let (Some(source), Some(target)) =
                (remap.get(edge.source.as_str()), remap.get(edge.target.as_str()))
            else {
                log::warn!(
                    "Dropping inner edge '{}' of subgraph '{}': endpoint not in inner graph",
                    edge.id,
                    subgraph.id
                );
                continue;
            };
            if !pairs.insert((source.as_str(), target.as_str())) {
                continue;
            }
            let mut expanded = Edge {
                id: Edge::canonical_id(source, target),
                source: (*source).clone(),
                target: (*target).clone(),
                ..edge.clone()
            };
            if let Some(condition) = expanded.condition.as_mut() {
                for value in condition.path_map.values_mut() {
                    if let Some(fresh) = remap.get(value.as_str()) {
                        *value = (*fresh).clone();
                    }
                }
            }
            edges.push(expanded);
        }

        let removed_edge_ids = parent_edges
            .iter()
            .filter(|e| e.touches(&subgraph.id))
            .map(|e| e.id.clone())
            .collect();

        Some(ExpandPlan {
            subgraph_id: subgraph.id.clone(),
            nodes,
            edges,
            removed_edge_ids,
        })
    }
}

/// Boundary edge collapsed onto the subgraph node, keeping its edge fields
fn rewire(edge: &Edge, source: &str, target: &str, selected: &HashSet<&str>) -> Edge {
    let mut rewired = Edge {
        id: Edge::canonical_id(source, target),
        source: source.to_string(),
        target: target.to_string(),
        ..edge.clone()
    };
    let is_incoming = source == edge.source;
    if !is_incoming {
        return rewired;
    }
    // Branch outcomes pointing into the selection now point at the subgraph
    if let Some(condition) = rewired.condition.as_mut() {
        for value in condition.path_map.values_mut() {
            if selected.contains(value.as_str()) {
                *value = target.to_string();
            }
        }
    }
    rewired
}
