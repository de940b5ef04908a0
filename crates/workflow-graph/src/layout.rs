//! Layout collaborator seam
//!
//! The engine does not lay graphs out. A host-supplied [`LayoutEngine`]
//! returns nodes with new positions and the store copies those positions
//! back by node ID, without re-validating them.

use std::collections::HashMap;

use crate::types::{Edge, Node, NodeId, Position};

/// Recomputes node positions for a graph
pub trait LayoutEngine {
    /// Return `nodes` with updated `position` fields
    ///
    /// Only positions are read back from the result; every other field is
    /// ignored.
    fn layout(&self, nodes: &[Node], edges: &[Edge]) -> Vec<Node>;
}

/// Positions keyed by node ID, as read back from a layout result
pub(crate) fn positions_by_id(laid_out: Vec<Node>) -> HashMap<NodeId, Position> {
    laid_out.into_iter().map(|n| (n.id, n.position)).collect()
}

/// Places nodes on a fixed grid in their current order
///
/// A placeholder for hosts without a DAG layout routine; it ignores edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub columns: usize,
    pub column_width: f64,
    pub row_height: f64,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            columns: 4,
            column_width: 250.0,
            row_height: 150.0,
        }
    }
}

impl LayoutEngine for GridLayout {
    fn layout(&self, nodes: &[Node], _edges: &[Edge]) -> Vec<Node> {
        let columns = self.columns.max(1);
        nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let mut placed = node.clone();
                placed.position = Position::new(
                    (i % columns) as f64 * self.column_width,
                    (i / columns) as f64 * self.row_height,
                );
                placed
            })
            .collect()
    }
}
