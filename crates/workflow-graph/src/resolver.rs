//! Edge reference resolution
//!
//! The rendering layer hands edges back in whatever encoding it uses: the
//! canonical store ID, the canonical ID behind a foreign prefix
//! (`"{prefix}__{id}"`), or a bare `"{source}-{target}"` composite.
//! Resolution tries, in order, first match wins:
//!
//! 1. exact ID match
//! 2. exact match after stripping the configured foreign prefix
//! 3. split the (possibly stripped) reference on its *last* `-` and look up
//!    the edge with that `(source, target)` pair
//!
//! Step 3 mis-splits when the target ID itself contains a `-`; callers that
//! need such IDs must pass canonical IDs.

use crate::constants;
use crate::types::{Edge, GraphScope};

/// Maps external edge references onto canonical edges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeResolver {
    /// Full foreign prefix including the separator, e.g. `"xy-edge__"`
    foreign_prefix: String,
}

impl EdgeResolver {
    /// Create a resolver tolerating `"{prefix}__"` in front of canonical IDs
    pub fn new(prefix: impl AsRef<str>) -> Self {
        Self {
            foreign_prefix: format!(
                "{}{}",
                prefix.as_ref(),
                constants::edges::PREFIX_SEPARATOR
            ),
        }
    }

    /// The full prefix (with separator) this resolver strips
    pub fn foreign_prefix(&self) -> &str {
        &self.foreign_prefix
    }

    /// Encode a canonical ID the way the rendering layer does
    pub fn to_foreign(&self, edge_id: &str) -> String {
        format!("{}{}", self.foreign_prefix, edge_id)
    }

    /// Index of the edge `edge_ref` refers to, if any
    pub fn resolve_index(&self, edges: &[Edge], edge_ref: &str) -> Option<usize> {
        if let Some(index) = edges.iter().position(|e| e.id == edge_ref) {
            return Some(index);
        }

        let stripped = edge_ref.strip_prefix(self.foreign_prefix.as_str());
        if let Some(stripped) = stripped {
            if let Some(index) = edges.iter().position(|e| e.id == stripped) {
                return Some(index);
            }
        }

        let composite = stripped.unwrap_or(edge_ref);
        let (source, target) = split_pair(composite)?;
        let found = edges.iter().position(|e| e.connects(source, target));
        if found.is_none() {
            log::debug!("Edge reference '{}' did not resolve", edge_ref);
        }
        found
    }

    /// The edge `edge_ref` refers to in `scope`, if any
    pub fn resolve<'a, S: GraphScope + ?Sized>(
        &self,
        scope: &'a S,
        edge_ref: &str,
    ) -> Option<&'a Edge> {
        let edges = scope.edges();
        self.resolve_index(edges, edge_ref).map(|i| &edges[i])
    }
}

impl Default for EdgeResolver {
    fn default() -> Self {
        Self::new(constants::edges::FOREIGN_PREFIX)
    }
}

/// Split `"{source}-{target}"` on the last `-`
fn split_pair(composite: &str) -> Option<(&str, &str)> {
    let (source, target) = composite.rsplit_once(constants::edges::PAIR_SEPARATOR)?;
    if source.is_empty() || target.is_empty() {
        return None;
    }
    Some((source, target))
}
