//! Engine-wide constants
//!
//! Single source of truth for the numeric defaults used by the store,
//! the structural transformer and the history manager.

/// Undo/redo history limits
pub mod history {
    /// Maximum number of snapshots kept on each stack
    pub const MAX_UNDO_STACK: usize = 50;
    /// zstd level used to pack snapshots
    pub const COMPRESSION_LEVEL: i32 = 3;
}

/// Canvas coordinates used by grouping and recipe insertion
pub mod layout {
    /// Offset from the inner graph origin to the bounding-box minimum of grouped nodes
    pub const SUBGRAPH_PADDING: f64 = 20.0;
    /// Where a recipe subgraph lands when the caller gives no position
    pub const RECIPE_OFFSET: (f64, f64) = (250.0, 250.0);
    /// Name given to a recipe subgraph when the caller gives none
    pub const RECIPE_NAME: &str = "Recipe";
}

/// Edge identifier encodings
pub mod edges {
    /// Prefix the rendering layer puts in front of canonical edge IDs
    pub const FOREIGN_PREFIX: &str = "xy-edge";
    /// Separator between the foreign prefix and the canonical ID
    pub const PREFIX_SEPARATOR: &str = "__";
    /// Separator between source and target in a canonical edge ID
    pub const PAIR_SEPARATOR: char = '-';
    /// Prefix applied to edge IDs moved into a subgraph
    pub const INNER_PREFIX: &str = "inner_";
}

/// Well-known node IDs
pub mod nodes {
    /// ID of the start node in a freshly created workflow
    pub const START_ID: &str = "start";
    /// ID of the end node in a freshly created workflow
    pub const END_ID: &str = "end";
}
