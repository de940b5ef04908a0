//! Engine configuration
//!
//! Every field has a default from [`crate::constants`], so a partial JSON
//! file only needs the keys it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{GraphError, Result};
use crate::types::Position;

/// Tunables for one editing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Maximum entries on each of the undo and redo stacks
    pub max_undo_stack: usize,
    /// Offset from the inner origin to grouped nodes' bounding-box minimum
    pub subgraph_padding: f64,
    /// Where recipe subgraphs land when no position is given
    pub recipe_offset: Position,
    /// Prefix the rendering layer puts in front of edge IDs (without `__`)
    pub foreign_edge_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_undo_stack: constants::history::MAX_UNDO_STACK,
            subgraph_padding: constants::layout::SUBGRAPH_PADDING,
            recipe_offset: constants::layout::RECIPE_OFFSET.into(),
            foreign_edge_prefix: constants::edges::FOREIGN_PREFIX.to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&content)?;
        log::debug!("Loaded engine config from {:?}", path.as_ref());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_undo_stack == 0 {
            return Err(GraphError::config("maxUndoStack must be at least 1"));
        }
        if !self.subgraph_padding.is_finite() || self.subgraph_padding < 0.0 {
            return Err(GraphError::config(format!(
                "subgraphPadding must be a non-negative number, got {}",
                self.subgraph_padding
            )));
        }
        if !self.recipe_offset.x.is_finite() || !self.recipe_offset.y.is_finite() {
            return Err(GraphError::config("recipeOffset must be finite"));
        }
        Ok(())
    }
}
