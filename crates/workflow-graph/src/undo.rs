//! Undo/redo history using compressed snapshots
//!
//! Each entry is a zstd-packed JSON encoding of the live `{nodes, edges}`.
//! Packing is a deep copy: nothing a later mutation does to the live graph
//! can reach a stored entry, and entries are never modified once pushed.
//!
//! The host pushes *before* mutating, so a multi-step gesture can share one
//! entry. Pushing clears the redo stack. Both stacks hold at most
//! `max_snapshots` entries; the oldest is discarded on overflow.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{GraphError, Result};
use crate::types::{Edge, Node};

/// Deep copy of the live graph contents
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Snapshot {
    pub fn new(nodes: &[Node], edges: &[Edge]) -> Self {
        Self {
            nodes: nodes.to_vec(),
            edges: edges.to_vec(),
        }
    }
}

/// Linear undo/redo stacks of compressed snapshots
#[derive(Debug)]
pub struct UndoStack {
    undo: VecDeque<Vec<u8>>,
    redo: VecDeque<Vec<u8>>,
    /// Maximum number of snapshots kept per stack
    max_snapshots: usize,
}

impl UndoStack {
    /// Create a new undo stack with the specified maximum size
    pub fn new(max_snapshots: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            max_snapshots: max_snapshots.max(1), // At least 1 snapshot
        }
    }

    /// Record the state a mutation is about to change
    ///
    /// Discards any redo history.
    pub fn push(&mut self, snapshot: &Snapshot) -> Result<()> {
        let packed = compress(snapshot)?;
        push_bounded(&mut self.undo, packed, self.max_snapshots);
        self.redo.clear();
        Ok(())
    }

    /// Step back: stash `current` for redo and return the previous state
    ///
    /// Returns None if there is nothing to undo.
    pub fn undo(&mut self, current: &Snapshot) -> Option<Result<Snapshot>> {
        let entry = self.undo.pop_back()?;
        Some(Self::exchange(entry, current, &mut self.redo, self.max_snapshots))
    }

    /// Step forward: stash `current` for undo and return the next state
    ///
    /// Returns None if there is nothing to redo.
    pub fn redo(&mut self, current: &Snapshot) -> Option<Result<Snapshot>> {
        let entry = self.redo.pop_back()?;
        Some(Self::exchange(entry, current, &mut self.undo, self.max_snapshots))
    }

    fn exchange(
        entry: Vec<u8>,
        current: &Snapshot,
        opposite: &mut VecDeque<Vec<u8>>,
        max_snapshots: usize,
    ) -> Result<Snapshot> {
        let restored = decompress(&entry)?;
        push_bounded(opposite, compress(current)?, max_snapshots);
        Ok(restored)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn max_snapshots(&self) -> usize {
        self.max_snapshots
    }

    /// Clear both stacks
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Get the total compressed size of all stored snapshots
    pub fn compressed_size(&self) -> usize {
        self.undo.iter().chain(self.redo.iter()).map(|s| s.len()).sum()
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(constants::history::MAX_UNDO_STACK)
    }
}

fn push_bounded(stack: &mut VecDeque<Vec<u8>>, entry: Vec<u8>, max: usize) {
    stack.push_back(entry);
    while stack.len() > max {
        stack.pop_front();
        log::debug!("History full, dropped oldest snapshot");
    }
}

fn compress(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(snapshot)?;
    zstd::encode_all(&json[..], constants::history::COMPRESSION_LEVEL)
        .map_err(|e| GraphError::Compression(e.to_string()))
}

fn decompress(packed: &[u8]) -> Result<Snapshot> {
    let json = zstd::decode_all(packed).map_err(|e| GraphError::Compression(e.to_string()))?;
    Ok(serde_json::from_slice(&json)?)
}
