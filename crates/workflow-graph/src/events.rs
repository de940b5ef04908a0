//! Change notifications for graph mutations
//!
//! Events are sent from the store to any subscriber (renderer, autosave,
//! collaboration relay) after a mutation has actually been applied.
//! Rejected operations emit nothing.

use serde::{Deserialize, Serialize};

use crate::types::{EdgeId, NodeId};

/// Trait for receiving graph change events
///
/// This abstracts over the transport mechanism (UI callback, mpsc, etc.)
/// so the store can be embedded in different hosts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be delivered (e.g., channel closed)
    fn send(&self, event: GraphEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Which way a history step went
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryDirection {
    Undo,
    Redo,
}

/// Events emitted after graph mutations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GraphEvent {
    #[serde(rename_all = "camelCase")]
    NodeAdded { node_id: NodeId },

    /// Fields changed; `previous_id` is set when the node was renamed
    #[serde(rename_all = "camelCase")]
    NodeUpdated {
        node_id: NodeId,
        previous_id: Option<NodeId>,
    },

    /// Node deleted together with its incident edges
    #[serde(rename_all = "camelCase")]
    NodeRemoved {
        node_id: NodeId,
        removed_edges: Vec<EdgeId>,
    },

    #[serde(rename_all = "camelCase")]
    NodeMoved { node_id: NodeId },

    #[serde(rename_all = "camelCase")]
    EdgeAdded { edge_id: EdgeId },

    #[serde(rename_all = "camelCase")]
    EdgeUpdated { edge_id: EdgeId },

    #[serde(rename_all = "camelCase")]
    EdgeRemoved { edge_id: EdgeId },

    #[serde(rename_all = "camelCase")]
    NodesGrouped {
        subgraph_id: NodeId,
        grouped: Vec<NodeId>,
    },

    #[serde(rename_all = "camelCase")]
    SubgraphExpanded {
        subgraph_id: NodeId,
        nodes: Vec<NodeId>,
    },

    #[serde(rename_all = "camelCase")]
    SubgraphUpdated { subgraph_id: NodeId },

    #[serde(rename_all = "camelCase")]
    RecipeInserted { subgraph_id: NodeId },

    #[serde(rename_all = "camelCase")]
    HistoryRestored { direction: HistoryDirection },

    #[serde(rename_all = "camelCase")]
    LayoutApplied { moved: usize },

    #[serde(rename_all = "camelCase")]
    WorkflowReplaced { workflow_id: String },
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: GraphEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<GraphEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<GraphEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: GraphEvent) -> Result<(), EventError> {
        let mut events = self.events.lock().map_err(|_| EventError {
            message: "Event buffer poisoned".to_string(),
        })?;
        events.push(event);
        Ok(())
    }
}

/// Forwards events into a `std::sync::mpsc` channel
pub struct ChannelEventSink {
    sender: std::sync::mpsc::Sender<GraphEvent>,
}

impl ChannelEventSink {
    pub fn new(sender: std::sync::mpsc::Sender<GraphEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelEventSink {
    fn send(&self, event: GraphEvent) -> Result<(), EventError> {
        self.sender
            .send(event)
            .map_err(|_| EventError::channel_closed())
    }
}
