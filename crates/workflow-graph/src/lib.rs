//! Workflow Graph - structural editing engine for agent workflow graphs
//!
//! This crate owns a workflow (a directed graph of typed nodes with exactly
//! one start and one end node) and every edit applied to it. It supports:
//!
//! - Node and edge editing with counter-based, collision-free IDs
//! - Grouping a selection into a nested subgraph node and expanding it back
//! - Recipe insertion as a self-contained subgraph
//! - Compressed snapshot-based undo/redo
//! - Edge lookup by the alternate ID encodings a renderer produces
//!
//! # Architecture
//!
//! - `GraphStore`: single owner of the live workflow; all mutation goes here
//! - `GroupOperations`: pure planning for group/expand, applied by the store
//! - `UndoStack`: bounded, zstd-compressed snapshots
//! - `EventSink`: change notifications for whatever host embeds the store
//! - `LayoutEngine` / `WorkflowPersistence`: collaborator seams
//!
//! Execution of workflows is out of scope; this crate edits structure only.
//!
//! # Example
//!
//! ```
//! use workflow_graph::{GraphStore, NodeType, Workflow};
//!
//! let mut store = GraphStore::new(Workflow::new_empty("Demo"));
//! let llm = store.add_node(NodeType::Llm, (0.0, 200.0)).unwrap();
//! let agent = store.add_node(NodeType::Agent, (200.0, 200.0)).unwrap();
//! store.add_edge("start", &llm.id, false);
//! store.add_edge(&llm.id, &agent.id, false);
//!
//! store.push_undo();
//! let group = store
//!     .group_nodes_as_subgraph(&[llm.id.clone(), agent.id.clone()], "Pipeline", None)
//!     .unwrap();
//! assert_eq!(store.edge(&format!("start-{}", group.id)).unwrap().target, group.id);
//!
//! assert!(store.undo());
//! assert!(store.node(&llm.id).is_some());
//! ```

pub mod builder;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod groups;
pub mod ids;
pub mod layout;
pub mod persistence;
pub mod recipe;
pub mod resolver;
pub mod store;
pub mod types;
pub mod undo;
pub mod validation;

// Re-export key types
pub use builder::WorkflowBuilder;
pub use config::EngineConfig;
pub use error::{GraphError, Result};
pub use events::{
    ChannelEventSink, EventError, EventSink, GraphEvent, HistoryDirection, NullEventSink,
    VecEventSink,
};
pub use groups::{ExpandPlan, GroupOperations, GroupPlan, GroupRequest};
pub use ids::IdGenerator;
pub use layout::{GridLayout, LayoutEngine};
pub use persistence::{JsonFilePersistence, WorkflowMetadata, WorkflowPersistence};
pub use recipe::Recipe;
pub use resolver::EdgeResolver;
pub use store::{EdgePatch, GraphStore, NodePatch, Splice};
pub use types::{
    Edge, EdgeCondition, EdgeId, Graph, GraphScope, Node, NodeId, NodeKind, NodeType, Position,
    Workflow,
};
pub use undo::{Snapshot, UndoStack};
pub use validation::{validate_scope, validate_workflow, ValidationError};
