//! Error types for the workflow graph engine
//!
//! Editing operations never fail with these; they degrade to no-ops with a
//! falsy result. `GraphError` only surfaces at the collaborator seams:
//! snapshot encoding, persistence, recipe/config parsing and load validation.

use thiserror::Error;

use crate::validation::ValidationError;

/// Result type alias using GraphError
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur outside the editing contract
#[derive(Debug, Error)]
pub enum GraphError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot compression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A workflow handed to the engine broke its structural invariants
    #[error("Workflow failed validation with {} problem(s): {}", .0.len(), join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// A workflow ID that cannot name a file inside the persistence root
    #[error("Invalid workflow ID: {0:?}")]
    InvalidWorkflowId(String),

    /// Invalid engine configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl GraphError {
    /// Create a configuration error with a message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_message_lists_problems() {
        let err = GraphError::Validation(vec![
            ValidationError::MissingStartNode,
            ValidationError::DuplicateNodeId {
                node_id: "llm_1".to_string(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("2 problem(s)"));
        assert!(msg.contains("llm_1"));
    }
}
