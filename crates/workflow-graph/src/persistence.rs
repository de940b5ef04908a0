//! Workflow persistence with JSON files.
//!
//! Loading is where malformed data gets rejected: a workflow that breaks
//! the structural invariants never reaches the store.

use std::path::{Path, PathBuf};

use crate::error::{GraphError, Result};
use crate::types::Workflow;
use crate::validation::validate_workflow;

/// Metadata for a stored workflow (for listing).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowMetadata {
    pub id: String,
    pub name: String,
    pub node_count: usize,
    pub path: PathBuf,
}

/// Backing store for workflows.
pub trait WorkflowPersistence {
    /// Load a workflow by ID, rejecting it if it fails validation.
    fn load(&self, workflow_id: &str) -> Result<Workflow>;

    /// Save a workflow, optionally under a caller-chosen path.
    ///
    /// Returns the path written.
    fn save(&self, workflow: &Workflow, path: Option<&Path>) -> Result<PathBuf>;
}

/// Stores each workflow as a pretty-printed `{id}.json` in one directory.
///
/// # Example
///
/// ```ignore
/// let persistence = JsonFilePersistence::new(".workflows");
/// persistence.save(store.workflow(), None)?;
/// let workflow = persistence.load("wf-1")?;
/// store.load_workflow(workflow);
/// ```
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    root: PathBuf,
}

impl JsonFilePersistence {
    /// Create a persistence layer rooted at the given directory.
    ///
    /// The directory will be created if it doesn't exist when saving.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/{id}.json`, refusing IDs that would leave the root
    fn path_for(&self, workflow_id: &str) -> Result<PathBuf> {
        let escapes = workflow_id.is_empty()
            || workflow_id == "."
            || workflow_id == ".."
            || workflow_id.contains(['/', '\\']);
        if escapes {
            log::warn!("Rejected workflow ID {:?}", workflow_id);
            return Err(GraphError::InvalidWorkflowId(workflow_id.to_string()));
        }
        Ok(self.root.join(format!("{}.json", workflow_id)))
    }

    /// Read and validate a workflow file at an explicit path.
    pub fn load_path(&self, path: &Path) -> Result<Workflow> {
        let content = std::fs::read_to_string(path)?;
        let workflow: Workflow = serde_json::from_str(&content)?;
        let errors = validate_workflow(&workflow);
        if !errors.is_empty() {
            log::warn!(
                "Rejected workflow '{}' from {:?}: {} problem(s)",
                workflow.id,
                path,
                errors.len()
            );
            return Err(GraphError::Validation(errors));
        }
        log::info!("Loaded workflow '{}' from {:?}", workflow.id, path);
        Ok(workflow)
    }

    /// List every parseable workflow in the root directory.
    pub fn list(&self) -> Result<Vec<WorkflowMetadata>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut listed = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let file_path = entry?.path();
            if file_path.extension().map_or(true, |e| e != "json") {
                continue;
            }
            let content = std::fs::read_to_string(&file_path)?;
            match serde_json::from_str::<Workflow>(&content) {
                Ok(workflow) => listed.push(WorkflowMetadata {
                    id: workflow.id,
                    name: workflow.name,
                    node_count: workflow.nodes.len(),
                    path: file_path,
                }),
                Err(e) => {
                    log::warn!("Failed to parse workflow from {:?}: {}", file_path, e);
                }
            }
        }
        listed.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(listed)
    }

    /// Delete a stored workflow; returns whether a file was removed.
    pub fn delete(&self, workflow_id: &str) -> Result<bool> {
        let file_path = self.path_for(workflow_id)?;
        if !file_path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&file_path)?;
        log::debug!("Deleted workflow '{}' from {:?}", workflow_id, file_path);
        Ok(true)
    }
}

impl WorkflowPersistence for JsonFilePersistence {
    fn load(&self, workflow_id: &str) -> Result<Workflow> {
        self.load_path(&self.path_for(workflow_id)?)
    }

    fn save(&self, workflow: &Workflow, path: Option<&Path>) -> Result<PathBuf> {
        let file_path = match path {
            Some(p) if p.is_absolute() => p.to_path_buf(),
            Some(p) => self.root.join(p),
            None => self.path_for(&workflow.id)?,
        };
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(workflow)?;
        std::fs::write(&file_path, content)?;
        log::debug!("Saved workflow '{}' to {:?}", workflow.id, file_path);
        Ok(file_path)
    }
}
