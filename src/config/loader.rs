// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{RawWorkflowFile, WorkflowFile};
use crate::errors::Result;

/// Load a workflow file from a given path and return the raw `RawWorkflowFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (DAG correctness, etc.). Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawWorkflowFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = contents.len(), "read workflow file");

    let config: RawWorkflowFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Parse and validate a workflow definition held in memory.
pub fn parse_str(contents: &str) -> Result<WorkflowFile> {
    let raw: RawWorkflowFile = toml::from_str(contents)?;
    WorkflowFile::try_from(raw)
}

/// Load a workflow file from path and run validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Checks for:
///   - unknown or duplicate task names,
///   - task kinds wired with the wrong number of upstream tasks,
///   - inputs for tasks that do not exist,
///   - dependency cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<WorkflowFile> {
    let raw_config = load_from_path(&path)?;
    let config = WorkflowFile::try_from(raw_config)?;
    Ok(config)
}

/// Default workflow file: `Workflow.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Workflow.toml")
}
