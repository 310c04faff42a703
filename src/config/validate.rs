// src/config/validate.rs

use crate::config::model::{RawWorkflowFile, WorkflowFile, to_builder};
use crate::errors::{Result, WorkflowError};
use crate::ops::OpKind;

impl TryFrom<RawWorkflowFile> for WorkflowFile {
    type Error = WorkflowError;

    fn try_from(raw: RawWorkflowFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(WorkflowFile::new_unchecked(raw.task, raw.inputs))
    }
}

fn validate_raw_config(cfg: &RawWorkflowFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_task_kinds(cfg)?;
    validate_inputs(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawWorkflowFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(WorkflowError::Config(
            "workflow must contain at least one [[task]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_kinds(cfg: &RawWorkflowFile) -> Result<()> {
    for task in cfg.task.iter() {
        match task.kind {
            OpKind::Value if !task.after.is_empty() => {
                return Err(WorkflowError::Config(format!(
                    "task '{}' is a value task and cannot have `after`",
                    task.name
                )));
            }
            OpKind::Multiply | OpKind::Sum | OpKind::AddConstant if task.after.is_empty() => {
                return Err(WorkflowError::Config(format!(
                    "task '{}' of kind {} needs at least one task in `after`",
                    task.name, task.kind
                )));
            }
            _ => {}
        }

        if task.constant.is_some() && task.kind != OpKind::AddConstant {
            return Err(WorkflowError::Config(format!(
                "task '{}' sets `constant`, which only applies to add_constant",
                task.name
            )));
        }
        if task.kind == OpKind::AddConstant && task.constant.is_none() {
            return Err(WorkflowError::Config(format!(
                "task '{}' of kind add_constant needs a `constant`",
                task.name
            )));
        }
    }
    Ok(())
}

fn validate_inputs(cfg: &RawWorkflowFile) -> Result<()> {
    for name in cfg.inputs.keys() {
        if !cfg.task.iter().any(|t| &t.name == name) {
            return Err(WorkflowError::Config(format!(
                "[inputs.{name}] refers to an unknown task"
            )));
        }
    }
    Ok(())
}

/// Build and freeze the workflow once: this surfaces duplicate names,
/// unknown `after` references and cycles as the same structured errors the
/// library reports.
fn validate_dag(cfg: &RawWorkflowFile) -> Result<()> {
    to_builder(&cfg.task)?.build()?;
    Ok(())
}
