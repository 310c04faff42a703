// src/ops.rs

//! Built-in numeric task kinds.
//!
//! These are the tasks a TOML workflow file can declare. They operate on
//! `f64` and are ordinary [`Task`] implementations; the executor treats them
//! like any user-supplied task.

use std::fmt;

use anyhow::{anyhow, bail};
use serde::Deserialize;

use crate::task::{Kwargs, Task, TaskResult};

/// Kind of a built-in task, as written in `kind = "..."`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Source task returning its `value` argument.
    Value,
    /// Product of all positional arguments.
    Multiply,
    /// Sum of all positional arguments.
    Sum,
    /// First positional argument plus `constant`.
    AddConstant,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OpKind::Value => "value",
            OpKind::Multiply => "multiply",
            OpKind::Sum => "sum",
            OpKind::AddConstant => "add_constant",
        })
    }
}

/// A configured built-in task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Value,
    Multiply,
    Sum,
    AddConstant(f64),
}

impl Op {
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Value => OpKind::Value,
            Op::Multiply => OpKind::Multiply,
            Op::Sum => OpKind::Sum,
            Op::AddConstant(_) => OpKind::AddConstant,
        }
    }

    /// Minimum number of positional arguments the op needs.
    pub fn min_args(&self) -> usize {
        match self {
            Op::Value => 0,
            Op::Multiply | Op::Sum => 1,
            Op::AddConstant(_) => 1,
        }
    }
}

impl Task<f64> for Op {
    fn run(&self, args: &[f64], kwargs: &Kwargs<f64>) -> TaskResult<f64> {
        if args.len() < self.min_args() {
            bail!(
                "{} needs at least {} positional argument(s), got {}",
                self.kind(),
                self.min_args(),
                args.len()
            );
        }

        match self {
            Op::Value => value_arg(kwargs),
            Op::Multiply => Ok(args.iter().product()),
            Op::Sum => Ok(args.iter().sum()),
            Op::AddConstant(constant) => {
                let constant = kwargs.get("constant").copied().unwrap_or(*constant);
                Ok(args[0] + constant)
            }
        }
    }

    fn describe(&self) -> &str {
        match self {
            Op::Value => "value",
            Op::Multiply => "multiply",
            Op::Sum => "sum",
            Op::AddConstant(_) => "add_constant",
        }
    }
}

/// `value` if present, otherwise the bundle's only entry whatever its name.
fn value_arg(kwargs: &Kwargs<f64>) -> TaskResult<f64> {
    if let Some(v) = kwargs.get("value") {
        return Ok(*v);
    }
    match kwargs.len() {
        1 => Ok(*kwargs.values().next().ok_or_else(|| anyhow!("empty bundle"))?),
        0 => Err(anyhow!("value task needs a 'value' argument")),
        n => Err(anyhow!(
            "value task got {n} arguments but none named 'value'"
        )),
    }
}
