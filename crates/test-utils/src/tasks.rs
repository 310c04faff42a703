use std::sync::{Arc, Mutex};

use taskdag::{Kwargs, Task, TaskResult};

/// Shared log of task invocations, in call order.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Source task: returns its `value` argument, or the only argument given.
pub fn value(_: &[i64], kwargs: &Kwargs<i64>) -> TaskResult<i64> {
    if let Some(v) = kwargs.get("value") {
        return Ok(*v);
    }
    match kwargs.values().next() {
        Some(v) if kwargs.len() == 1 => Ok(*v),
        _ => anyhow::bail!("expected a single 'value' argument, got {:?}", kwargs),
    }
}

pub fn multiply(args: &[i64], _: &Kwargs<i64>) -> TaskResult<i64> {
    Ok(args.iter().product())
}

pub fn sum(args: &[i64], _: &Kwargs<i64>) -> TaskResult<i64> {
    Ok(args.iter().sum())
}

/// `args[0] + constant`.
pub fn add_constant(constant: i64) -> impl Task<i64> + 'static {
    move |args: &[i64], _: &Kwargs<i64>| -> TaskResult<i64> {
        match args.first() {
            Some(x) => Ok(x + constant),
            None => anyhow::bail!("add_constant needs one argument"),
        }
    }
}

/// Task that always fails with `message`.
pub fn failing(message: &'static str) -> impl Task<i64> + 'static {
    move |_: &[i64], _: &Kwargs<i64>| -> TaskResult<i64> { anyhow::bail!(message) }
}

/// Wrap `inner`, appending `name` to `log` every time it is invoked.
pub fn recording<T>(name: &str, log: &CallLog, inner: T) -> impl Task<i64> + 'static
where
    T: Task<i64> + 'static,
{
    let name = name.to_string();
    let log = Arc::clone(log);
    move |args: &[i64], kwargs: &Kwargs<i64>| -> TaskResult<i64> {
        log.lock().unwrap().push(name.clone());
        inner.run(args, kwargs)
    }
}

/// Boxed version of any task, for linear-chain construction.
pub fn boxed<T>(task: T) -> Box<dyn Task<i64>>
where
    T: Task<i64> + 'static,
{
    Box::new(task)
}
