mod common;

use std::error::Error;

use taskdag::{Inputs, TaskState, Workflow, WorkflowError};

use common::tasks::{call_log, calls, failing, multiply, recording, sum, value};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn missing_source_bundle_names_the_task() -> TestResult {
    common::init_tracing();
    let mut b = Workflow::<i64>::builder();
    let a = b.add_named_task("A", value)?;
    let bb = b.add_named_task("B", value)?;
    let m = b.add_named_task("M", multiply)?;
    b.add_dependency(m, &[a, bb])?;
    let wf = b.build()?;

    let failure = wf
        .execute(Inputs::new().with("A", [("value", 5)]))
        .unwrap_err();

    assert!(matches!(failure.error, WorkflowError::MissingInput(ref t) if t == "B"));
    assert_eq!(failure.error.task(), Some("B"));
    assert_eq!(failure.context.get("A"), Some(&5));
    assert!(failure.context.get("M").is_none());
    Ok(())
}

#[test]
fn failing_task_stops_the_run_and_keeps_partial_results() -> TestResult {
    common::init_tracing();
    let log = call_log();

    let mut b = Workflow::<i64>::builder();
    let a = b.add_named_task("A", recording("A", &log, value))?;
    let bad = b.add_named_task("bad", recording("bad", &log, failing("boom")))?;
    let after = b.add_named_task("after", recording("after", &log, sum))?;
    b.add_dependency(bad, &[a])?;
    b.add_dependency(after, &[bad])?;
    let wf = b.build()?;

    let failure = wf
        .execute(Inputs::new().with("A", [("value", 2)]))
        .unwrap_err();

    match &failure.error {
        WorkflowError::TaskExecution {
            task,
            completed,
            source,
        } => {
            assert_eq!(task, "bad");
            assert_eq!(completed, &vec!["A".to_string()]);
            assert!(source.to_string().contains("boom"));
        }
        other => panic!("expected TaskExecution, got {other:?}"),
    }

    assert_eq!(calls(&log), vec!["A", "bad"]);
    assert_eq!(failure.context.get("A"), Some(&2));
    assert!(matches!(failure.context.state("bad"), Some(TaskState::Failed(_))));
    assert_eq!(failure.context.state("after"), Some(&TaskState::Pending));
    Ok(())
}

#[test]
fn duplicate_identifier_is_rejected() -> TestResult {
    let mut b = Workflow::<i64>::builder();
    b.add_named_task("A", value)?;

    let err = b.add_named_task("A", value).unwrap_err();
    assert!(matches!(err, WorkflowError::DuplicateIdentifier(ref n) if n == "A"));
    Ok(())
}

#[test]
fn second_dependency_declaration_is_rejected() -> TestResult {
    let mut b = Workflow::<i64>::builder();
    let a = b.add_named_task("A", value)?;
    let m = b.add_named_task("M", sum)?;
    b.add_dependency(m, &[a])?;

    let err = b.add_dependency(m, &[a]).unwrap_err();
    assert!(matches!(err, WorkflowError::DuplicateTask(ref n) if n == "M"));
    Ok(())
}

#[test]
fn unknown_upstream_is_rejected_by_name() -> TestResult {
    let mut b = Workflow::<i64>::builder();
    b.add_named_task("A", value)?;
    b.add_named_task("M", sum)?;

    let err = b.add_dependency_by_name("M", &["A", "ghost"]).unwrap_err();
    match err {
        WorkflowError::UnknownUpstream { task, upstream } => {
            assert_eq!(task, "M");
            assert_eq!(upstream, "ghost");
        }
        other => panic!("expected UnknownUpstream, got {other:?}"),
    }
    Ok(())
}

#[test]
fn handle_from_another_builder_is_rejected() -> TestResult {
    let mut other = Workflow::<i64>::builder();
    other.add_named_task("elsewhere", value)?;
    let foreign = other.add_named_task("also_elsewhere", value)?;

    let mut b = Workflow::<i64>::builder();
    let a = b.add_named_task("A", value)?;
    b.add_named_task("B", value)?;
    let m = b.add_named_task("M", sum)?;

    let err = b.add_dependency(m, &[a, foreign]).unwrap_err();
    assert!(matches!(err, WorkflowError::UnknownUpstream { ref task, .. } if task == "M"));
    assert!(b.graph().dependencies_of(m).is_empty());

    let err = b.add_dependency(foreign, &[a]).unwrap_err();
    assert!(matches!(err, WorkflowError::UnknownTask(_)));

    // M can still be wired correctly afterwards.
    b.add_dependency(m, &[a])?;
    let wf = b.build()?;
    assert_eq!(wf.resolve(foreign), None);
    Ok(())
}

#[test]
fn cycle_is_reported_and_removing_an_edge_fixes_it() -> TestResult {
    let wire = |close_loop: bool| -> Result<Workflow<i64>, WorkflowError> {
        let mut b = Workflow::<i64>::builder();
        let src = b.add_named_task("src", value)?;
        let x = b.add_named_task("X", sum)?;
        let y = b.add_named_task("Y", sum)?;
        let z = b.add_named_task("Z", sum)?;
        if close_loop {
            b.add_dependency(x, &[src, z])?;
        } else {
            b.add_dependency(x, &[src])?;
        }
        b.add_dependency(y, &[x])?;
        b.add_dependency(z, &[y])?;
        b.build()
    };

    match wire(true) {
        Err(WorkflowError::Cycle { task, cycle }) => {
            assert_eq!(task, "X");
            assert_eq!(cycle, vec!["X", "Y", "Z", "X"]);
        }
        other => panic!("expected cycle, got {other:?}"),
    }

    let wf = wire(false)?;
    assert_eq!(wf.topological_order(), vec!["src", "X", "Y", "Z"]);
    Ok(())
}

#[test]
fn self_dependency_is_a_cycle() -> TestResult {
    let mut b = Workflow::<i64>::builder();
    let a = b.add_named_task("A", sum)?;
    b.add_dependency(a, &[a])?;

    match b.build() {
        Err(WorkflowError::Cycle { cycle, .. }) => assert_eq!(cycle, vec!["A", "A"]),
        other => panic!("expected cycle, got {other:?}"),
    }
    Ok(())
}

#[test]
fn unknown_input_key_is_rejected() -> TestResult {
    let wf = Workflow::linear_named(vec![("only", common::tasks::boxed(value))])?;

    let failure = wf
        .execute(
            Inputs::new()
                .with("only", [("value", 1)])
                .with("other", [("value", 1)]),
        )
        .unwrap_err();

    assert!(matches!(failure.error, WorkflowError::UnknownTask(ref n) if n == "other"));
    Ok(())
}
