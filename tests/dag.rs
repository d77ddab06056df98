use std::sync::Arc;

use modbuild::dag::{parallel, series, TaskGraph, TaskSpec};
use modbuild::errors::ModbuildError;
use modbuild_test_utils::recording::{EventLog, RecordingWork};
use modbuild_test_utils::{init_tracing, with_timeout};

fn graph_with(works: Vec<RecordingWork>) -> TaskGraph {
    let mut graph = TaskGraph::new();
    for work in works {
        graph.add_task(work.into_task()).unwrap();
    }
    graph
}

#[tokio::test]
async fn series_runs_members_one_after_another() {
    init_tracing();
    let log = EventLog::new();
    let mut graph = graph_with(vec![
        RecordingWork::new("a", &log).delay_ms(30),
        RecordingWork::new("b", &log),
        RecordingWork::new("c", &log).delay_ms(10),
    ]);
    graph.define_group("all", series(["a", "b", "c"])).unwrap();
    graph.validate().unwrap();
    let graph = Arc::new(graph);

    let report = with_timeout(graph.run_named("all")).await.unwrap();
    assert_eq!(report.tasks(), vec!["a", "b", "c"]);
    assert_eq!(
        log.events(),
        vec!["start:a", "end:a", "start:b", "end:b", "start:c", "end:c"]
    );

    let a = report.record("a").unwrap();
    let b = report.record("b").unwrap();
    assert!(a.finished <= b.started);
}

#[tokio::test]
async fn series_stops_at_first_failure() {
    let log = EventLog::new();
    let mut graph = graph_with(vec![
        RecordingWork::new("a", &log),
        RecordingWork::new("b", &log).failing(),
        RecordingWork::new("c", &log),
    ]);
    graph.define_group("all", series(["a", "b", "c"])).unwrap();
    let graph = Arc::new(graph);

    let err = with_timeout(graph.run_named("all")).await.unwrap_err();
    assert_eq!(err.failed_task(), Some("b"));
    assert_eq!(log.count("start:c"), 0);
}

#[tokio::test]
async fn parallel_runs_concurrently_and_reports_every_failure() {
    let log = EventLog::new();
    let mut graph = graph_with(vec![
        RecordingWork::new("slow", &log).delay_ms(50),
        RecordingWork::new("bad1", &log).delay_ms(10).failing(),
        RecordingWork::new("bad2", &log).failing(),
    ]);
    graph
        .define_group("all", parallel(["slow", "bad1", "bad2"]))
        .unwrap();
    let graph = Arc::new(graph);

    let err = with_timeout(graph.run_named("all")).await.unwrap_err();
    // Siblings run to completion even though others failed.
    assert_eq!(log.count("end:slow"), 1);
    match err {
        ModbuildError::ParallelFailed(errors) => {
            let failed: Vec<_> = errors.iter().filter_map(|e| e.failed_task()).collect();
            assert_eq!(failed, vec!["bad1", "bad2"]);
        }
        other => panic!("expected ParallelFailed, got {other:?}"),
    }

    // All three started before the slow one finished.
    let slow_end = log.position("end:slow").unwrap();
    assert!(log.position("start:bad1").unwrap() < slow_end);
    assert!(log.position("start:bad2").unwrap() < slow_end);
}

#[tokio::test]
async fn single_parallel_failure_is_returned_unwrapped() {
    let log = EventLog::new();
    let mut graph = graph_with(vec![
        RecordingWork::new("ok", &log),
        RecordingWork::new("bad", &log).failing(),
    ]);
    graph.define_group("all", parallel(["ok", "bad"])).unwrap();
    let graph = Arc::new(graph);

    let err = with_timeout(graph.run_named("all")).await.unwrap_err();
    assert!(matches!(err, ModbuildError::TaskFailed { ref task, .. } if task == "bad"));
}

#[tokio::test]
async fn nested_groups_compose() {
    let log = EventLog::new();
    let mut graph = graph_with(vec![
        RecordingWork::new("vue", &log).delay_ms(10),
        RecordingWork::new("icons", &log),
        RecordingWork::new("min", &log),
    ]);
    graph
        .define_group(
            "build",
            TaskSpec::Series(vec![parallel(["vue", "icons"]), TaskSpec::named("min")]),
        )
        .unwrap();
    graph.validate().unwrap();
    let graph = Arc::new(graph);

    let report = with_timeout(graph.run_named("build")).await.unwrap();
    assert_eq!(report.len(), 3);
    let min_start = log.position("start:min").unwrap();
    assert!(log.position("end:vue").unwrap() < min_start);
    assert!(log.position("end:icons").unwrap() < min_start);
}

#[tokio::test]
async fn tasks_can_run_repeatedly() {
    let log = EventLog::new();
    let graph = Arc::new(graph_with(vec![RecordingWork::new("a", &log)]));

    graph.run_named("a").await.unwrap();
    graph.run_named("a").await.unwrap();
    assert_eq!(log.count("end:a"), 2);
}

#[tokio::test]
async fn unknown_names_are_rejected() {
    let log = EventLog::new();
    let mut graph = graph_with(vec![RecordingWork::new("a", &log)]);
    graph.define_group("all", series(["a", "ghost"])).unwrap();

    let err = graph.validate().unwrap_err();
    assert!(matches!(err, ModbuildError::TaskNotFound(ref msg) if msg.contains("ghost")));

    let graph = Arc::new(graph);
    let err = graph.run_named("nope").await.unwrap_err();
    assert!(matches!(err, ModbuildError::TaskNotFound(ref name) if name == "nope"));
}

#[tokio::test]
async fn self_containing_groups_are_cycles() {
    let log = EventLog::new();
    let mut graph = graph_with(vec![RecordingWork::new("a", &log)]);
    graph.define_group("x", series(["a", "y"])).unwrap();
    graph.define_group("y", series(["x"])).unwrap();

    assert!(matches!(graph.validate(), Err(ModbuildError::TaskCycle(_))));

    // Running anyway is caught at run time instead of recursing forever.
    let graph = Arc::new(graph);
    let err = with_timeout(graph.run_named("x")).await.unwrap_err();
    assert!(matches!(err, ModbuildError::TaskCycle(_)));
}

#[test]
fn duplicate_and_empty_names_are_config_errors() {
    let log = EventLog::new();
    let mut graph = graph_with(vec![RecordingWork::new("a", &log)]);

    let dup = graph.add_task(RecordingWork::new("a", &log).into_task());
    assert!(matches!(dup, Err(ModbuildError::ConfigError(_))));

    let dup_group = graph.define_group("a", series(["a"]));
    assert!(matches!(dup_group, Err(ModbuildError::ConfigError(_))));

    let empty = graph.define_group(" ", series(["a"]));
    assert!(matches!(empty, Err(ModbuildError::ConfigError(_))));

    assert_eq!(graph.names(), vec!["a"]);
}
