//! File-backed event log and the report built on top of it.

use std::sync::Arc;
use std::thread;

use patchmend_core::fakes::MemorySourceFile;
use patchmend_core::{
    summarize_file, Event, EventKind, EventLog, EventRecorder, JsonlEventLog, Orchestrator,
    PipelineConfig, ServiceError,
};
use serde_json::json;
use tempfile::TempDir;

fn read_events(path: &std::path::Path) -> Vec<Event> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).expect("every line is a complete event"))
        .collect()
}

#[test]
fn test_appends_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("logs").join("agent.log");

    {
        let log: Arc<dyn EventLog> = Arc::new(JsonlEventLog::open(&path).unwrap());
        let recorder = EventRecorder::new(log, "run-1");
        recorder.record(EventKind::Request, json!({"attempt": 1}));
    }
    {
        let log: Arc<dyn EventLog> = Arc::new(JsonlEventLog::open(&path).unwrap());
        let recorder = EventRecorder::new(log, "run-2");
        recorder.record(EventKind::ModeSwitch, json!({"from": "service", "to": "fallback"}));
    }

    let events = read_events(&path);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].run_id(), Some("run-1"));
    assert_eq!(events[1].kind, EventKind::ModeSwitch);
    assert_eq!(events[1].payload["to"], "fallback");
}

#[test]
fn test_concurrent_appends_never_interleave() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("agent.log");
    let log: Arc<dyn EventLog> = Arc::new(JsonlEventLog::open(&path).unwrap());
    let big = "x".repeat(16 * 1024);

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let recorder = EventRecorder::new(Arc::clone(&log), format!("run-{n}"));
            let big = big.clone();
            thread::spawn(move || {
                for attempt in 0..10 {
                    recorder.record(EventKind::Response, json!({"attempt": attempt, "raw": big}));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(read_events(&path).len(), 80);
}

#[tokio::test]
async fn test_report_reads_back_orchestrated_runs() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("agent.log");
    let log = Arc::new(JsonlEventLog::open(&path).unwrap());
    let file = Arc::new(MemorySourceFile::new(
        "imports.py",
        "class ImportItem:\n    pass\n",
    ));
    let orchestrator = Orchestrator::new(&PipelineConfig::default(), file.clone(), log).unwrap();

    let first = orchestrator.run(Err(ServiceError::Disabled)).await;
    file.fail_reads(true);
    let second = orchestrator.run(Err(ServiceError::Disabled)).await;

    let summary = summarize_file(&path).unwrap();
    assert_eq!(summary.malformed_lines, 0);
    assert_eq!(summary.runs.len(), 2);
    assert_eq!(summary.count(EventKind::ModeSwitch), 3);
    assert_eq!(summary.count(EventKind::Applied), 1);

    let first_summary = summary.run(&first.run_id.to_string()).unwrap();
    assert_eq!(first_summary.final_mode.as_deref(), Some("fallback"));
    let second_summary = summary.run(&second.run_id.to_string()).unwrap();
    assert_eq!(second_summary.final_mode.as_deref(), Some("failed"));
}

#[test]
fn test_report_tolerates_a_torn_last_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("agent.log");
    let log: Arc<dyn EventLog> = Arc::new(JsonlEventLog::open(&path).unwrap());
    EventRecorder::new(log, "run-1").record(EventKind::Applied, json!({"mode": "service"}));

    let mut raw = std::fs::read_to_string(&path).unwrap();
    raw.push_str("{\"timestamp\":\"2026-");
    std::fs::write(&path, raw).unwrap();

    let summary = summarize_file(&path).unwrap();
    assert_eq!(summary.total_events, 1);
    assert_eq!(summary.malformed_lines, 1);
    assert_eq!(
        summary.run("run-1").unwrap().final_mode.as_deref(),
        Some("service")
    );
}
