//! Event-log summaries for operators and CI.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Event, EventKind, Result};

/// Per-run view of an event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub events: usize,
    /// `service`, `fallback` or `failed`; `None` while a run has no terminal event.
    pub final_mode: Option<String>,
}

/// Whole-log summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogSummary {
    pub total_events: usize,
    pub by_kind: BTreeMap<String, usize>,
    /// Runs in order of first appearance.
    pub runs: Vec<RunSummary>,
    pub malformed_lines: usize,
}

impl EventLogSummary {
    pub fn run(&self, run_id: &str) -> Option<&RunSummary> {
        self.runs.iter().find(|r| r.run_id == run_id)
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.by_kind.get(kind.as_str()).copied().unwrap_or(0)
    }
}

/// Summarise a JSON-lines event log. Unparseable lines are counted, not fatal.
pub fn summarize<R: BufRead>(reader: R) -> Result<EventLogSummary> {
    let mut summary = EventLogSummary::default();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: Event = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(_) => {
                summary.malformed_lines += 1;
                continue;
            }
        };

        summary.total_events += 1;
        *summary
            .by_kind
            .entry(event.kind.as_str().to_string())
            .or_insert(0) += 1;

        let Some(run_id) = event.run_id() else {
            continue;
        };
        let idx = match summary.runs.iter().position(|r| r.run_id == run_id) {
            Some(idx) => idx,
            None => {
                summary.runs.push(RunSummary {
                    run_id: run_id.to_string(),
                    events: 0,
                    final_mode: None,
                });
                summary.runs.len() - 1
            }
        };
        let run = &mut summary.runs[idx];
        run.events += 1;
        if let Some(mode) = terminal_mode(&event) {
            run.final_mode = Some(mode.to_string());
        }
    }

    Ok(summary)
}

/// Summarise the log at `path`.
pub fn summarize_file(path: &Path) -> Result<EventLogSummary> {
    let file = File::open(path)?;
    summarize(BufReader::new(file))
}

fn terminal_mode(event: &Event) -> Option<&str> {
    match event.kind {
        EventKind::Applied => event.payload.get("mode").and_then(|m| m.as_str()),
        EventKind::ModeSwitch => event
            .payload
            .get("to")
            .and_then(|t| t.as_str())
            .filter(|to| *to == "failed"),
        _ => None,
    }
}

/// Render a plain-text summary.
pub fn render_summary(summary: &EventLogSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "events: {} ({} malformed lines skipped)\n",
        summary.total_events, summary.malformed_lines
    ));
    for (kind, count) in &summary.by_kind {
        out.push_str(&format!("  {kind}: {count}\n"));
    }
    out.push_str(&format!("runs: {}\n", summary.runs.len()));
    for run in &summary.runs {
        out.push_str(&format!(
            "  {} events={} mode={}\n",
            run.run_id,
            run.events,
            run.final_mode.as_deref().unwrap_or("incomplete")
        ));
    }
    out
}
