//! Append-only structured event log.
//!
//! One JSON object per line: `{"timestamp", "kind", "payload"}`. Each append
//! is serialised in full before a single write, so a crash can lose at most
//! the record being written and never corrupts earlier ones.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::domain::{Event, EventKind, Result};
use crate::obs;

/// Append-only event sink.
pub trait EventLog: Send + Sync {
    /// Append one event. Records are never rewritten.
    fn append(&self, event: &Event) -> Result<()>;
}

/// JSON-lines file sink.
#[derive(Debug)]
pub struct JsonlEventLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlEventLog {
    /// Open (creating if needed) `path` in append mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Serialise `event` as one newline-terminated line.
pub fn encode_line(event: &Event) -> Result<Vec<u8>> {
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    Ok(line)
}

impl EventLog for JsonlEventLog {
    fn append(&self, event: &Event) -> Result<()> {
        let line = encode_line(event)?;
        // A poisoned lock only means another append panicked mid-call; the
        // file handle itself is still usable.
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }
}

/// Run-scoped handle that stamps `run_id` into every payload.
///
/// Append failures are reported through tracing and swallowed: losing an
/// audit line must not change the outcome of a patch run.
#[derive(Clone)]
pub struct EventRecorder {
    log: Arc<dyn EventLog>,
    run_id: String,
}

impl EventRecorder {
    pub fn new(log: Arc<dyn EventLog>, run_id: impl Into<String>) -> Self {
        Self {
            log,
            run_id: run_id.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Append an event of `kind`; non-object payloads are nested under `value`.
    pub fn record(&self, kind: EventKind, payload: Value) -> Event {
        let payload = match payload {
            Value::Object(mut map) => {
                map.insert("run_id".to_string(), Value::String(self.run_id.clone()));
                Value::Object(map)
            }
            other => serde_json::json!({ "run_id": self.run_id, "value": other }),
        };
        let event = Event::new(kind, payload);
        if let Err(err) = self.log.append(&event) {
            obs::emit_event_log_error(&self.run_id, kind.as_str(), &err);
        }
        event
    }
}
