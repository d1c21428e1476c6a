//! In-memory fakes for the pipeline ports (testing only)
//!
//! Provides `MemoryEventLog`, `MemorySourceFile`, and `ScriptedCompletion`
//! that satisfy the trait contracts without touching disk or network.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use patchmend_llm::{CompletionApi, LlmError};

use crate::domain::{Event, EventKind, Result};
use crate::event_log::EventLog;
use crate::source_file::SourceFile;

// ---------------------------------------------------------------------------
// MemoryEventLog
// ---------------------------------------------------------------------------

/// Event log that keeps events in emission order.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<Event>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event appended so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind).collect()
    }

    pub fn of_kind(&self, kind: EventKind) -> Vec<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }
}

impl EventLog for MemoryEventLog {
    fn append(&self, event: &Event) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemorySourceFile
// ---------------------------------------------------------------------------

/// Target file held in memory, with switches to simulate I/O failures.
#[derive(Debug)]
pub struct MemorySourceFile {
    path: PathBuf,
    content: Mutex<String>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicU32,
}

impl MemorySourceFile {
    pub fn new(path: impl Into<PathBuf>, content: &str) -> Self {
        Self {
            path: path.into(),
            content: Mutex::new(content.to_string()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            writes: AtomicU32::new(0),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn content(&self) -> String {
        self.content.lock().unwrap().clone()
    }

    /// Number of successful writes.
    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }
}

fn denied(op: &str, path: &Path) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::PermissionDenied,
        format!("{op} {} denied", path.display()),
    )
}

impl SourceFile for MemorySourceFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<String> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(denied("read", &self.path).into());
        }
        Ok(self.content())
    }

    fn write(&self, content: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(denied("write", &self.path).into());
        }
        *self.content.lock().unwrap() = content.to_string();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScriptedCompletion
// ---------------------------------------------------------------------------

/// Completion double that replays scripted results in order.
///
/// Once the script runs out every further call fails with a retryable
/// transport error.
#[derive(Debug, Default)]
pub struct ScriptedCompletion {
    script: Mutex<VecDeque<std::result::Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicU32,
    delay: Option<Duration>,
}

impl ScriptedCompletion {
    pub fn new(script: Vec<std::result::Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Always answer with `text`.
    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// Sleep this long before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionApi for ScriptedCompletion {
    async fn complete(
        &self,
        _model: &str,
        prompt: &str,
        _max_tokens: u32,
    ) -> patchmend_llm::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(LlmError::Http("script exhausted".to_string())))
    }
}
