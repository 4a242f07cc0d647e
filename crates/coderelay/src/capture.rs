//! Per-submission output capture.
//!
//! Each submission gets its own `Capture`, registered with the compiler event
//! loop before the code is written and closed once the wait window ends.
//! Output is only ever appended to the capture that is open when it arrives.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;

use crate::bridge::protocol::{NO_OUTPUT_SENTINEL, SubmissionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    /// Collecting output.
    Open,
    /// End marker seen; no more output accepted.
    Completed,
    /// Compiler went away while the window was open.
    Failed,
    /// Wait window over; no more output accepted.
    Closed,
}

impl CaptureStatus {
    pub fn accepts_output(&self) -> bool {
        matches!(self, Self::Open)
    }
}

pub struct Capture {
    id: SubmissionId,
    started_at: Instant,
    status: CaptureStatus,
    output: String,
    end_marker: Option<String>,
    error: Option<String>,
    completion: Arc<Notify>,
}

impl Capture {
    pub fn new(id: SubmissionId, end_marker: Option<String>) -> Self {
        Self {
            id,
            started_at: Instant::now(),
            status: CaptureStatus::Open,
            output: String::new(),
            end_marker: end_marker.filter(|m| !m.is_empty()),
            error: None,
            completion: Arc::new(Notify::new()),
        }
    }

    pub fn id(&self) -> SubmissionId {
        self.id
    }

    pub fn status(&self) -> CaptureStatus {
        self.status
    }

    /// True once the capture no longer needs the wait window to run out.
    pub fn is_settled(&self) -> bool {
        matches!(self.status, CaptureStatus::Completed | CaptureStatus::Failed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Append a chunk of compiler output.
    ///
    /// Returns `false` if the capture is no longer open and the chunk was
    /// not taken.
    pub fn append(&mut self, chunk: &str) -> bool {
        if !self.status.accepts_output() {
            return false;
        }
        self.output.push_str(chunk);

        if let Some(marker) = &self.end_marker
            && let Some(pos) = self.output.find(marker.as_str())
        {
            self.output.truncate(pos);
            self.status = CaptureStatus::Completed;
            self.completion.notify_one();
        }
        true
    }

    pub fn set_failed(&mut self, error: String) {
        if !self.status.accepts_output() {
            return;
        }
        self.status = CaptureStatus::Failed;
        self.error = Some(error);
        self.completion.notify_one();
    }

    /// End the window (if still open) and hand back what was collected.
    pub fn close(&mut self) -> CompileResult {
        if self.status == CaptureStatus::Open {
            self.status = CaptureStatus::Closed;
        }
        CompileResult {
            id: self.id,
            output: std::mem::take(&mut self.output),
            elapsed: self.elapsed(),
            completed_by_marker: self.status == CaptureStatus::Completed,
        }
    }

    pub fn completion(&self) -> Arc<Notify> {
        Arc::clone(&self.completion)
    }
}

/// What a submission produced.
#[derive(Debug, Clone)]
pub struct CompileResult {
    pub id: SubmissionId,
    /// Text captured from stdout and stderr, in arrival order.
    pub output: String,
    pub elapsed: Duration,
    /// The configured end marker arrived before the wait window ran out.
    pub completed_by_marker: bool,
}

impl CompileResult {
    /// Response body: the captured text, or the sentinel when nothing came back.
    pub fn body(&self) -> &str {
        if self.output.is_empty() {
            NO_OUTPUT_SENTINEL
        } else {
            &self.output
        }
    }

    pub fn into_body(self) -> String {
        if self.output.is_empty() {
            NO_OUTPUT_SENTINEL.to_string()
        } else {
            self.output
        }
    }
}
