//! Per-session stream monitors.
//!
//! One [`StreamMonitor`] per terminal or preview session. Chunks accumulate
//! in a buffer behind a trailing-edge debounce timer: every new chunk cancels
//! and reschedules the pending timer, so classification runs once output
//! quiesces instead of once per write. Timers are owned per monitor and
//! cancelled on new input, on [`finish`](StreamMonitor::finish), and on drop;
//! monitors never share a timer.
//!
//! Preview hosts send structured messages rather than raw text; these render
//! to text and feed the same debounced path.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::alert::{Alert, AlertSource};
use crate::pipeline::AlertPipeline;

/// Structured messages from a sandboxed preview host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PreviewMessage {
    /// `console.error(...)` with its positional arguments.
    ConsoleError { args: Vec<String> },
    /// An uncaught exception with message and stack frames.
    UncaughtException { message: String, stack: Vec<String> },
    /// An unhandled promise rejection.
    UnhandledRejection { message: String },
}

impl PreviewMessage {
    /// Render to the text shape the classifier rules expect.
    fn render(&self) -> String {
        match self {
            PreviewMessage::ConsoleError { args } => {
                format!("console.error: {}", args.join(" "))
            }
            PreviewMessage::UncaughtException { message, stack } => {
                let mut text = format!("Uncaught {}", message);
                for frame in stack {
                    text.push('\n');
                    text.push_str(frame);
                }
                text
            }
            PreviewMessage::UnhandledRejection { message } => {
                format!("Uncaught (in promise) {}", message)
            }
        }
    }
}

/// Consumes one raw-text stream and flushes it through the pipeline once
/// output quiesces.
pub struct StreamMonitor {
    pipeline: Arc<AlertPipeline>,
    source: AlertSource,
    debounce: Duration,
    buffer: Arc<Mutex<String>>,
    timer: Option<JoinHandle<()>>,
}

impl StreamMonitor {
    pub fn new(pipeline: Arc<AlertPipeline>, source: AlertSource, debounce: Duration) -> Self {
        Self {
            pipeline,
            source,
            debounce,
            buffer: Arc::new(Mutex::new(String::new())),
            timer: None,
        }
    }

    /// Monitor for a command-execution shell stream.
    pub fn terminal(pipeline: Arc<AlertPipeline>, debounce: Duration) -> Self {
        Self::new(pipeline, AlertSource::Terminal, debounce)
    }

    /// Monitor for a sandboxed preview session.
    pub fn preview(pipeline: Arc<AlertPipeline>, debounce: Duration) -> Self {
        Self::new(pipeline, AlertSource::Preview, debounce)
    }

    /// Append a raw chunk and reschedule the quiescence timer.
    pub fn push_chunk(&mut self, chunk: &str) {
        lock_buffer(&self.buffer).push_str(chunk);
        self.reschedule();
    }

    /// Render a structured preview-host message into the same debounced path.
    pub fn push_preview_message(&mut self, message: PreviewMessage) {
        let text = message.render();
        debug!(source = %self.source, bytes = text.len(), "preview message buffered");
        let mut buffer = lock_buffer(&self.buffer);
        buffer.push_str(&text);
        buffer.push('\n');
        drop(buffer);
        self.reschedule();
    }

    /// Cancel the pending timer and flush whatever is buffered right now.
    ///
    /// Called on stream completion with the process exit code. A non-zero
    /// exit whose output matched no rule logs a warning; no alert is
    /// invented for it.
    pub fn finish(&mut self, exit_code: i32) -> Vec<Alert> {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        let had_output = !lock_buffer(&self.buffer).trim().is_empty();
        let alerts = flush(&self.pipeline, &self.buffer, self.source);
        debug!(source = %self.source, exit_code, created = alerts.len(), "stream finished");
        if exit_code != 0 && had_output && alerts.is_empty() {
            warn!(source = %self.source, exit_code, "stream exited non-zero with unclassified output");
        }
        alerts
    }

    fn reschedule(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        let pipeline = self.pipeline.clone();
        let buffer = self.buffer.clone();
        let source = self.source;
        let debounce = self.debounce;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            flush(&pipeline, &buffer, source);
        }));
    }
}

impl Drop for StreamMonitor {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

fn flush(pipeline: &AlertPipeline, buffer: &Mutex<String>, source: AlertSource) -> Vec<Alert> {
    let text = std::mem::take(&mut *lock_buffer(buffer));
    if text.trim().is_empty() {
        return Vec::new();
    }
    pipeline.process_chunk(source, &text)
}

/// The buffer only ever sees appends and takes; a holder that panicked
/// leaves it in a usable state, so poison is recovered rather than surfaced.
fn lock_buffer(buffer: &Mutex<String>) -> MutexGuard<'_, String> {
    buffer.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
