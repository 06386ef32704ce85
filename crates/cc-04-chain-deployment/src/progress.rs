//! # Progress Reporting
//!
//! Human-readable progress lines emitted while a deployment runs. Sinks never
//! fail the workflow: write errors are swallowed.

use parking_lot::Mutex;
use std::io::Write;
use tracing::info;

pub trait ProgressSink: Send + Sync {
    fn line(&self, text: &str);
}

/// Discards everything.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn line(&self, _text: &str) {}
}

/// Forwards lines to `tracing` at info level.
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn line(&self, text: &str) {
        info!(target: "deployment", "{text}");
    }
}

/// Writes one line per call to any `io::Write`.
pub struct WriterProgress<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> WriterProgress<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> ProgressSink for WriterProgress<W> {
    fn line(&self, text: &str) {
        let mut out = self.out.lock();
        let _ = writeln!(out, "{text}");
    }
}

/// Sink plus the prefix put in front of every line.
pub(crate) struct Progress<'a> {
    sink: &'a dyn ProgressSink,
    prefix: &'a str,
}

impl<'a> Progress<'a> {
    pub(crate) fn new(sink: &'a dyn ProgressSink, prefix: &'a str) -> Self {
        Self { sink, prefix }
    }

    pub(crate) fn ok(&self, what: &str) {
        self.sink.line(&format!("{}{what}.. OK", self.prefix));
    }

    pub(crate) fn failed(&self, what: &str, err: &dyn std::fmt::Display) {
        self.sink.line(&format!("{}{what}.. FAILED: {err}", self.prefix));
    }

    pub(crate) fn say(&self, text: &str) {
        self.sink.line(&format!("{}{text}", self.prefix));
    }
}
