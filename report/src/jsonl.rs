//! JSON-lines result writer

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use planbench_core::{ListenerError, SampleEvent, SampleListener, SampleResult, ThreadInfo};

use crate::error::ReportResult;

/// One line of output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultRecord {
    /// Sample start time
    pub timestamp: DateTime<Utc>,
    /// Elapsed time in milliseconds
    pub elapsed_ms: f64,
    /// Sample label
    pub label: String,
    /// Producing thread name
    pub thread: String,
    /// Plan path down to the producing element
    pub path: Vec<String>,
    /// Whether the sample succeeded
    pub success: bool,
    /// Response code
    pub response_code: String,
    /// Response message
    pub response_message: String,
    /// Messages of failing assertions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
    /// Number of wrapped child results (transaction aggregates)
    #[serde(default)]
    pub children: usize,
}

impl ResultRecord {
    /// Flatten an event
    pub fn from_event(event: &SampleEvent) -> Self {
        let result: &SampleResult = &event.result;
        Self {
            timestamp: result.start_time,
            elapsed_ms: result.elapsed_ms(),
            label: result.label.clone(),
            thread: event.thread.name.clone(),
            path: event.path.to_vec(),
            success: result.success,
            response_code: result.response_code.clone(),
            response_message: result.response_message.clone(),
            failures: result
                .assertion_results
                .iter()
                .filter(|a| a.is_failure())
                .map(|a| a.message.clone())
                .collect(),
            children: result.children.len(),
        }
    }
}

/// Writes one [`ResultRecord`] per delivered event
pub struct JsonLinesWriter<W: Write + Send> {
    writer: Mutex<BufWriter<W>>,
}

impl JsonLinesWriter<File> {
    /// Create (or truncate) the output file
    pub fn create(path: impl AsRef<Path>) -> ReportResult<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self::new(file))
    }
}

impl<W: Write + Send> JsonLinesWriter<W> {
    /// Wrap any writer
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
        }
    }

    /// Flush buffered lines
    pub fn flush(&self) -> Result<(), ListenerError> {
        let mut writer = self.lock()?;
        writer.flush()?;
        Ok(())
    }

    /// Flush and return the inner writer
    pub fn into_inner(self) -> Result<W, ListenerError> {
        let writer = self
            .writer
            .into_inner()
            .map_err(|_| ListenerError::Unavailable("writer lock poisoned".into()))?;
        writer
            .into_inner()
            .map_err(|e| ListenerError::Io(e.into_error()))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BufWriter<W>>, ListenerError> {
        self.writer
            .lock()
            .map_err(|_| ListenerError::Unavailable("writer lock poisoned".into()))
    }
}

impl<W: Write + Send> SampleListener for JsonLinesWriter<W> {
    fn sample_occurred(&self, event: &SampleEvent) -> Result<(), ListenerError> {
        let line = serde_json::to_string(&ResultRecord::from_event(event))?;
        let mut writer = self.lock()?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn thread_finished(&self, thread: &ThreadInfo) {
        if let Err(e) = self.flush() {
            tracing::warn!(thread = %thread.name, error = %e, "Failed to flush result file");
        }
    }
}
