//! Logging trait for backend client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows callers to
//! capture every query response and stream event passing through the
//! [`DevAssistant`](crate::DevAssistant) client, plus [`JsonLinesLogger`],
//! which appends them to a file as JSON lines.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;

use crate::{Error, QueryResponse, Result, StreamEvent};

/// A trait for logging client operations.
///
/// # Example
///
/// ```rust,ignore
/// use devconsole::{ClientLogger, QueryResponse, StreamEvent};
///
/// struct StderrLogger;
///
/// impl ClientLogger for StderrLogger {
///     fn log_response(&self, response: &QueryResponse) {
///         eprintln!("response for {}", response.session_id);
///     }
///
///     fn log_stream_event(&self, event: &StreamEvent) {
///         eprintln!("event: {}", event.kind());
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a complete response from a non-streaming `query` call.
    fn log_response(&self, response: &QueryResponse);

    /// Log an individual streaming event, in arrival order.
    fn log_stream_event(&self, event: &StreamEvent);

    /// Log a stream item that failed to decode or a transport failure.
    fn log_stream_error(&self, _error: &Error) {}
}

/// Appends each logged item to a file as one JSON object per line.
pub struct JsonLinesLogger {
    file: Mutex<BufWriter<File>>,
}

#[derive(Serialize)]
#[serde(tag = "log", rename_all = "snake_case")]
enum LogRecord<'a> {
    Response { response: &'a QueryResponse },
    Event { event: &'a StreamEvent },
    StreamError { error: String },
}

impl JsonLinesLogger {
    /// Opens `path` for appending, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(|err| Error::io("failed to open client log", err))?;
        Ok(Self {
            file: Mutex::new(BufWriter::new(file)),
        })
    }

    fn write(&self, record: &LogRecord<'_>) {
        // Logging never fails the operation being logged.
        let Ok(line) = serde_json::to_string(record) else {
            return;
        };
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{line}");
            let _ = file.flush();
        }
    }
}

impl ClientLogger for JsonLinesLogger {
    fn log_response(&self, response: &QueryResponse) {
        self.write(&LogRecord::Response { response });
    }

    fn log_stream_event(&self, event: &StreamEvent) {
        self.write(&LogRecord::Event { event });
    }

    fn log_stream_error(&self, error: &Error) {
        self.write(&LogRecord::StreamError {
            error: error.to_string(),
        });
    }
}
