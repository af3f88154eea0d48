//! Destinations for ranking reports.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

/// Where periodic reports are written.
#[derive(Debug, Clone, Default)]
pub enum ReportSink {
    /// Standard output.
    #[default]
    Stdout,
    /// Appended to a file, created if missing.
    File(PathBuf),
    /// Shared in-memory buffer.
    Buffer(Arc<Mutex<Vec<u8>>>),
}

impl ReportSink {
    /// In-memory sink plus a handle to read what was written.
    #[must_use]
    pub fn buffer() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        (Self::Buffer(Arc::clone(&buffer)), buffer)
    }

    /// Write one rendered report.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying writer fails.
    pub fn write(&self, report: &str) -> io::Result<()> {
        match self {
            Self::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(report.as_bytes())?;
                out.flush()
            }
            Self::File(path) => {
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                file.write_all(report.as_bytes())
            }
            Self::Buffer(buffer) => {
                buffer.lock().extend_from_slice(report.as_bytes());
                Ok(())
            }
        }
    }
}
