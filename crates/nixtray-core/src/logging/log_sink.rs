use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Local;
use tracing::{trace, warn};

/// Timestamp format used in block headers and status lines.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Append-only operator log made of titled, timestamped blocks.
///
/// Each block is a blank line, a `=== Title (timestamp) ===` header and
/// the given lines. Writing never fails the caller: IO errors are
/// reported through `tracing` and otherwise dropped.
#[derive(Debug, Clone)]
pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    /// Create a sink appending to `path`. The file is created lazily.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one titled block.
    pub fn block<S: AsRef<str>>(&self, title: &str, lines: &[S]) {
        let mut text = String::from("\n");
        text.push_str(&format!(
            "=== {} ({}) ===\n",
            title,
            Local::now().format(TIMESTAMP_FORMAT)
        ));
        for line in lines {
            let line = line.as_ref();
            text.push_str(line);
            if !line.ends_with('\n') {
                text.push('\n');
            }
        }

        if let Err(e) = self.append(&text) {
            warn!(log_path = ?self.path, title, error = %e, "Failed to write log block");
        } else {
            trace!(title, line_count = lines.len(), "Log block written");
        }
    }

    fn append(&self, text: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(text.as_bytes())
    }
}
