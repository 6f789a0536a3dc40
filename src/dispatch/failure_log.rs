//! Append-only record of identifiers whose request timed out or was rejected.
//! Never read back; a breadcrumb for operators.

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default location, relative to the working directory.
pub const DEFAULT_FAILURE_LOG: &str = "./failed.txt";

#[derive(Debug, Clone)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line per identifier, creating the file if needed.
    pub fn append<S: AsRef<str>>(&self, identifiers: &[S]) -> io::Result<()> {
        if identifiers.is_empty() {
            return Ok(());
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut out = BufWriter::new(file);
        for identifier in identifiers {
            writeln!(out, "{}", identifier.as_ref())?;
        }
        out.flush()
    }
}

impl Default for FailureLog {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_LOG)
    }
}
