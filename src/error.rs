//! Error taxonomy of a sort job.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for sort operations
pub type Result<T> = std::result::Result<T, SortError>;

/// Every failure a sort job can surface. All of them are fatal to the job.
#[derive(Error, Debug)]
pub enum SortError {
    /// Bad budget, bad fan-in or bad paths. Detected before any file is created.
    #[error("{reason}")]
    InvalidConfiguration {
        /// What is wrong with the configuration
        reason: String,
    },

    /// A record does not carry a sort key, e.g. it is shorter than the key length.
    #[error("{}, line {line_number}: record {line:?} has no sort key, expected {expected}", path.display())]
    MalformedRecord {
        /// File holding the record
        path: PathBuf,
        /// 1-based line number within the file
        line_number: usize,
        /// The offending line, lossily decoded
        line: String,
        /// Description of the key the extractor expects
        expected: String,
    },

    /// Read, write, open, close or rename failure.
    #[error("path: {}, error: {source}", path.display())]
    IoFailure {
        /// File or directory the operation failed on
        path: PathBuf,
        /// The underlying error
        #[source]
        source: io::Error,
    },

    /// A run is not sorted, or holds a keyless record, when it is read back.
    #[error("{}, line {line_number}: {reason}", path.display())]
    CorruptRun {
        /// The run file
        path: PathBuf,
        /// 1-based line number within the run
        line_number: usize,
        /// What was found
        reason: String,
    },

    /// A single record does not fit into one batch.
    #[error("{}, line {line_number}: record takes {record_bytes} bytes, memory budget is {budget} bytes", path.display())]
    BudgetTooSmall {
        /// File holding the record
        path: PathBuf,
        /// 1-based line number within the file
        line_number: usize,
        /// Accounted size of the record
        record_bytes: u64,
        /// The configured memory budget
        budget: u64,
    },
}

impl SortError {
    pub(crate) fn invalid_configuration(reason: impl Into<String>) -> SortError {
        SortError::InvalidConfiguration { reason: reason.into() }
    }

    /// Short label of the error category, used in user facing status messages.
    pub fn category(&self) -> &'static str {
        match self {
            SortError::InvalidConfiguration { .. } => "invalid configuration",
            SortError::MalformedRecord { .. } => "malformed record",
            SortError::IoFailure { .. } => "I/O failure",
            SortError::CorruptRun { .. } => "corrupt run",
            SortError::BudgetTooSmall { .. } => "budget too small",
        }
    }

    /// The path the error refers to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            SortError::InvalidConfiguration { .. } => None,
            SortError::MalformedRecord { path, .. }
            | SortError::IoFailure { path, .. }
            | SortError::CorruptRun { path, .. }
            | SortError::BudgetTooSmall { path, .. } => Some(path.as_path()),
        }
    }
}

/// Attach the offending path to an [io::Error].
pub(crate) trait IoContext<T> {
    fn at_path(self, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at_path(self, path: &Path) -> Result<T> {
        self.map_err(|source| SortError::IoFailure {
            path: path.to_path_buf(),
            source,
        })
    }
}
