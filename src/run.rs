use std::path::{Path, PathBuf};

use tempfile::TempPath;

#[derive(Debug)]
enum RunPath {
    /// Created by the sort, deleted when dropped
    Scratch(TempPath),
    /// Provided by the caller, never deleted
    External(PathBuf),
}

/// Handle of a sorted, immutable run file
#[derive(Debug)]
pub(crate) struct Run {
    path: RunPath,
    sequence: usize,
    records: Option<usize>,
}

impl Run {
    pub(crate) fn scratch(path: TempPath, sequence: usize, records: usize) -> Run {
        Run {
            path: RunPath::Scratch(path),
            sequence,
            records: Some(records),
        }
    }

    pub(crate) fn external(path: PathBuf, sequence: usize) -> Run {
        Run {
            path: RunPath::External(path),
            sequence,
            records: None,
        }
    }

    pub(crate) fn path(&self) -> &Path {
        match &self.path {
            RunPath::Scratch(path) => &**path,
            RunPath::External(path) => path.as_path(),
        }
    }

    /// Provided by the caller rather than written by the sort
    pub(crate) fn is_external(&self) -> bool {
        matches!(self.path, RunPath::External(_))
    }

    /// Creation order, used to break ties between equal keys
    pub(crate) fn sequence(&self) -> usize {
        self.sequence
    }

    /// Same run under a new sequence number
    pub(crate) fn with_sequence(mut self, sequence: usize) -> Run {
        self.sequence = sequence;
        self
    }

    /// Number of records written to the run, not known for external runs
    pub(crate) fn records(&self) -> Option<usize> {
        self.records
    }

    /// Delete a scratch run now, external runs are left untouched
    pub(crate) fn remove(self) {
        if let RunPath::Scratch(path) = self.path {
            let display = path.to_path_buf();
            if let Err(e) = path.close() {
                log::warn!("Failed to remove run {}: {}", display.display(), e);
            }
        }
    }
}
