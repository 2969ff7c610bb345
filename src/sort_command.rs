use std::path::PathBuf;

use crate::config::DEFAULT_MAX_OPEN_RUNS;
use crate::error::{Result, SortError};
use crate::key::{PrefixKey, DEFAULT_KEY_LENGTH};
use crate::order::Order;
use crate::sort::{Sort, SortSummary};

/// Sort `sort_dir/sort_file` into `sort_dir/sorted_file`, keeping runs under `tmp_dir`.
///
/// The memory budget and maximum input size start from their defaults, then the
/// `EX_SORT_MAX_BUFFER` and `EX_SORT_MAX_FILE` environment overrides apply, then an explicit
/// [SortCommand::with_memory_budget_bytes].
pub struct SortCommand {
    sort_dir: PathBuf,
    sort_file: PathBuf,
    tmp_dir: PathBuf,
    sorted_file: PathBuf,
    memory_budget_bytes: Option<u64>,
    key_length: usize,
    order: Order,
    max_open_runs: usize,
}

impl SortCommand {
    /// Create a command with the default key length, order and fan-in
    pub fn new(sort_dir: PathBuf, sort_file: PathBuf, tmp_dir: PathBuf, sorted_file: PathBuf) -> SortCommand {
        SortCommand {
            sort_dir,
            sort_file,
            tmp_dir,
            sorted_file,
            memory_budget_bytes: None,
            key_length: DEFAULT_KEY_LENGTH,
            order: Order::Asc,
            max_open_runs: DEFAULT_MAX_OPEN_RUNS,
        }
    }

    /// Set the memory budget, overriding the default and `EX_SORT_MAX_BUFFER`
    pub fn with_memory_budget_bytes(&mut self, memory_budget_bytes: u64) {
        self.memory_budget_bytes = Some(memory_budget_bytes);
    }

    /// Set the number of leading bytes of each line to sort by
    pub fn with_key_length(&mut self, key_length: usize) {
        self.key_length = key_length;
    }

    /// Set [Order]
    pub fn with_order(&mut self, order: Order) {
        self.order = order;
    }

    /// Set the maximum number of runs merged at once
    pub fn with_max_open_runs(&mut self, max_open_runs: usize) {
        self.max_open_runs = max_open_runs;
    }

    /// The file to sort, `sort_dir/sort_file`
    pub fn input(&self) -> PathBuf {
        self.sort_dir.join(&self.sort_file)
    }

    /// The sorted file, `sort_dir/sorted_file`
    pub fn output(&self) -> PathBuf {
        self.sort_dir.join(&self.sorted_file)
    }

    /// Check the sort directory, then sort the input into the output
    pub fn execute(&self) -> Result<SortSummary> {
        if !self.sort_dir.is_dir() {
            return Err(SortError::invalid_configuration(
                format!("the sort directory does not exist or is not a directory: {}", self.sort_dir.display())
            ));
        }
        if self.key_length == 0 {
            return Err(SortError::invalid_configuration("the key length must be at least 1 byte"));
        }

        let mut sort = Sort::new(vec![self.input()], self.output());
        sort.with_tmp_dir(self.tmp_dir.clone());
        sort.with_env_overrides();
        if let Some(memory_budget_bytes) = self.memory_budget_bytes {
            sort.with_memory_budget_bytes(memory_budget_bytes);
        }
        sort.with_key(PrefixKey::new(self.key_length));
        sort.with_order(self.order);
        sort.with_max_open_runs(self.max_open_runs);
        sort.sort()
    }
}

/// The one line a caller shows for the outcome of [SortCommand::execute]
pub fn status(result: &Result<SortSummary>) -> String {
    match result {
        Ok(summary) => format!(
            "Your file sort is successful, please check results at: {}",
            summary.output().display()
        ),
        Err(e) => format!("Your file sort failed ({}): {}", e.category(), e),
    }
}
