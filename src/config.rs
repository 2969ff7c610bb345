use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;

use regex::bytes::Regex;

use crate::error::{Result, SortError};
use crate::key::KeyExtractor;
use crate::line_record::LineRecord;
use crate::order::Order;

/// Default memory budget of a batch, in bytes
pub const DEFAULT_MEMORY_BUDGET_BYTES: u64 = 4096;
/// Default maximum size of an input file, in bytes
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 100_000_000;
/// Default maximum number of runs merged at once
pub const DEFAULT_MAX_OPEN_RUNS: usize = 1024;
/// Default read/write buffer size of run and output files
pub const DEFAULT_RW_BUF_SIZE: usize = 64 * 1024;

/// Environment variable overriding the memory budget
pub const MEMORY_BUDGET_ENV: &str = "EX_SORT_MAX_BUFFER";
/// Environment variable overriding the maximum input file size
pub const MAX_INPUT_ENV: &str = "EX_SORT_MAX_FILE";

/// What to do with a record that alone exceeds the memory budget
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OversizedRecordPolicy {
    /// Fail the job with [SortError::BudgetTooSmall]
    #[default]
    Reject,
    /// Accept the record and flush its batch as a run right away
    Flush,
}

#[derive(Clone)]
pub(crate) struct Config {
    tmp: PathBuf,
    tmp_prefix: String,
    run_prefix: String,
    run_suffix: String,
    memory_budget_bytes: u64,
    max_input_bytes: u64,
    max_open_runs: usize,
    rw_buf_size: usize,
    key: Arc<dyn KeyExtractor>,
    order: Order,
    ignore_empty: bool,
    ignore_lines: Option<Regex>,
    oversized_record_policy: OversizedRecordPolicy,
    prefix: Vec<String>,
    suffix: Vec<String>,
    endl: u8,
}

impl Config {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        tmp: PathBuf,
        memory_budget_bytes: u64,
        max_input_bytes: u64,
        max_open_runs: usize,
        rw_buf_size: usize,
        key: Arc<dyn KeyExtractor>,
        order: Order,
        ignore_empty: bool,
        ignore_lines: Option<Regex>,
        oversized_record_policy: OversizedRecordPolicy,
        prefix: Vec<String>,
        suffix: Vec<String>,
        endl: u8,
    ) -> Result<Config> {
        if memory_budget_bytes == 0 {
            return Err(SortError::invalid_configuration("memory budget must be a positive number of bytes"));
        }
        if max_open_runs < 2 {
            return Err(SortError::invalid_configuration(
                format!("at least 2 open runs are required to merge, got {}", max_open_runs)
            ));
        }
        if rw_buf_size == 0 {
            return Err(SortError::invalid_configuration("read/write buffer size must be positive"));
        }

        Ok(
            Config {
                tmp,
                tmp_prefix: "_external_sorter_".to_string(),
                run_prefix: "run-".to_string(),
                run_suffix: ".sorted".to_string(),
                memory_budget_bytes,
                max_input_bytes,
                max_open_runs,
                rw_buf_size,
                key,
                order,
                ignore_empty,
                ignore_lines,
                oversized_record_policy,
                prefix,
                suffix,
                endl,
            }
        )
    }

    pub(crate) fn tmp(&self) -> &PathBuf {
        &self.tmp
    }

    pub(crate) fn tmp_prefix(&self) -> &str {
        &self.tmp_prefix
    }

    pub(crate) fn run_prefix(&self) -> &str {
        &self.run_prefix
    }

    pub(crate) fn run_suffix(&self) -> &str {
        &self.run_suffix
    }

    pub(crate) fn memory_budget_bytes(&self) -> u64 {
        self.memory_budget_bytes
    }

    pub(crate) fn max_input_bytes(&self) -> u64 {
        self.max_input_bytes
    }

    pub(crate) fn max_open_runs(&self) -> usize {
        self.max_open_runs
    }

    pub(crate) fn rw_buf_size(&self) -> usize {
        self.rw_buf_size
    }

    pub(crate) fn key(&self) -> &dyn KeyExtractor {
        self.key.as_ref()
    }

    pub(crate) fn order(&self) -> Order {
        self.order
    }

    pub(crate) fn oversized_record_policy(&self) -> OversizedRecordPolicy {
        self.oversized_record_policy
    }

    pub(crate) fn prefix(&self) -> &Vec<String> {
        &self.prefix
    }

    pub(crate) fn suffix(&self) -> &Vec<String> {
        &self.suffix
    }

    pub(crate) fn endl(&self) -> u8 {
        self.endl
    }

    /// Order of two records under the configured key and order
    pub(crate) fn compare(&self, a: &LineRecord, b: &LineRecord) -> Ordering {
        self.order.apply(a.key().cmp(b.key()))
    }

    /// Lines skipped by the ignore rules never become records
    pub(crate) fn is_ignored(&self, line: &[u8]) -> bool {
        if self.ignore_empty && line.iter().all(|b| b.is_ascii_whitespace()) {
            return true;
        }
        match &self.ignore_lines {
            Some(r) => r.is_match(line),
            None => false,
        }
    }
}

/// Parse an override value. Missing, empty or non-numeric values fall back to `default`.
pub fn parse_override(name: &str, value: Option<&str>, default: u64) -> u64 {
    match value.map(str::trim) {
        None | Some("") => default,
        Some(v) => match v.parse::<u64>() {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("Ignoring {}={:?}: {}, using default {}", name, v, e, default);
                default
            }
        }
    }
}

/// Read an override from the environment, see [parse_override]
pub fn env_override(name: &str, default: u64) -> u64 {
    let value = std::env::var(name).ok();
    parse_override(name, value.as_deref(), default)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use regex::bytes::Regex;

    use crate::config::{parse_override, Config, OversizedRecordPolicy};
    use crate::key::PrefixKey;
    use crate::line_record::LineRecord;
    use crate::order::Order;

    fn config(memory_budget_bytes: u64, max_open_runs: usize, order: Order) -> crate::error::Result<Config> {
        Config::new(
            std::env::temp_dir(),
            memory_budget_bytes,
            u64::MAX,
            max_open_runs,
            1024,
            Arc::new(PrefixKey::new(3)),
            order,
            true,
            Some(Regex::new("^#").unwrap()),
            OversizedRecordPolicy::Reject,
            vec![],
            vec![],
            b'\n',
        )
    }

    #[test]
    fn test_parse_override() {
        assert_eq!(parse_override("X", None, 50), 50);
        assert_eq!(parse_override("X", Some(""), 50), 50);
        assert_eq!(parse_override("X", Some("   "), 50), 50);
        assert_eq!(parse_override("X", Some("abc"), 50), 50);
        assert_eq!(parse_override("X", Some("-3"), 50), 50);
        assert_eq!(parse_override("X", Some(" 120 "), 50), 120);
        assert_eq!(parse_override("X", Some("0"), 50), 0);
    }

    #[test]
    fn test_validation() {
        let error = config(0, 16, Order::Asc).err().unwrap();
        assert_eq!(error.category(), "invalid configuration");
        let error = config(10, 1, Order::Asc).err().unwrap();
        assert!(error.to_string().contains("at least 2 open runs"));
        assert!(config(10, 2, Order::Asc).is_ok());
        assert_eq!(PathBuf::from(config(10, 2, Order::Asc).unwrap().tmp()), std::env::temp_dir());
    }

    #[test]
    fn test_compare_and_ignore() -> Result<(), anyhow::Error> {
        let asc = config(10, 2, Order::Asc)?;
        let desc = config(10, 2, Order::Desc)?;
        let a = LineRecord::new(b"aaa-1".to_vec(), asc.key()).unwrap();
        let b = LineRecord::new(b"bbb-0".to_vec(), asc.key()).unwrap();
        assert!(asc.compare(&a, &b).is_lt());
        assert!(desc.compare(&a, &b).is_gt());

        assert!(asc.is_ignored(b""));
        assert!(asc.is_ignored(b" \t"));
        assert!(asc.is_ignored(b"# comment"));
        assert!(!asc.is_ignored(b"a # b"));
        Ok(())
    }
}
