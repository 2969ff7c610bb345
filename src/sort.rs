use std::cmp::{max, min};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::bytes::Regex;
use rlimit::{getrlimit, Resource, setrlimit};
use tempfile::NamedTempFile;

use crate::config::{
    env_override, Config, OversizedRecordPolicy, DEFAULT_MAX_INPUT_BYTES, DEFAULT_MAX_OPEN_RUNS,
    DEFAULT_MEMORY_BUDGET_BYTES, DEFAULT_RW_BUF_SIZE, MAX_INPUT_ENV, MEMORY_BUDGET_ENV,
};
use crate::error::{IoContext, Result, SortError};
use crate::key::{KeyExtractor, PrefixKey};
use crate::line_record::{LineReader, LineRecord};
use crate::merger::{MergeStats, StreamingMerger};
use crate::order::Order;
use crate::run::Run;
use crate::run_generator::RunGenerator;
use crate::scratch::ScratchDir;

/// What a finished sort or merge did
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortSummary {
    output: PathBuf,
    runs: usize,
    records: usize,
    merge_passes: usize,
    peak_batch_bytes: u64,
    peak_buffered_records: usize,
}

impl SortSummary {
    /// The sorted file
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Number of runs that were merged, for [Sort::merge] the number of inputs
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Number of records written, prefix and suffix lines excluded
    pub fn records(&self) -> usize {
        self.records
    }

    /// Number of merge passes, intermediate passes included
    pub fn merge_passes(&self) -> usize {
        self.merge_passes
    }

    /// Most record bytes held in memory at once while splitting
    pub fn peak_batch_bytes(&self) -> u64 {
        self.peak_batch_bytes
    }

    /// Most records buffered at once while merging
    pub fn peak_buffered_records(&self) -> usize {
        self.peak_buffered_records
    }
}

/// Sort a text file too large to sort in memory
///
/// # Examples
/// ```no_run
/// use std::path::PathBuf;
/// use external_text_sort::key::PrefixKey;
/// use external_text_sort::sort::Sort;
///
/// fn sort_records(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
///     let mut sort = Sort::new(vec![input], output);
///     // keep at most 1 MB of records in memory, each batch becomes one sorted run
///     sort.with_memory_budget_bytes(1_000_000);
///     // order by the first 12 bytes of each line
///     sort.with_key(PrefixKey::new(12));
///     // runs are kept in a uniquely named directory created inside tmp
///     sort.with_tmp_dir(tmp);
///     let summary = sort.sort()?;
///     println!("sorted {} records", summary.records());
///     Ok(())
/// }
/// ```
pub struct Sort {
    input_files: Vec<PathBuf>,
    output: PathBuf,
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
}

impl Sort {
    /// Create a default Sort definition.
    ///
    /// * intermediate runs go to a new directory inside std::env::temp_dir()
    /// * the key is the first 10 bytes of each line, see [PrefixKey]
    /// * the memory budget is 4096 bytes and input files may be up to 100 MB
    /// * at most 1024 runs are merged at once
    /// * no lines are ignored
    /// * records that alone exceed the memory budget are rejected
    /// * default Order is Asc
    /// * prefix and suffix are empty
    /// * default end line is '\n'
    pub fn new(input_files: Vec<PathBuf>, output: PathBuf) -> Sort {
        Sort {
            input_files,
            output,
            tmp: std::env::temp_dir(),
            memory_budget_bytes: DEFAULT_MEMORY_BUDGET_BYTES,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            max_open_runs: DEFAULT_MAX_OPEN_RUNS,
            rw_buf_size: DEFAULT_RW_BUF_SIZE,
            key: Arc::new(PrefixKey::default()),
            order: Order::Asc,
            ignore_empty: false,
            ignore_lines: None,
            oversized_record_policy: OversizedRecordPolicy::Reject,
            prefix: vec![],
            suffix: vec![],
            endl: b'\n',
        }
    }

    /// Set the directory in which the scratch directory is created. By default use
    /// std::env::temp_dir(). For large files prefer a directory on the same file system as the
    /// output.
    pub fn with_tmp_dir(&mut self, tmp: PathBuf) {
        self.tmp = tmp;
    }

    /// Set the memory budget: a batch is flushed as a run once its records take this many bytes
    pub fn with_memory_budget_bytes(&mut self, memory_budget_bytes: u64) {
        self.memory_budget_bytes = memory_budget_bytes;
    }

    /// Set the maximum accepted size of each input file
    pub fn with_max_input_bytes(&mut self, max_input_bytes: u64) {
        self.max_input_bytes = max_input_bytes;
    }

    /// Set the maximum number of runs merged at once. More runs are merged in several passes.
    pub fn with_max_open_runs(&mut self, max_open_runs: usize) {
        self.max_open_runs = max_open_runs;
    }

    /// Set the read/write buffer size of run and output files
    pub fn with_rw_buf_size(&mut self, rw_buf_size: usize) {
        self.rw_buf_size = rw_buf_size;
    }

    /// Replace the [KeyExtractor]
    pub fn with_key(&mut self, key: impl KeyExtractor + 'static) {
        self.key = Arc::new(key);
    }

    /// Set [Order]
    pub fn with_order(&mut self, order: Order) {
        self.order = order
    }

    /// Direct the algorithm to ignore empty and blank lines. The default is false
    pub fn with_ignore_empty(&mut self) {
        self.ignore_empty = true;
    }

    /// Specify which lines to ignore. Each line matching the regex will be ignored and will not
    /// appear in the output.
    pub fn with_ignore_lines(&mut self, r: Regex) {
        self.ignore_lines = Some(r)
    }

    /// Set the [OversizedRecordPolicy]
    pub fn with_oversized_record_policy(&mut self, policy: OversizedRecordPolicy) {
        self.oversized_record_policy = policy;
    }

    /// Add file prefix. The provided prefix will be inserted at the beginning of the sorted file
    pub fn add_prefix_line(&mut self, prefix_line: String) {
        self.prefix.push(prefix_line);
    }

    /// Set prefix lines
    pub fn with_prefix_lines(&mut self, prefix_lines: Vec<String>) {
        self.prefix = prefix_lines;
    }

    /// Add file suffix. The provided suffix will be inserted at the end of the sorted file
    pub fn add_suffix_line(&mut self, suffix_line: String) {
        self.suffix.push(suffix_line);
    }

    /// Set suffix lines
    pub fn with_suffix_lines(&mut self, suffix_lines: Vec<String>) {
        self.suffix = suffix_lines;
    }

    /// Set line ending byte - not supporting CRLF, though with '\n' a '\r' before it is dropped
    pub fn with_endl(&mut self, endl: u8) {
        self.endl = endl
    }

    /// Apply the `EX_SORT_MAX_BUFFER` and `EX_SORT_MAX_FILE` environment overrides on top of the
    /// current memory budget and maximum input size. Empty or non-numeric values are ignored.
    pub fn with_env_overrides(&mut self) {
        self.memory_budget_bytes = env_override(MEMORY_BUDGET_ENV, self.memory_budget_bytes);
        self.max_input_bytes = env_override(MAX_INPUT_ENV, self.max_input_bytes);
    }

    /// Sort the input files into the output file
    pub fn sort(&self) -> Result<SortSummary> {
        let config = self.create_config()?;
        self.validate_paths(&config)?;
        let _limit = OpenFilesLimit::raise(config.max_open_runs());

        log::info!("Start sort, inputs: {}, output: {}", self.input_files.len(), self.output.display());
        let scratch = ScratchDir::new(&config)?;
        let mut generator = RunGenerator::new(&config, &scratch);
        for path in &self.input_files {
            let file = File::open(path).at_path(path)?;
            generator.consume(BufReader::with_capacity(config.rw_buf_size(), file), path)?;
        }
        let generated = generator.finish()?;
        log::info!(
            "Split {} records, {} bytes, into {} runs, peak batch: {} bytes",
            generated.records,
            generated.bytes,
            generated.runs.len(),
            generated.peak_batch_bytes
        );

        let runs = generated.runs.len();
        let merger = StreamingMerger::new(&config, &scratch);
        let stats = self.write_output(&config, |writer| merger.merge(generated.runs, writer, &self.output))?;
        scratch.close();
        log::info!("Finish sort, output: {}", self.output.display());

        Ok(self.summary(runs, generated.peak_batch_bytes, stats))
    }

    /// Merge input files that are each already sorted into the output file. The inputs are not
    /// modified. An input that turns out not to be sorted fails with [SortError::CorruptRun].
    pub fn merge(&self) -> Result<SortSummary> {
        let config = self.create_config()?;
        self.validate_paths(&config)?;
        let _limit = OpenFilesLimit::raise(config.max_open_runs());

        log::info!("Start merge, inputs: {}, output: {}", self.input_files.len(), self.output.display());
        let scratch = ScratchDir::new(&config)?;
        let runs: Vec<Run> = self.input_files
            .iter()
            .enumerate()
            .map(|(sequence, path)| Run::external(path.clone(), sequence))
            .collect();

        let merger = StreamingMerger::new(&config, &scratch);
        let stats = self.write_output(&config, |writer| merger.merge(runs, writer, &self.output))?;
        scratch.close();
        log::info!("Finish merge, output: {}", self.output.display());

        Ok(self.summary(self.input_files.len(), 0, stats))
    }

    /// Check whether every input file is sorted
    pub fn check(&self) -> Result<bool> {
        let config = self.create_config()?;
        for path in &self.input_files {
            if !Self::internal_check(path, &config)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn internal_check(path: &Path, config: &Config) -> Result<bool> {
        let file = File::open(path).at_path(path)?;
        let mut reader = LineReader::new(BufReader::with_capacity(config.rw_buf_size(), file), config.endl()).with_crlf();
        let mut previous: Option<LineRecord> = None;
        while let Some(line) = reader.next_line().at_path(path)? {
            if config.is_ignored(&line) {
                continue;
            }
            let current = match config.key().extract(&line) {
                Some(key) => LineRecord::from_parts(line, key),
                None => {
                    return Err(SortError::MalformedRecord {
                        path: path.to_path_buf(),
                        line_number: reader.line_number(),
                        line: String::from_utf8_lossy(&line).into_owned(),
                        expected: config.key().describe(),
                    });
                }
            };
            if let Some(previous) = &previous {
                if config.compare(previous, &current).is_gt() {
                    log::info!("{} is not sorted at line {}", path.display(), reader.line_number());
                    return Ok(false);
                }
            }
            previous = Some(current);
        }
        Ok(true)
    }

    pub(crate) fn create_config(&self) -> Result<Config> {
        Config::new(
            self.tmp.clone(),
            self.memory_budget_bytes,
            self.max_input_bytes,
            self.max_open_runs,
            self.rw_buf_size,
            self.key.clone(),
            self.order,
            self.ignore_empty,
            self.ignore_lines.clone(),
            self.oversized_record_policy,
            self.prefix.clone(),
            self.suffix.clone(),
            self.endl,
        )
    }

    fn validate_paths(&self, config: &Config) -> Result<()> {
        for path in &self.input_files {
            if !path.is_file() {
                return Err(SortError::invalid_configuration(
                    format!("the input file does not exist or is a directory: {}", path.display())
                ));
            }
            let len = path.metadata().at_path(path)?.len();
            if len > config.max_input_bytes() {
                return Err(SortError::invalid_configuration(
                    format!("file size exceeds maximum: {}, size: {}, max file size: {}", path.display(), len, config.max_input_bytes())
                ));
            }
        }

        if !config.tmp().is_dir() {
            return Err(SortError::invalid_configuration(
                format!("the tmp directory does not exist or is not a directory: {}", config.tmp().display())
            ));
        }

        if self.output.is_dir() {
            return Err(SortError::invalid_configuration(
                format!("the output is a directory: {}", self.output.display())
            ));
        }
        let output_dir = Self::output_dir(&self.output);
        if !output_dir.is_dir() {
            return Err(SortError::invalid_configuration(
                format!("the output directory does not exist: {}", output_dir.display())
            ));
        }
        Ok(())
    }

    fn output_dir(output: &Path) -> &Path {
        match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Write prefix, merged records and suffix to a temporary file next to the output and rename
    /// it into place. On failure the output is left untouched.
    fn write_output<F>(&self, config: &Config, merge: F) -> Result<MergeStats>
    where
        F: FnOnce(&mut BufWriter<NamedTempFile>) -> Result<MergeStats>,
    {
        let output_dir = Self::output_dir(&self.output);
        let tmp_output = NamedTempFile::new_in(output_dir).at_path(output_dir)?;
        let tmp_path = tmp_output.path().to_path_buf();
        let mut writer = BufWriter::with_capacity(config.rw_buf_size(), tmp_output);
        let endl = [config.endl()];

        for prefix in config.prefix() {
            writer.write_all(prefix.as_bytes()).at_path(&tmp_path)?;
            writer.write_all(&endl).at_path(&tmp_path)?;
        }
        let stats = merge(&mut writer)?;
        for suffix in config.suffix() {
            writer.write_all(suffix.as_bytes()).at_path(&tmp_path)?;
            writer.write_all(&endl).at_path(&tmp_path)?;
        }

        let tmp_output = writer.into_inner().map_err(|e| e.into_error()).at_path(&tmp_path)?;
        tmp_output.persist(&self.output).map_err(|e| e.error).at_path(&self.output)?;
        Ok(stats)
    }

    fn summary(&self, runs: usize, peak_batch_bytes: u64, stats: MergeStats) -> SortSummary {
        SortSummary {
            output: self.output.clone(),
            runs,
            records: stats.records,
            merge_passes: stats.passes,
            peak_batch_bytes,
            peak_buffered_records: stats.peak_buffered_records,
        }
    }
}

/// Raises the soft open files limit for the lifetime of the guard
struct OpenFilesLimit {
    restore: Option<(u64, u64)>,
}

impl OpenFilesLimit {
    fn raise(open_runs: usize) -> OpenFilesLimit {
        let (current_soft, current_hard) = match getrlimit(Resource::NOFILE) {
            Ok(limits) => limits,
            Err(e) => {
                log::warn!("Failed to get rlimit NOFILE: {}", e);
                return OpenFilesLimit { restore: None };
            }
        };
        log::info!("Current rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard);

        let wanted = (open_runs + 256) as u64;
        if wanted <= current_soft {
            return OpenFilesLimit { restore: None };
        }
        let new_soft = max(current_soft, min(wanted, current_hard));
        log::info!("Set new rlimit NOFILE, soft: {}, hard: {}", new_soft, current_hard);
        match setrlimit(Resource::NOFILE, new_soft, current_hard) {
            Ok(()) => OpenFilesLimit { restore: Some((current_soft, current_hard)) },
            Err(e) => {
                log::warn!("Failed to set rlimit NOFILE, soft: {}, hard: {}: {}", new_soft, current_hard, e);
                OpenFilesLimit { restore: None }
            }
        }
    }
}

impl Drop for OpenFilesLimit {
    fn drop(&mut self) {
        if let Some((soft, hard)) = self.restore {
            log::info!("Restore rlimit NOFILE, soft: {}, hard: {}", soft, hard);
            if let Err(e) = setrlimit(Resource::NOFILE, soft, hard) {
                log::warn!("Failed to restore rlimit NOFILE: {}", e);
            }
        }
    }
}
