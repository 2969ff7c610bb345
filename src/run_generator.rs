use std::cmp::max;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use crate::config::{Config, OversizedRecordPolicy};
use crate::error::{IoContext, Result, SortError};
use crate::line_record::{accounted_bytes, LineReader, LineRecord};
use crate::run::Run;
use crate::scratch::ScratchDir;

/// Runs produced by a [RunGenerator] and what it took to produce them
#[derive(Debug)]
pub(crate) struct GeneratedRuns {
    pub(crate) runs: Vec<Run>,
    pub(crate) records: usize,
    pub(crate) bytes: u64,
    pub(crate) peak_batch_bytes: u64,
}

/// Splits input into sorted runs, each holding at most one memory budget of records
/// (plus the record that crossed it).
pub(crate) struct RunGenerator<'a> {
    config: &'a Config,
    scratch: &'a ScratchDir,
    batch: Vec<LineRecord>,
    batch_bytes: u64,
    runs: Vec<Run>,
    records: usize,
    bytes: u64,
    peak_batch_bytes: u64,
}

impl<'a> RunGenerator<'a> {
    pub(crate) fn new(config: &'a Config, scratch: &'a ScratchDir) -> RunGenerator<'a> {
        RunGenerator {
            config,
            scratch,
            batch: Vec::new(),
            batch_bytes: 0,
            runs: Vec::new(),
            records: 0,
            bytes: 0,
            peak_batch_bytes: 0,
        }
    }

    /// Read every record of `input`. The batch carries over to the next input, call
    /// [RunGenerator::finish] after the last one.
    pub(crate) fn consume<R: BufRead>(&mut self, input: R, source: &Path) -> Result<()> {
        log::info!("Start splitting {}", source.display());
        let mut reader = LineReader::new(input, self.config.endl()).with_crlf();
        while let Some(line) = reader.next_line().at_path(source)? {
            if self.config.is_ignored(&line) {
                continue;
            }

            let line_number = reader.line_number();
            let record_bytes = accounted_bytes(&line);
            let budget = self.config.memory_budget_bytes();
            if record_bytes > budget && self.config.oversized_record_policy() == OversizedRecordPolicy::Reject {
                return Err(SortError::BudgetTooSmall {
                    path: source.to_path_buf(),
                    line_number,
                    record_bytes,
                    budget,
                });
            }

            let key = match self.config.key().extract(&line) {
                Some(key) => key,
                None => {
                    return Err(SortError::MalformedRecord {
                        path: source.to_path_buf(),
                        line_number,
                        line: String::from_utf8_lossy(&line).into_owned(),
                        expected: self.config.key().describe(),
                    });
                }
            };
            self.push(LineRecord::from_parts(line, key))?;
        }
        log::info!("Finish splitting {}, lines: {}, runs so far: {}", source.display(), reader.line_number(), self.runs.len());
        Ok(())
    }

    /// Flush the last, possibly undersized, batch and hand over the runs in creation order.
    pub(crate) fn finish(mut self) -> Result<GeneratedRuns> {
        self.flush()?;
        Ok(
            GeneratedRuns {
                runs: self.runs,
                records: self.records,
                bytes: self.bytes,
                peak_batch_bytes: self.peak_batch_bytes,
            }
        )
    }

    fn push(&mut self, record: LineRecord) -> Result<()> {
        let record_bytes = record.accounted_bytes();
        self.batch_bytes += record_bytes;
        self.bytes += record_bytes;
        self.records += 1;
        self.batch.push(record);
        self.peak_batch_bytes = max(self.peak_batch_bytes, self.batch_bytes);

        if self.batch_bytes >= self.config.memory_budget_bytes() {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }

        let mut batch = std::mem::take(&mut self.batch);
        self.batch_bytes = 0;
        // stable: equal keys keep their input order
        batch.sort_by(|a, b| self.config.compare(a, b));
        let run = self.write_run(&batch)?;
        self.runs.push(run);

        batch.clear();
        self.batch = batch;
        Ok(())
    }

    fn write_run(&self, batch: &[LineRecord]) -> Result<Run> {
        // dropped on error, which removes the partial run file
        let mut file = self.scratch.create_run_file()?;
        let path = file.path().to_path_buf();
        {
            let mut writer = BufWriter::with_capacity(self.config.rw_buf_size(), &mut file);
            for record in batch {
                record.write_to(&mut writer, self.config.endl()).at_path(&path)?;
            }
            writer.flush().at_path(&path)?;
        }

        let sequence = self.runs.len();
        log::debug!("Wrote run {}, records: {}, path: {}", sequence, batch.len(), path.display());
        Ok(Run::scratch(file.into_temp_path(), sequence, batch.len()))
    }
}
