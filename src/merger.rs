use std::cmp::max;
use std::collections::BinaryHeap;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::Config;
use crate::error::{IoContext, Result};
use crate::run::Run;
use crate::run_cursor::RunCursor;
use crate::scratch::ScratchDir;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct MergeStats {
    /// Records written by the final pass
    pub(crate) records: usize,
    /// Merge passes including the final one
    pub(crate) passes: usize,
    /// Most records buffered at once by any pass
    pub(crate) peak_buffered_records: usize,
}

/// K-way merge of sorted runs through a binary heap of cursors. Each open run buffers one
/// record, and at most `max_open_runs` runs are open at once: when there are more, consecutive
/// groups are first merged into intermediate runs.
pub(crate) struct StreamingMerger<'a> {
    config: &'a Config,
    scratch: &'a ScratchDir,
}

impl<'a> StreamingMerger<'a> {
    pub(crate) fn new(config: &'a Config, scratch: &'a ScratchDir) -> StreamingMerger<'a> {
        StreamingMerger {
            config,
            scratch,
        }
    }

    /// Merge `runs` into `writer`. Zero runs write nothing.
    pub(crate) fn merge<W: Write>(&self, runs: Vec<Run>, writer: &mut W, output: &Path) -> Result<MergeStats> {
        let mut stats = MergeStats::default();
        let runs = self.reduce(runs, &mut stats)?;

        log::info!("Merging {} runs into {}", runs.len(), output.display());
        stats.records = self.merge_runs(runs, writer, output, &mut stats)?;
        stats.passes += 1;
        log::info!(
            "Finished merging, records: {}, passes: {}, peak buffered records: {}",
            stats.records,
            stats.passes,
            stats.peak_buffered_records
        );
        Ok(stats)
    }

    fn reduce(&self, mut runs: Vec<Run>, stats: &mut MergeStats) -> Result<Vec<Run>> {
        let fan_in = self.config.max_open_runs();
        while runs.len() > fan_in {
            stats.passes += 1;
            log::debug!("Intermediate merge pass {}, runs: {}, fan in: {}", stats.passes, runs.len(), fan_in);

            let mut merged = Vec::with_capacity(runs.len() / fan_in + 1);
            let mut remaining = runs.into_iter().peekable();
            while remaining.peek().is_some() {
                let group: Vec<Run> = remaining.by_ref().take(fan_in).collect();
                // groups are consecutive, so renumbering them keeps the tie break order
                let sequence = merged.len();
                merged.push(self.merge_group(group, sequence, stats)?);
            }
            runs = merged;
        }
        Ok(runs)
    }

    fn merge_group(&self, mut group: Vec<Run>, sequence: usize, stats: &mut MergeStats) -> Result<Run> {
        if group.len() == 1 {
            if let Some(run) = group.pop() {
                return Ok(run.with_sequence(sequence));
            }
        }

        let mut file = self.scratch.create_run_file()?;
        let path = file.path().to_path_buf();
        let records = {
            let mut writer = BufWriter::with_capacity(self.config.rw_buf_size(), &mut file);
            let records = self.merge_runs(group, &mut writer, &path, stats)?;
            writer.flush().at_path(&path)?;
            records
        };
        log::debug!("Wrote intermediate run {}, records: {}, path: {}", sequence, records, path.display());
        Ok(Run::scratch(file.into_temp_path(), sequence, records))
    }

    fn merge_runs<W: Write>(&self, runs: Vec<Run>, writer: &mut W, output: &Path, stats: &mut MergeStats) -> Result<usize> {
        let mut cursors = BinaryHeap::with_capacity(runs.len());
        for run in runs {
            let cursor = RunCursor::open(run, self.config)?;
            if cursor.is_exhausted() {
                cursor.close();
            } else {
                cursors.push(cursor);
            }
        }
        stats.peak_buffered_records = max(stats.peak_buffered_records, cursors.len());

        let result = self.drain(&mut cursors, writer, output, stats);
        if result.is_err() && !cursors.is_empty() {
            log::debug!("Merge aborted, closing {} open runs", cursors.len());
        }
        result
    }

    fn drain<W: Write>(
        &self,
        cursors: &mut BinaryHeap<RunCursor>,
        writer: &mut W,
        output: &Path,
        stats: &mut MergeStats,
    ) -> Result<usize> {
        let endl = self.config.endl();
        let mut records: usize = 0;
        while let Some(mut current_min) = cursors.pop() {
            loop {
                stats.peak_buffered_records = max(stats.peak_buffered_records, cursors.len() + 1);
                current_min.write_head(writer, endl).at_path(output)?;
                records += 1;

                if !current_min.advance(self.config)? {
                    current_min.close();
                    break;
                }
                // comparison operators are flipped to work with BinaryHeap (max heap)
                let still_min = cursors.peek().map_or(true, |next_min| &current_min >= next_min);
                if !still_min {
                    cursors.push(current_min);
                    break;
                }
            }
        }
        Ok(records)
    }
}
