//! This crate sorts line oriented text files that are too large to sort in memory, using a two
//! phase external merge sort.
//!
//! First the input is split into sorted runs. Records are read one at a time and collected until
//! their size reaches a memory budget, then the batch is sorted and written to a run file in a
//! scratch directory. Then the runs are merged into the output through a binary heap holding one
//! buffered record per run, so the merge needs memory proportional to the number of runs and not
//! to the size of the input. When there are more runs than may be open at once, they are merged
//! in several passes.
//!
//! Records are ordered by a key extracted from each line, by default the first 10 bytes
//! ([key::PrefixKey]). Records with equal keys keep their input order. A line too short to carry
//! a key fails the sort with [error::SortError::MalformedRecord].
//!
//! # Examples
//! ```no_run
//! use std::path::PathBuf;
//! use external_text_sort::key::PrefixKey;
//! use external_text_sort::order::Order;
//! use external_text_sort::sort::Sort;
//!
//! fn sort_records(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
//!     let mut sort = Sort::new(vec![input], output);
//!
//!     // set the directory for intermediate runs. The default is the system temp dir -
//!     // std::env::temp_dir(), however, for large files it is recommended to provide a dedicated
//!     // directory, preferably on the same file system as the output.
//!     sort.with_tmp_dir(tmp);
//!
//!     // each run holds about 64 KB of records
//!     sort.with_memory_budget_bytes(64 * 1024);
//!     sort.with_key(PrefixKey::new(8));
//!     sort.with_order(Order::Desc);
//!
//!     sort.sort()?;
//!     Ok(())
//! }
//! ```
//!

pub(crate) mod line_record;
pub(crate) mod run;
pub(crate) mod run_cursor;
pub(crate) mod run_generator;
pub(crate) mod merger;
pub(crate) mod scratch;

pub mod config;
pub mod error;
pub mod key;
pub mod order;
pub mod sort;
pub mod sort_command;
