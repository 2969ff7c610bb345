use std::cmp::Ordering;
use std::fs::File;
use std::io;
use std::io::{BufReader, Write};

use crate::config::Config;
use crate::error::{IoContext, Result, SortError};
use crate::key::Key;
use crate::line_record::{LineReader, LineRecord};
use crate::order::Order;
use crate::run::Run;

/// Forward only reader over one run, buffering exactly one record while not exhausted.
pub(crate) struct RunCursor {
    // declared before `run` so the file is closed before a scratch run is deleted
    reader: Option<LineReader<BufReader<File>>>,
    head: Option<LineRecord>,
    last_key: Option<Key>,
    records: usize,
    order: Order,
    run: Run,
}

impl RunCursor {
    /// Open the run and buffer its first record. An empty run is exhausted right away.
    pub(crate) fn open(run: Run, config: &Config) -> Result<RunCursor> {
        let file = File::open(run.path()).at_path(run.path())?;
        let mut reader = LineReader::new(BufReader::with_capacity(config.rw_buf_size(), file), config.endl());
        if run.is_external() {
            reader = reader.with_crlf();
        }
        let mut cursor = RunCursor {
            reader: Some(reader),
            head: None,
            last_key: None,
            records: 0,
            order: config.order(),
            run,
        };
        cursor.load_next(config)?;
        Ok(cursor)
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.head.is_none()
    }

    pub(crate) fn sequence(&self) -> usize {
        self.run.sequence()
    }

    pub(crate) fn write_head<W: Write>(&self, writer: &mut W, endl: u8) -> io::Result<()> {
        match &self.head {
            Some(record) => record.write_to(writer, endl),
            None => Ok(()),
        }
    }

    /// Close the run file and delete the run if the sort created it
    pub(crate) fn close(self) {
        let RunCursor { reader, run, .. } = self;
        drop(reader);
        log::trace!("Closing run {}", run.path().display());
        run.remove();
    }

    /// Release the buffered record and buffer the next one. Returns false once exhausted.
    pub(crate) fn advance(&mut self, config: &Config) -> Result<bool> {
        if let Some(head) = self.head.take() {
            self.last_key = Some(head.into_key());
        }
        self.load_next(config)?;
        Ok(self.head.is_some())
    }

    fn load_next(&mut self, config: &Config) -> Result<()> {
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(()),
        };

        loop {
            let line = match reader.next_line().at_path(self.run.path())? {
                Some(line) => line,
                None => {
                    let line_number = reader.line_number();
                    self.reader = None;
                    return match self.run.records() {
                        Some(records) if records != self.records => Err(SortError::CorruptRun {
                            path: self.run.path().to_path_buf(),
                            line_number,
                            reason: format!("run ends after {} records, {} were written", self.records, records),
                        }),
                        _ => Ok(()),
                    };
                }
            };
            if config.is_ignored(&line) {
                continue;
            }

            let line_number = reader.line_number();
            let record = LineRecord::new(line, config.key()).ok_or_else(|| SortError::CorruptRun {
                path: self.run.path().to_path_buf(),
                line_number,
                reason: format!("record has no sort key, expected {}", config.key().describe()),
            })?;

            if let Some(last_key) = &self.last_key {
                if self.order.apply(last_key.cmp(record.key())) == Ordering::Greater {
                    return Err(SortError::CorruptRun {
                        path: self.run.path().to_path_buf(),
                        line_number,
                        reason: "record is out of order".to_string(),
                    });
                }
            }
            self.records += 1;
            self.head = Some(record);
            return Ok(());
        }
    }
}

impl Eq for RunCursor {}

impl PartialEq<Self> for RunCursor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd<Self> for RunCursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RunCursor {
    fn cmp(&self, other: &Self) -> Ordering {
        let ordering = match (&self.head, &other.head) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => self.order.apply(a.key().cmp(b.key())),
        };
        // flipped to work with BinaryHeap (max heap): the smallest head, then the earliest run,
        // compares greatest
        ordering
            .then_with(|| self.sequence().cmp(&other.sequence()))
            .reverse()
    }
}
