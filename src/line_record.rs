use std::cmp::max;
use std::io;
use std::io::{BufRead, Write};

use crate::key::{Key, KeyExtractor};

/// Bytes accounted per record on top of its length, for the line terminator
pub(crate) const RECORD_OVERHEAD: u64 = 1;

/// A line together with its extracted key. The line is kept without its terminator.
#[derive(Debug)]
pub(crate) struct LineRecord {
    line: Vec<u8>,
    key: Key,
}

impl LineRecord {
    /// Returns `None` when the extractor finds no key in the line.
    pub(crate) fn new(line: Vec<u8>, extractor: &dyn KeyExtractor) -> Option<LineRecord> {
        let key = extractor.extract(&line)?;
        Some(LineRecord::from_parts(line, key))
    }

    pub(crate) fn from_parts(line: Vec<u8>, key: Key) -> LineRecord {
        LineRecord { line, key }
    }

    pub(crate) fn key(&self) -> &Key {
        &self.key
    }

    pub(crate) fn into_key(self) -> Key {
        self.key
    }

    /// Size charged against the memory budget
    pub(crate) fn accounted_bytes(&self) -> u64 {
        accounted_bytes(&self.line)
    }

    pub(crate) fn write_to<W: Write>(&self, writer: &mut W, endl: u8) -> io::Result<()> {
        writer.write_all(&self.line)?;
        writer.write_all(&[endl])
    }
}

pub(crate) fn accounted_bytes(line: &[u8]) -> u64 {
    line.len() as u64 + RECORD_OVERHEAD
}

/// Reads terminator delimited lines. Lines come back exactly as stored unless
/// [LineReader::with_crlf] is set.
pub(crate) struct LineReader<R> {
    reader: R,
    endl: u8,
    crlf: bool,
    line_number: usize,
    line_capacity: usize,
}

impl<R: BufRead> LineReader<R> {
    pub(crate) fn new(reader: R, endl: u8) -> LineReader<R> {
        LineReader {
            reader,
            endl,
            crlf: false,
            line_number: 0,
            line_capacity: 1,
        }
    }

    /// With a `\n` terminator, drop one `\r` before it as well. Only for files written by the
    /// caller, never for runs the sort wrote itself.
    pub(crate) fn with_crlf(mut self) -> LineReader<R> {
        self.crlf = self.endl == b'\n';
        self
    }

    /// 1-based number of the line returned last, 0 before the first read
    pub(crate) fn line_number(&self) -> usize {
        self.line_number
    }

    pub(crate) fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::with_capacity(self.line_capacity);
        if self.reader.read_until(self.endl, &mut line)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        self.line_capacity = max(self.line_capacity, line.len());

        if line.last() == Some(&self.endl) {
            line.pop();
            if self.crlf && line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}
