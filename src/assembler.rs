use crate::detector::{DetectorState, FormatCatalog};
use crate::error::MergeError;
use crate::formats::TimestampFormat;
use crate::models::{Record, Timestamp, SENTINEL_TIMESTAMP};
use std::io::BufRead;
use std::sync::Arc;
use tracing::debug;

/// Why `advance` stopped accumulating lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// A blank line was consumed; it is not part of the record
    BlankLine,
    /// The last line appended carried a timestamp
    Dated,
    /// The source has no more input
    EndOfInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// A record is buffered
    Active,
    /// Input is exhausted and nothing is buffered
    Exhausted,
}

/// Groups the raw lines of one source into timestamped records
pub struct RecordAssembler<R> {
    name: String,
    reader: R,
    catalog: Arc<FormatCatalog>,
    detector: DetectorState,
    record: Record,
    last_timestamp: Timestamp,
    dated_lines: usize,
    state: AssemblerState,
    line_buf: Vec<u8>,
}

impl<R: BufRead> RecordAssembler<R> {
    /// Wrap a source. Nothing is read until the first `advance`.
    pub fn new(name: impl Into<String>, reader: R, catalog: Arc<FormatCatalog>) -> Self {
        Self {
            name: name.into(),
            reader,
            catalog,
            detector: DetectorState::new(),
            record: Record::empty(),
            last_timestamp: SENTINEL_TIMESTAMP,
            dated_lines: 0,
            state: AssemblerState::Active,
            line_buf: Vec::new(),
        }
    }

    /// Replace the current record with the next one from the source
    pub fn advance(&mut self) -> Result<Boundary, MergeError> {
        let mut text = String::new();

        let boundary = loop {
            self.line_buf.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.line_buf)
                .map_err(|e| MergeError::read(&self.name, &e))?;
            if read == 0 {
                break Boundary::EndOfInput;
            }

            let raw = String::from_utf8_lossy(&self.line_buf);
            let line = strip_terminator(&raw);
            if line.is_empty() {
                // Leading blank lines never open a record
                if text.is_empty() {
                    continue;
                }
                break Boundary::BlankLine;
            }

            text.push_str(&raw);

            let was_locked = self.detector.locked();
            let timestamp = self.detector.timestamp(&self.catalog, line);
            if was_locked.is_none() {
                if let Some(format) = self.detector.locked() {
                    debug!(source = %self.name, format = %format, "timestamp format detected");
                }
            }

            // Undated lines gathered so far join this dated line and sort
            // under its timestamp, not the previous entry's
            if let Some(timestamp) = timestamp {
                self.last_timestamp = timestamp;
                self.dated_lines += 1;
                break Boundary::Dated;
            }
        };

        if text.is_empty() {
            self.state = AssemblerState::Exhausted;
        }

        self.record = Record {
            text,
            timestamp: self.last_timestamp,
            line_number: self.dated_lines,
        };

        Ok(boundary)
    }

    /// Move the current record out, leaving an empty one until the next `advance`
    pub fn take_record(&mut self) -> Record {
        std::mem::take(&mut self.record)
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Sentinel until a timestamp is found, then the latest one
    pub fn current_timestamp(&self) -> Timestamp {
        self.last_timestamp
    }

    pub fn current_text(&self) -> &str {
        &self.record.text
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == AssemblerState::Exhausted
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dated lines seen so far
    pub fn line_number(&self) -> usize {
        self.dated_lines
    }

    pub fn detected_format(&self) -> Option<TimestampFormat> {
        self.detector.locked()
    }
}

fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler(input: &str) -> RecordAssembler<&[u8]> {
        RecordAssembler::new("test.log", input.as_bytes(), Arc::new(FormatCatalog::new()))
    }

    #[test]
    fn test_strip_terminator() {
        assert_eq!(strip_terminator("abc\n"), "abc");
        assert_eq!(strip_terminator("abc\r\n"), "abc");
        assert_eq!(strip_terminator("abc"), "abc");
        assert_eq!(strip_terminator("\n"), "");
    }

    #[test]
    fn test_empty_source_is_exhausted_after_first_advance() {
        let mut source = assembler("");
        assert!(!source.is_exhausted());

        assert_eq!(source.advance().unwrap(), Boundary::EndOfInput);
        assert!(source.is_exhausted());
        assert!(source.record().is_empty());
        assert_eq!(source.current_timestamp(), SENTINEL_TIMESTAMP);
    }

    #[test]
    fn test_blank_only_source_is_exhausted() {
        let mut source = assembler("\n\n\r\n");
        assert_eq!(source.advance().unwrap(), Boundary::EndOfInput);
        assert!(source.is_exhausted());
    }

    #[test]
    fn test_dated_line_ends_record() {
        let mut source = assembler("2020-01-01T00:00:00.123Z entryA\n2020-01-01T00:00:01.000Z entryB\n");

        assert_eq!(source.advance().unwrap(), Boundary::Dated);
        assert_eq!(source.current_text(), "2020-01-01T00:00:00.123Z entryA\n");
        assert_eq!(source.line_number(), 1);

        assert_eq!(source.advance().unwrap(), Boundary::Dated);
        assert_eq!(source.current_text(), "2020-01-01T00:00:01.000Z entryB\n");
        assert_eq!(source.line_number(), 2);

        assert_eq!(source.advance().unwrap(), Boundary::EndOfInput);
        assert!(source.is_exhausted());
    }

    #[test]
    fn test_undated_continuation_inherits_timestamp() {
        let mut source = assembler("2020-01-01T00:00:00.123Z entryA\n  stacktrace line\n");

        source.advance().unwrap();
        let first = source.record().timestamp;
        assert_ne!(first, SENTINEL_TIMESTAMP);

        assert_eq!(source.advance().unwrap(), Boundary::EndOfInput);
        assert!(!source.is_exhausted());
        assert_eq!(source.current_text(), "  stacktrace line\n");
        assert_eq!(source.record().timestamp, first);
        assert_eq!(source.record().line_number, 1);
    }

    #[test]
    fn test_undated_lines_accumulate_until_next_timestamp() {
        let input = "2020-01-01T00:00:00.000Z boom\n\
                     Traceback (most recent call last):\n  \
                     File \"x.py\", line 1\n\
                     2020-01-01T00:00:05.000Z recovered\n";
        let mut source = assembler(input);

        source.advance().unwrap();
        assert_eq!(source.advance().unwrap(), Boundary::Dated);
        assert_eq!(
            source.current_text(),
            "Traceback (most recent call last):\n  File \"x.py\", line 1\n2020-01-01T00:00:05.000Z recovered\n"
        );
        assert_eq!(source.line_number(), 2);
    }

    #[test]
    fn test_blank_line_ends_record_and_is_dropped() {
        let mut source = assembler("no date one\nno date two\n\nno date three\n");

        assert_eq!(source.advance().unwrap(), Boundary::BlankLine);
        assert_eq!(source.current_text(), "no date one\nno date two\n");
        assert_eq!(source.current_timestamp(), SENTINEL_TIMESTAMP);

        assert_eq!(source.advance().unwrap(), Boundary::EndOfInput);
        assert_eq!(source.current_text(), "no date three\n");
        assert_eq!(source.line_number(), 0);
    }

    #[test]
    fn test_leading_blank_lines_are_skipped() {
        let mut source = assembler("first\n\n\n\nsecond\n");

        source.advance().unwrap();
        assert_eq!(source.current_text(), "first\n");
        source.advance().unwrap();
        assert_eq!(source.current_text(), "second\n");
        source.advance().unwrap();
        assert!(source.is_exhausted());
    }

    #[test]
    fn test_last_line_without_newline() {
        let mut source = assembler("#1454321472\nls -la");

        assert_eq!(source.advance().unwrap(), Boundary::Dated);
        assert_eq!(source.advance().unwrap(), Boundary::EndOfInput);
        assert_eq!(source.current_text(), "ls -la");
        assert_eq!(source.detected_format(), Some(TimestampFormat::ShellHistory));
    }

    #[test]
    fn test_take_record_keeps_timestamp() {
        let mut source = assembler("2016-02-01 10:11:12.345 1 INFO a\n");
        source.advance().unwrap();
        let ts = source.current_timestamp();

        let record = source.take_record();
        assert_eq!(record.timestamp, ts);
        assert!(source.record().is_empty());
        assert_eq!(source.current_timestamp(), ts);
    }

    #[test]
    fn test_invalid_utf8_is_read_lossily() {
        let bytes: &[u8] = b"2016-02-01 10:11:12.345 1 INFO caf\xe9\n";
        let mut source = RecordAssembler::new("bin.log", bytes, Arc::new(FormatCatalog::new()));

        assert_eq!(source.advance().unwrap(), Boundary::Dated);
        assert!(source.current_text().starts_with("2016-02-01 10:11:12.345"));
    }
}
