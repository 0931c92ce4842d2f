use crate::assembler::RecordAssembler;
use crate::error::MergeError;
use crate::models::{MergedRecord, Timestamp};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io::BufRead;
use tracing::{debug, trace, warn};

/// An active source waiting in the queue
struct Pending<R> {
    timestamp: Timestamp,
    /// Issued on every (re)insertion; lower tickets win ties
    ticket: u64,
    assembler: RecordAssembler<R>,
}

impl<R> PartialEq for Pending<R> {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp && self.ticket == other.ticket
    }
}

impl<R> Eq for Pending<R> {}

impl<R> PartialOrd for Pending<R> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<R> Ord for Pending<R> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap pops the earliest timestamp, then the oldest ticket
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.ticket.cmp(&self.ticket))
    }
}

/// Streaming k-way merge over record assemblers.
///
/// Always emits the record with the earliest timestamp among all active
/// sources. Sources whose timestamps compare equal take turns: a source that
/// was just emitted queues behind every source already waiting at the same
/// timestamp.
pub struct LogMerger<R> {
    queue: BinaryHeap<Pending<R>>,
    next_ticket: u64,
    sources_added: usize,
    emitted: usize,
    failed: bool,
}

impl<R: BufRead> LogMerger<R> {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            next_ticket: 0,
            sources_added: 0,
            emitted: 0,
            failed: false,
        }
    }

    /// Build a merger from sources, in the order given
    pub fn from_sources<I>(sources: I) -> Result<Self, MergeError>
    where
        I: IntoIterator<Item = RecordAssembler<R>>,
    {
        let mut merger = Self::new();
        for source in sources {
            merger.add_source(source)?;
        }
        Ok(merger)
    }

    /// Load the first record of `assembler` and queue it. Empty sources are dropped.
    pub fn add_source(&mut self, mut assembler: RecordAssembler<R>) -> Result<(), MergeError> {
        self.sources_added += 1;
        assembler.advance()?;
        if assembler.is_exhausted() {
            self.retire(&assembler);
        } else {
            self.enqueue(assembler);
        }
        Ok(())
    }

    /// Emit the globally earliest record and advance its source
    pub fn next_record(&mut self) -> Result<Option<MergedRecord>, MergeError> {
        let Some(pending) = self.queue.pop() else {
            return Ok(None);
        };
        let mut assembler = pending.assembler;

        let source = assembler.name().to_string();
        let record = MergedRecord::new(source, assembler.take_record());
        trace!(
            source = %record.source,
            line = record.line,
            timestamp = ?record.timestamp,
            "emit record"
        );
        self.emitted += 1;

        assembler.advance()?;
        if assembler.is_exhausted() {
            self.retire(&assembler);
        } else {
            self.enqueue(assembler);
        }

        Ok(Some(record))
    }

    /// Sources that still have records to emit
    pub fn active_sources(&self) -> usize {
        self.queue.len()
    }

    pub fn sources_added(&self) -> usize {
        self.sources_added
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    fn enqueue(&mut self, assembler: RecordAssembler<R>) {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.queue.push(Pending {
            timestamp: assembler.current_timestamp(),
            ticket,
            assembler,
        });
    }

    fn retire(&self, assembler: &RecordAssembler<R>) {
        match assembler.detected_format() {
            Some(format) => debug!(
                source = assembler.name(),
                format = %format,
                dated_lines = assembler.line_number(),
                "source exhausted"
            ),
            None => warn!(
                source = assembler.name(),
                "no timestamp format detected; records were ordered as earliest"
            ),
        }
    }
}

impl<R: BufRead> Default for LogMerger<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: BufRead> Iterator for LogMerger<R> {
    type Item = Result<MergedRecord, MergeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_record() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::FormatCatalog;
    use std::io::{self, BufReader, Read};
    use std::sync::Arc;

    fn merger(sources: &[(&'static str, &'static str)]) -> LogMerger<&'static [u8]> {
        let catalog = Arc::new(FormatCatalog::new());
        LogMerger::from_sources(sources.iter().map(|(name, input)| {
            RecordAssembler::new(*name, input.as_bytes(), Arc::clone(&catalog))
        }))
        .unwrap()
    }

    fn emitted(merger: LogMerger<&'static [u8]>) -> Vec<(String, String)> {
        merger
            .map(|r| r.unwrap())
            .map(|r| {
                let text = r.trimmed_text().to_string();
                (r.source, text)
            })
            .collect()
    }

    #[test]
    fn test_interleaved_sources_merge_in_time_order() {
        let a = "2016-02-01 10:00:00.000 1 INFO a1\n2016-02-01 10:00:02.000 1 INFO a2\n2016-02-01 10:00:04.000 1 INFO a3\n";
        let b = "2016-02-01T10:00:01.000Z b1\n2016-02-01T10:00:03.000Z b2\n2016-02-01T10:00:05.000Z b3\n";

        let out = emitted(merger(&[("a.log", a), ("b.log", b)]));
        let texts: Vec<_> = out.iter().map(|(_, t)| t.rsplit(' ').next().unwrap()).collect();
        assert_eq!(texts, vec!["a1", "b1", "a2", "b2", "a3", "b3"]);
    }

    #[test]
    fn test_equal_timestamps_take_turns() {
        let a = "#1454321472\nls\n\n#1454321472\ncd /tmp\n\n#1454321472\npwd\n";
        let b = "2016-02-01T10:11:12.000Z b1\n2016-02-01T10:11:12.000Z b2\n2016-02-01T10:11:12.000Z b3\n";

        let sources: Vec<_> = emitted(merger(&[("a", a), ("b", b)]))
            .into_iter()
            .map(|(source, _)| source)
            .collect();

        // a's undated "ls" record shares the instant and still waits its turn
        assert_eq!(sources[0], "a");
        assert_eq!(sources[1], "b");
        assert_eq!(sources[2], "a");
        assert_eq!(sources[3], "b");
    }

    #[test]
    fn test_tie_break_is_reproducible() {
        let a = "2016-02-01T10:11:12.000Z a1\n2016-02-01T10:11:12.000Z a2\n";
        let b = "2016-02-01T10:11:12.000Z b1\n2016-02-01T10:11:12.000Z b2\n";

        let first = emitted(merger(&[("a", a), ("b", b)]));
        for _ in 0..5 {
            assert_eq!(emitted(merger(&[("a", a), ("b", b)])), first);
        }
        let order: Vec<_> = first.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "2016-02-01T10:11:12.000Z a1",
                "2016-02-01T10:11:12.000Z b1",
                "2016-02-01T10:11:12.000Z a2",
                "2016-02-01T10:11:12.000Z b2",
            ]
        );
    }

    #[test]
    fn test_empty_source_is_never_queued() {
        let a = "2016-02-01T10:11:12.000Z a1\n";
        let m = merger(&[("a", a), ("empty", "")]);

        assert_eq!(m.sources_added(), 2);
        assert_eq!(m.active_sources(), 1);

        let out = emitted(m);
        assert_eq!(out, vec![("a".to_string(), "2016-02-01T10:11:12.000Z a1".to_string())]);
    }

    #[test]
    fn test_emitted_counts_records() {
        let mut m = merger(&[("a", "one\n\ntwo\n"), ("b", "three\n")]);
        assert_eq!(m.emitted(), 0);

        while m.next_record().unwrap().is_some() {}
        assert_eq!(m.emitted(), 3);
        assert_eq!(m.active_sources(), 0);
    }

    #[test]
    fn test_undetected_source_sorts_first() {
        let dated = "2016-02-01T10:11:12.000Z dated\n";
        let plain = "just text\n\nmore text\n";

        let out = emitted(merger(&[("dated", dated), ("plain", plain)]));
        let sources: Vec<_> = out.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(sources, vec!["plain", "plain", "dated"]);
    }

    #[test]
    fn test_continuation_stays_with_its_entry() {
        let a = "2016-02-01T10:00:00.000Z a boom\n  at frame one\n  at frame two\n";
        let b = "2016-02-01T10:00:01.000Z b later\n";

        let out = emitted(merger(&[("a", a), ("b", b)]));
        assert_eq!(out[0].1, "2016-02-01T10:00:00.000Z a boom");
        assert_eq!(out[1].1, "  at frame one\n  at frame two");
        assert_eq!(out[2].0, "b");
    }

    #[test]
    fn test_line_numbers_count_dated_lines() {
        let a = "2016-02-01T10:00:00.000Z a1\ntrace\n\n2016-02-01T10:00:02.000Z a2\n";
        let records: Vec<_> = merger(&[("a", a)]).map(|r| r.unwrap()).collect();

        let lines: Vec<_> = records.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![1, 1, 2]);
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }

    #[test]
    fn test_read_error_is_fatal() {
        let catalog = Arc::new(FormatCatalog::new());
        let mut m: LogMerger<BufReader<FailingReader>> = LogMerger::new();
        let err = m
            .add_source(RecordAssembler::new("bad.log", BufReader::new(FailingReader), catalog))
            .unwrap_err();

        assert_eq!(
            err,
            MergeError::ReadError {
                source_name: "bad.log".to_string(),
                error_message: "disk on fire".to_string(),
            }
        );
    }

    #[test]
    fn test_iterator_stops_after_error() {
        struct FailSecond {
            calls: usize,
        }
        impl Read for FailSecond {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                self.calls += 1;
                if self.calls == 1 {
                    let line = b"2016-02-01T10:00:00.000Z ok\n";
                    buf[..line.len()].copy_from_slice(line);
                    Ok(line.len())
                } else {
                    Err(io::Error::new(io::ErrorKind::Other, "gone"))
                }
            }
        }

        let catalog = Arc::new(FormatCatalog::new());
        let mut m = LogMerger::new();
        m.add_source(RecordAssembler::new(
            "flaky.log",
            BufReader::new(FailSecond { calls: 0 }),
            catalog,
        ))
        .unwrap();

        assert!(matches!(m.next(), Some(Err(MergeError::ReadError { .. }))));
        assert!(m.next().is_none());
    }
}
