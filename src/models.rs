use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Point in time recovered from a log line. Offsets carried by a line are ignored.
pub type Timestamp = NaiveDateTime;

/// Timestamp of every source before its first dated line
pub const SENTINEL_TIMESTAMP: Timestamp = NaiveDateTime::MIN;

/// One logical log entry assembled from one or more raw lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Raw lines in original order, terminators included
    pub text: String,
    /// Last timestamp seen on this source when the record was closed
    pub timestamp: Timestamp,
    /// Count of dated lines seen on this source so far
    pub line_number: usize,
}

impl Record {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            timestamp: SENTINEL_TIMESTAMP,
            line_number: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// False while the source has never produced a timestamp
    pub fn is_dated(&self) -> bool {
        self.timestamp != SENTINEL_TIMESTAMP
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::empty()
    }
}

/// A record emitted by the merge, tagged with its source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub source: String,
    pub line: usize,
    /// `None` when the source had no timestamp yet
    pub timestamp: Option<Timestamp>,
    pub text: String,
}

impl MergedRecord {
    pub fn new(source: impl Into<String>, record: Record) -> Self {
        let timestamp = record.is_dated().then_some(record.timestamp);
        Self {
            source: source.into(),
            line: record.line_number,
            timestamp,
            text: record.text,
        }
    }

    /// Text with trailing whitespace removed
    pub fn trimmed_text(&self) -> &str {
        self.text.trim_end()
    }
}
