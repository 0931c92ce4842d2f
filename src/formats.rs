use crate::error::MergeError;
use crate::models::Timestamp;
use chrono::{DateTime, Datelike, Local, NaiveDateTime};
use std::fmt;

const WEEKDAYS: &[&str] = &["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

// May is left out: "May" vs "Mon" makes a weekday-led line look like a month-led one.
const MONTHS: &[&str] = &[
    "Jan", "Feb", "Mar", "Apr", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// How a format is recognised on a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Characters `start..end` must equal one of `words`
    Prefix {
        start: usize,
        end: usize,
        words: &'static [&'static str],
    },
    /// Regex matched from character `skip` onwards (the pattern carries its own `^`)
    Pattern {
        skip: usize,
        regex: &'static str,
    },
}

/// Known timestamp conventions, one per log family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampFormat {
    /// `[Mon Dec 04 04:47:44.123456 2005] ...`
    Apache,
    /// `[2016-02-01T10:11:12+00:00] ...`
    BracketedIso,
    /// `Feb  4 10:11:12 host daemon: ...` with no year
    ClusterManager,
    /// `2016-02-01 10:11:12.345 ...`
    ComputeLog,
    /// `2016-02-01T10:11:12.345Z ...`
    UtcZ,
    /// `2016-02-01T10:11:12.345678+01:00 ...`
    SystemMessages,
    /// `I, [2016-02-01T10:11:12.345678 #1234] ...`
    TaggedSeverity,
    /// `2016-02-01 10:11:12 +0100 ...`
    JoinLog,
    /// `2016-02-01T10:11:12+01:00 ...`
    AgentNode,
    /// `#1454321472`
    ShellHistory,
}

impl TimestampFormat {
    /// Every format, in detection priority order
    pub const ALL: [TimestampFormat; 10] = [
        TimestampFormat::Apache,
        TimestampFormat::BracketedIso,
        TimestampFormat::ClusterManager,
        TimestampFormat::ComputeLog,
        TimestampFormat::UtcZ,
        TimestampFormat::SystemMessages,
        TimestampFormat::TaggedSeverity,
        TimestampFormat::JoinLog,
        TimestampFormat::AgentNode,
        TimestampFormat::ShellHistory,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TimestampFormat::Apache => "apache",
            TimestampFormat::BracketedIso => "bracketed-iso",
            TimestampFormat::ClusterManager => "cluster-manager",
            TimestampFormat::ComputeLog => "compute-log",
            TimestampFormat::UtcZ => "utc-z",
            TimestampFormat::SystemMessages => "system-messages",
            TimestampFormat::TaggedSeverity => "tagged-severity",
            TimestampFormat::JoinLog => "join-log",
            TimestampFormat::AgentNode => "agent-node",
            TimestampFormat::ShellHistory => "shell-history",
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            TimestampFormat::Apache => Shape::Prefix { start: 1, end: 4, words: WEEKDAYS },
            TimestampFormat::BracketedIso => Shape::Pattern {
                skip: 1,
                regex: r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}.[0-9]{2}:[0-9]{2}",
            },
            TimestampFormat::ClusterManager => Shape::Prefix { start: 0, end: 3, words: MONTHS },
            TimestampFormat::ComputeLog => Shape::Pattern {
                skip: 0,
                regex: r"^[0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2}\.[0-9]{3}",
            },
            TimestampFormat::UtcZ => Shape::Pattern {
                skip: 0,
                regex: r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}\.[0-9]{3}Z",
            },
            TimestampFormat::SystemMessages => Shape::Pattern {
                skip: 0,
                regex: r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}\.[0-9]{6}\+[0-9]{2}:[0-9]{2}",
            },
            TimestampFormat::TaggedSeverity => Shape::Pattern {
                skip: 0,
                regex: r"^[ID], \[[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}\.[0-9]{6}",
            },
            TimestampFormat::JoinLog => Shape::Pattern {
                skip: 0,
                regex: r"^[\[0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2} .[0-9]{4}",
            },
            TimestampFormat::AgentNode => Shape::Pattern {
                skip: 0,
                regex: r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}.[0-9]{2}:[0-9]{2}",
            },
            TimestampFormat::ShellHistory => Shape::Pattern {
                skip: 0,
                regex: r"^#1?[0-9]{9}",
            },
        }
    }

    /// Extract the timestamp from a line already recognised as this format
    pub fn parse(&self, line: &str) -> Result<Timestamp, MergeError> {
        match self {
            TimestampFormat::Apache => {
                self.parse_slice(slice_chars(line, 5, 32), "%b %d %H:%M:%S%.f %Y")
            }
            TimestampFormat::BracketedIso => {
                self.parse_slice(slice_chars(line, 0, 20), "[%Y-%m-%dT%H:%M:%S")
            }
            TimestampFormat::ClusterManager => {
                // Syslog pads single-digit days with a space
                let stamp = slice_chars(line, 0, 15)
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ");
                let with_year = format!("{} {}", stamp, Local::now().year());
                self.parse_slice(&with_year, "%b %d %H:%M:%S %Y")
            }
            TimestampFormat::ComputeLog => {
                self.parse_slice(slice_chars(line, 0, 23), "%Y-%m-%d %H:%M:%S%.f")
            }
            TimestampFormat::UtcZ => {
                self.parse_slice(slice_chars(line, 0, 23), "%Y-%m-%dT%H:%M:%S%.f")
            }
            TimestampFormat::SystemMessages => {
                self.parse_slice(slice_chars(line, 0, 26), "%Y-%m-%dT%H:%M:%S%.f")
            }
            TimestampFormat::TaggedSeverity => {
                self.parse_slice(slice_chars(line, 4, 30), "%Y-%m-%dT%H:%M:%S%.f")
            }
            TimestampFormat::JoinLog => {
                self.parse_slice(slice_chars(line, 0, 19), "%Y-%m-%d %H:%M:%S")
            }
            TimestampFormat::AgentNode => {
                self.parse_slice(slice_chars(line, 0, 19), "%Y-%m-%dT%H:%M:%S")
            }
            TimestampFormat::ShellHistory => self.parse_epoch(line),
        }
    }

    fn parse_slice(&self, input: &str, pattern: &str) -> Result<Timestamp, MergeError> {
        NaiveDateTime::parse_from_str(input, pattern).map_err(|_| self.parse_error(input))
    }

    fn parse_epoch(&self, line: &str) -> Result<Timestamp, MergeError> {
        let digits = line
            .strip_prefix('#')
            .and_then(epoch_digits)
            .ok_or_else(|| self.parse_error(line))?;
        let seconds: i64 = digits.parse().map_err(|_| self.parse_error(digits))?;
        DateTime::from_timestamp(seconds, 0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| self.parse_error(digits))
    }

    fn parse_error(&self, input: &str) -> MergeError {
        MergeError::TimestampParseError {
            input: input.to_string(),
            format: self.name().to_string(),
        }
    }
}

impl fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Leading epoch digits as `1?[0-9]{9}` would capture them
fn epoch_digits(s: &str) -> Option<&str> {
    let run = s.bytes().take_while(|b| b.is_ascii_digit()).count();
    if run >= 10 && s.starts_with('1') {
        Some(&s[..10])
    } else if run >= 9 {
        Some(&s[..9])
    } else {
        None
    }
}

/// Characters `start..end` of `line`, clamped to its length
pub fn slice_chars(line: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    let byte_at = |n: usize| {
        line.char_indices()
            .nth(n)
            .map(|(i, _)| i)
            .unwrap_or(line.len())
    };
    &line[byte_at(start)..byte_at(end)]
}
