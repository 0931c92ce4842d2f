use crate::formats::{slice_chars, Shape, TimestampFormat};
use crate::models::Timestamp;
use regex::Regex;

/// Compiled recognition rule for one timestamp format
#[derive(Debug, Clone)]
pub struct FormatMatcher {
    format: TimestampFormat,
    check: Check,
}

#[derive(Debug, Clone)]
enum Check {
    Words {
        start: usize,
        end: usize,
        words: &'static [&'static str],
    },
    Pattern {
        skip: usize,
        regex: Regex,
    },
}

impl FormatMatcher {
    pub fn new(format: TimestampFormat) -> Result<Self, regex::Error> {
        let check = match format.shape() {
            Shape::Prefix { start, end, words } => Check::Words { start, end, words },
            Shape::Pattern { skip, regex } => Check::Pattern {
                skip,
                regex: Regex::new(regex)?,
            },
        };
        Ok(Self { format, check })
    }

    pub fn format(&self) -> TimestampFormat {
        self.format
    }

    /// Whether the line has this format's shape; says nothing about whether it parses
    pub fn accepts(&self, line: &str) -> bool {
        match &self.check {
            Check::Words { start, end, words } => {
                let candidate = slice_chars(line, *start, *end);
                words.contains(&candidate)
            }
            Check::Pattern { skip, regex } => {
                let rest = slice_chars(line, *skip, usize::MAX);
                regex.is_match(rest)
            }
        }
    }
}

/// Ordered set of matchers, evaluated first-match-wins
#[derive(Debug, Clone)]
pub struct FormatCatalog {
    matchers: Vec<FormatMatcher>,
}

impl FormatCatalog {
    pub fn new() -> Self {
        let matchers = TimestampFormat::ALL
            .iter()
            .map(|format| FormatMatcher::new(*format).expect("built-in timestamp pattern compiles"))
            .collect();
        Self { matchers }
    }

    /// First format whose shape accepts `line`
    pub fn detect(&self, line: &str) -> Option<TimestampFormat> {
        if line.is_empty() {
            return None;
        }
        self.matchers
            .iter()
            .find(|matcher| matcher.accepts(line))
            .map(FormatMatcher::format)
    }

    pub fn matchers(&self) -> &[FormatMatcher] {
        &self.matchers
    }
}

impl Default for FormatCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-source memo of the detected format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectorState {
    #[default]
    Undetermined,
    Locked(TimestampFormat),
}

impl DetectorState {
    pub fn new() -> Self {
        Self::Undetermined
    }

    pub fn locked(&self) -> Option<TimestampFormat> {
        match self {
            DetectorState::Undetermined => None,
            DetectorState::Locked(format) => Some(*format),
        }
    }

    /// Timestamp carried by `line`, probing the catalog until a format locks.
    ///
    /// Once locked the format is never reconsidered; lines that no longer parse
    /// under it simply have no timestamp.
    pub fn timestamp(&mut self, catalog: &FormatCatalog, line: &str) -> Option<Timestamp> {
        if let DetectorState::Undetermined = self {
            if let Some(format) = catalog.detect(line) {
                *self = DetectorState::Locked(format);
            }
        }

        self.locked()?.parse(line).ok()
    }
}
