use crate::cli::OutputFormat;
use crate::config::MergeConfig;
use crate::error::MergeError;
use crate::models::{MergedRecord, Timestamp};
use colored::*;
use serde::Serialize;
use std::path::Path;

pub struct OutputFormatter {
    format: OutputFormat,
    filename_width: usize,
    print_linenum: bool,
    color: bool,
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    source: &'a str,
    line: usize,
    timestamp: Option<Timestamp>,
    text: &'a str,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            filename_width: 0,
            print_linenum: false,
            color: false,
        }
    }

    pub fn from_config(config: &MergeConfig) -> Self {
        Self::new(config.output)
            .with_filename_width(config.filename_width)
            .with_linenum(config.print_linenum)
            .with_color(config.color)
    }

    pub fn with_filename_width(mut self, width: usize) -> Self {
        self.filename_width = width;
        self
    }

    pub fn with_linenum(mut self, enabled: bool) -> Self {
        self.print_linenum = enabled;
        self
    }

    pub fn with_color(mut self, enabled: bool) -> Self {
        self.color = enabled;
        self
    }

    pub fn format_record(&self, record: &MergedRecord) -> Result<String, MergeError> {
        match self.format {
            OutputFormat::Plain => Ok(self.format_plain(record)),
            OutputFormat::Json => self.format_json(record),
        }
    }

    fn format_plain(&self, record: &MergedRecord) -> String {
        let text = record.trimmed_text();
        let mut prefix = String::new();

        if self.filename_width > 0 {
            prefix.push_str(&filename_column(&record.source, self.filename_width));
        }
        if self.print_linenum && !text.is_empty() {
            prefix.push_str(&format!("{} ", record.line));
        }

        if self.color && !prefix.is_empty() {
            format!("{}{}", prefix.dimmed(), text)
        } else {
            prefix.push_str(text);
            prefix
        }
    }

    fn format_json(&self, record: &MergedRecord) -> Result<String, MergeError> {
        let json = JsonRecord {
            source: &record.source,
            line: record.line,
            timestamp: record.timestamp,
            text: record.trimmed_text(),
        };
        serde_json::to_string(&json).map_err(|e| MergeError::serialize(&e))
    }
}

/// File name padded or cut to `width` characters, plus a separating space.
///
/// Names that do not fit (with one trailing space) keep `width - 1`
/// characters and end in `+`.
pub fn filename_column(source: &str, width: usize) -> String {
    let mut column: String = display_name(source).chars().chain(std::iter::once(' ')).collect();
    if column.chars().count() > width {
        column = column
            .chars()
            .take(width.saturating_sub(1))
            .chain(std::iter::once('+'))
            .collect();
    }
    format!("{:<width$} ", column, width = width)
}

/// Last path component of a source name
pub fn display_name(source: &str) -> String {
    Path::new(source)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| source.to_string())
}
