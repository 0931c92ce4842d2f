use std::fmt;
use serde::{Deserialize, Serialize};

/// Error types for log merging operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MergeError {
    /// Invocation does not describe a mergeable set of sources
    UsageError {
        message: String,
    },
    /// A source could not be opened
    OpenError {
        path: String,
        error_message: String,
    },
    /// Reading from an already open source failed
    ReadError {
        source_name: String,
        error_message: String,
    },
    /// A line matched a timestamp shape but its contents did not parse
    TimestampParseError {
        input: String,
        format: String,
    },
    /// A file pattern could not be expanded
    GlobError {
        pattern: String,
        error_message: String,
    },
    /// Writing merged output failed
    OutputError {
        error_message: String,
    },
}

impl MergeError {
    pub fn open(path: impl Into<String>, error: &std::io::Error) -> Self {
        MergeError::OpenError {
            path: path.into(),
            error_message: error.to_string(),
        }
    }

    pub fn read(source_name: impl Into<String>, error: &std::io::Error) -> Self {
        MergeError::ReadError {
            source_name: source_name.into(),
            error_message: error.to_string(),
        }
    }

    pub fn output(error: &std::io::Error) -> Self {
        MergeError::OutputError {
            error_message: error.to_string(),
        }
    }

    pub fn serialize(error: &serde_json::Error) -> Self {
        MergeError::OutputError {
            error_message: error.to_string(),
        }
    }
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeError::UsageError { message } => {
                write!(f, "Usage error: {}", message)
            }
            MergeError::OpenError { path, error_message } => {
                write!(f, "Cannot open '{}': {}", path, error_message)
            }
            MergeError::ReadError { source_name, error_message } => {
                write!(f, "Read error in '{}': {}", source_name, error_message)
            }
            MergeError::TimestampParseError { input, format } => {
                write!(f, "Failed to parse '{}' as {} timestamp", input, format)
            }
            MergeError::GlobError { pattern, error_message } => {
                write!(f, "Invalid file pattern '{}': {}", pattern, error_message)
            }
            MergeError::OutputError { error_message } => {
                write!(f, "Output error: {}", error_message)
            }
        }
    }
}

impl std::error::Error for MergeError {}
