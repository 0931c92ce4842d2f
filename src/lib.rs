pub mod models;
pub mod error;
pub mod formats;
pub mod detector;
pub mod assembler;
pub mod merger;
pub mod config;
pub mod logging;
pub mod cli;
pub mod commands;


pub use models::*;
pub use error::MergeError;
pub use formats::TimestampFormat;
pub use detector::{DetectorState, FormatCatalog, FormatMatcher};
pub use assembler::{AssemblerState, Boundary, RecordAssembler};
pub use merger::LogMerger;
pub use config::MergeConfig;
