pub mod merge;
pub mod output;

pub use merge::{expand_globs, merge_files, run_merge};
pub use output::OutputFormatter;
