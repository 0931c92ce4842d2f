use crate::cli::{MergeArgs, OutputFormat};

/// Settings for one merge run
#[derive(Debug, Clone, PartialEq)]
pub struct MergeConfig {
    /// Width of the file name column (0 = no column)
    pub filename_width: usize,
    /// Prefix records with the source's dated line count
    pub print_linenum: bool,
    pub output: OutputFormat,
    /// Dim prefixes
    pub color: bool,
    /// Buffer size for reading each source
    pub buffer_size: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            filename_width: 0,
            print_linenum: false,
            output: OutputFormat::Plain,
            color: false,
            buffer_size: 64 * 1024, // 64KB
        }
    }
}

impl From<&MergeArgs> for MergeConfig {
    fn from(args: &MergeArgs) -> Self {
        Self {
            filename_width: args.print_filename.unwrap_or(0),
            print_linenum: args.print_linenum,
            output: args.output,
            color: args.color,
            buffer_size: args.buffer_size.max(1),
        }
    }
}
