use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "logmerge")]
#[command(author, version, about = "Merge multiple log files chronologically")]
pub struct Cli {
    #[command(flatten)]
    pub merge: MergeArgs,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    /// Log files to merge, at least two (supports glob patterns)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Prefix records with the file name in a column this wide (0 = off)
    #[arg(long = "print-filename", short = 'f', value_name = "WIDTH")]
    pub print_filename: Option<usize>,

    /// Prefix records with the source's count of dated lines
    #[arg(long = "print-linenum", short = 'l')]
    pub print_linenum: bool,

    /// Output format
    #[arg(long, short, value_enum, default_value = "plain")]
    pub output: OutputFormat,

    /// Output file (default: stdout)
    #[arg(long)]
    pub output_file: Option<PathBuf>,

    /// Dim the file name and line number prefixes
    #[arg(long)]
    pub color: bool,

    /// Read buffer size per source, in bytes
    #[arg(long, default_value = "65536")]
    pub buffer_size: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    /// Record text, optionally prefixed with file name and line number
    Plain,
    /// One JSON object per record
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Plain => write!(f, "plain"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
