use crate::assembler::RecordAssembler;
use crate::cli::MergeArgs;
use crate::commands::output::OutputFormatter;
use crate::config::MergeConfig;
use crate::detector::FormatCatalog;
use crate::error::MergeError;
use crate::merger::LogMerger;
use glob::glob;
use std::fs::File;
use std::io::{stdout, BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub fn run_merge(args: MergeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = MergeConfig::from(&args);

    let files = expand_globs(&args.files)?;
    if files.len() < 2 {
        return Err(Box::new(MergeError::UsageError {
            message: format!("need at least two files to merge, got {}", files.len()),
        }));
    }
    if let Some(ref path) = args.output_file {
        check_output_path(path, &files)?;
    }

    // Sources are opened before the output file is created, so a bad
    // input never truncates an existing output
    let sources = open_sources(&files, &config)?;

    let mut output: Box<dyn Write> = if let Some(ref path) = args.output_file {
        let file = File::create(path).map_err(|e| MergeError::open(path.display().to_string(), &e))?;
        Box::new(BufWriter::new(file))
    } else {
        Box::new(BufWriter::new(stdout().lock()))
    };

    merge_sources(sources, &config, &mut output)?;
    Ok(())
}

/// Refuse an output path that names one of the inputs
pub fn check_output_path(output: &Path, files: &[PathBuf]) -> Result<(), MergeError> {
    let Ok(target) = output.canonicalize() else {
        // Not there yet, so it cannot be an input
        return Ok(());
    };

    for file in files {
        if file.canonicalize().map(|f| f == target).unwrap_or(false) {
            return Err(MergeError::UsageError {
                message: format!(
                    "output file '{}' is also an input",
                    output.display()
                ),
            });
        }
    }
    Ok(())
}

/// Open every file up front; any failure aborts before merging starts
pub fn open_sources(
    files: &[PathBuf],
    config: &MergeConfig,
) -> Result<Vec<RecordAssembler<BufReader<File>>>, MergeError> {
    let catalog = Arc::new(FormatCatalog::new());

    files
        .iter()
        .map(|path| -> Result<_, MergeError> {
            let name = path.display().to_string();
            let file = File::open(path).map_err(|e| MergeError::open(name.clone(), &e))?;
            info!(source = %name, "opened source");
            let reader = BufReader::with_capacity(config.buffer_size, file);
            Ok(RecordAssembler::new(name, reader, Arc::clone(&catalog)))
        })
        .collect()
}

/// Merge `files` into `output`, returning the number of records written
pub fn merge_files<W: Write + ?Sized>(
    files: &[PathBuf],
    config: &MergeConfig,
    output: &mut W,
) -> Result<usize, MergeError> {
    let sources = open_sources(files, config)?;
    merge_sources(sources, config, output)
}

fn merge_sources<R: BufRead, W: Write + ?Sized>(
    sources: Vec<RecordAssembler<R>>,
    config: &MergeConfig,
    output: &mut W,
) -> Result<usize, MergeError> {
    let source_count = sources.len();
    let merger = LogMerger::from_sources(sources)?;
    let formatter = OutputFormatter::from_config(config);
    let written = write_merged(merger, &formatter, output)?;
    info!(records = written, sources = source_count, "merge finished");
    Ok(written)
}

/// Drain `merger` through `formatter`. A closed pipe ends output quietly.
pub fn write_merged<R: BufRead, W: Write + ?Sized>(
    mut merger: LogMerger<R>,
    formatter: &OutputFormatter,
    output: &mut W,
) -> Result<usize, MergeError> {
    let mut written = 0;

    while let Some(record) = merger.next_record()? {
        let line = formatter.format_record(&record)?;
        match writeln!(output, "{}", line) {
            Ok(()) => written += 1,
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                debug!(written, emitted = merger.emitted(), "output closed");
                return Ok(written);
            }
            Err(e) => return Err(MergeError::output(&e)),
        }
    }

    match output.flush() {
        Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(MergeError::output(&e)),
        _ => Ok(written),
    }
}

pub fn expand_globs(patterns: &[PathBuf]) -> Result<Vec<PathBuf>, MergeError> {
    let mut files = Vec::new();
    for pattern in patterns {
        let pattern_str = pattern.to_string_lossy();
        if pattern_str.contains('*') || pattern_str.contains('?') {
            let glob_error = |message: String| MergeError::GlobError {
                pattern: pattern_str.to_string(),
                error_message: message,
            };
            let entries = glob(&pattern_str).map_err(|e| glob_error(e.to_string()))?;
            for entry in entries {
                files.push(entry.map_err(|e| glob_error(e.to_string()))?);
            }
        } else {
            files.push(pattern.clone());
        }
    }
    Ok(files)
}
