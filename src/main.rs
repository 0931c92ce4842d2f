use clap::Parser;
use logmerge::cli::Cli;
use logmerge::commands::run_merge;
use logmerge::logging::init_tracing;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.merge.color {
        colored::control::set_override(true);
    }

    if let Err(e) = run_merge(cli.merge) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
