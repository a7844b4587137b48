//! tagcache CLI - file-based memoization with tag invalidation.
//!
//! Provides commands for:
//! - `run`: Print the cached stdout of a command, running it on a miss
//! - `invalidate-tag`: Invalidate every entry carrying a tag
//! - `invalidate-key`: Invalidate a single entry
//! - `path`: Print the storage path of a key or tag

mod commands;
mod error;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{GlobalArgs, InvalidateKeyArgs, InvalidateTagArgs, PathArgs, RunArgs};
use output::Output;

/// tagcache - file-based memoization cache with tag invalidation.
#[derive(Parser, Debug)]
#[command(name = "tagcache", version, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the cached stdout of a command, running it only when stale.
    Run(RunArgs),
    /// Invalidate all entries carrying the given tags.
    InvalidateTag(InvalidateTagArgs),
    /// Invalidate the entries for the given keys.
    InvalidateKey(InvalidateKeyArgs),
    /// Print the storage path of a key or tag.
    Path(PathArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(cli.global.verbose, rust_log.as_deref());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Run(args) => args.execute(&cli.global),
        Commands::InvalidateTag(args) => args.execute(&cli.global),
        Commands::InvalidateKey(args) => args.execute(&cli.global),
        Commands::Path(args) => args.execute(&cli.global),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// --verbose enables INFO level, otherwise use RUST_LOG or default to WARN.
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    if verbose {
        return EnvFilter::new("info");
    }
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}
