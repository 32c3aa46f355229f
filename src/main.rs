mod classifier;
mod commands;
mod config;
mod corpus;
mod diagnostics;
mod error;
mod extractor;
mod info;
mod inventory;
mod paths;
mod resolver;
mod scanner;
mod source_index;
mod types;
mod urls;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Command-line interface.
#[derive(Parser)]
#[command(
    name = "docmend",
    version,
    about = "Extract C# structure and repair links in generated markdown docs"
)]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
    /// Enable info-level logging (otherwise `RUST_LOG`, default warn).
    #[arg(long, global = true)]
    verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Show which classification rule a source path falls under
    Classify {
        /// Path relative to the source root, e.g. `Api/CreateOrderCommandHandler.cs`
        path: String,
    },
    /// Extract declarations from the source tree and print them as JSON
    Extract {
        /// Print single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// Output a comprehensive reference document
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List heading anchors and the entity map of the docs corpus
    Inventory {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Repair broken links in the docs corpus
    Resolve {
        /// Report documents that need repair without writing (exit 1 if any)
        #[arg(long, conflicts_with = "out")]
        check: bool,
        /// Write the repaired corpus to this directory instead of in place
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Classify { path } => commands::classify(&path).map(|()| return ExitCode::SUCCESS),
        Commands::Extract { compact } => {
            commands::extract(compact).map(|()| return ExitCode::SUCCESS)
        },
        Commands::Info { json } => {
            commands::info(json);
            Ok(ExitCode::SUCCESS)
        },
        Commands::Inventory { json } => {
            commands::inventory(json).map(|()| return ExitCode::SUCCESS)
        },
        Commands::Resolve { check, out } => commands::resolve(check, out.as_deref()),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(2)
        },
    };
}

/// Log to stderr so command output on stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| return EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
