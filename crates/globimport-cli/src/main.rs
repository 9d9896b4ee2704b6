#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_lines)]

mod commands;
mod logging;

use clap::Parser;
use globimport_core::Config;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "globimport")]
#[command(author, version, about = "Rewrite import.meta.importGlob calls into concrete imports", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Transform one module and print the result
    Transform {
        /// The module to transform
        file: PathBuf,

        #[command(flatten)]
        project: commands::project::ProjectArgs,

        /// Include the source map in JSON output
        #[arg(long)]
        sourcemap: bool,
    },

    /// Transform every module under the root and keep glob imports fresh
    Watch {
        #[command(flatten)]
        project: commands::project::ProjectArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine working directory
    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);
    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Commands::Transform {
            file,
            project,
            sourcemap,
        } => commands::transform::run(
            &config,
            commands::transform::TransformAction {
                file,
                project,
                sourcemap,
            },
        ),
        Commands::Watch { project } => {
            commands::watch::run(&config, commands::watch::WatchAction { project })
        }
    }
}
