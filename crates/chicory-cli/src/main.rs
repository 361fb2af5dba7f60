#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod diagnostics;
mod logging;

use clap::Parser;
use chicory_core::Config;
use commands::PluginArgs;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chicory")]
#[command(author, version, about = "Build and check .chic modules through the chicory plugin", long_about = None)]
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
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Build the module graph from an entry point
    Build {
        /// Entry point file
        entry: PathBuf,

        /// Write the manifest to a file instead of stdout
        #[arg(long, short = 'o')]
        outfile: Option<PathBuf>,

        #[command(flatten)]
        plugin: PluginArgs,
    },

    /// Compile a single .chic file and print the module body
    Compile {
        /// The file to compile
        file: PathBuf,

        #[command(flatten)]
        plugin: PluginArgs,
    },

    /// Show what a specifier resolves to with the plugin installed
    Resolve {
        /// Import specifier
        specifier: String,

        /// Importing module (defaults to the working directory)
        #[arg(long, value_name = "PATH")]
        importer: Option<PathBuf>,

        #[command(flatten)]
        plugin: PluginArgs,
    },

    /// Compile every .chic file under a directory and report all failures
    Check {
        /// Directory to scan (defaults to the working directory)
        dir: Option<PathBuf>,

        #[command(flatten)]
        plugin: PluginArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd.clone())
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Build {
            entry,
            outfile,
            plugin,
        }) => {
            let span = tracing::info_span!("build", cmd = "build", cwd = %cwd.display());
            let _guard = span.enter();
            commands::build::run(
                commands::build::BuildAction {
                    entry,
                    cwd: config.cwd.clone(),
                    outfile,
                    plugin,
                },
                cli.json,
            )
        }
        Some(Commands::Compile { file, plugin }) => {
            let span = tracing::info_span!("compile", cmd = "compile", cwd = %cwd.display());
            let _guard = span.enter();
            commands::compile::run(&config.cwd, &file, &plugin, cli.json)
        }
        Some(Commands::Resolve {
            specifier,
            importer,
            plugin,
        }) => commands::resolve::run(
            &config.cwd,
            &specifier,
            importer.as_deref(),
            &plugin,
            cli.json,
        ),
        Some(Commands::Check { dir, plugin }) => {
            let span = tracing::info_span!("check", cmd = "check", cwd = %cwd.display());
            let _guard = span.enter();
            commands::check::run(&config.cwd, dir.as_deref(), &plugin, cli.json)
        }
    }
}
