//! QuakeGraph CLI - Asset dependency graphs for Quake III content
//!
//! A command-line interface for scanning game content trees, building their
//! asset dependency graphs and checking how individual references resolve.
//!
//! # Usage
//!
//! ```bash
//! # Scan a game tree and write the snapshot
//! quakegraph --root ~/q3/mymod scan
//!
//! # Build the graph and write it as JSON
//! quakegraph graph -o graph.json
//!
//! # See where a reference goes
//! quakegraph resolve textures/base_wall/concrete
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;
mod progress;

/// QuakeGraph - Asset dependency graphs for Quake III content
#[derive(Parser, Debug)]
#[command(name = "quakegraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Game content root (defaults to the current directory)
    #[arg(long, short = 'r', global = true, env = "QUAKEGRAPH_ROOT")]
    root: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true, env = "QUAKEGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Directory holding the base game content
    #[arg(long, global = true, env = "QUAKEGRAPH_BASE_DIR")]
    base_dir: Option<PathBuf>,

    /// JSON file list of the base game content
    #[arg(long, global = true, env = "QUAKEGRAPH_BASE_LIST")]
    base_list: Option<PathBuf>,

    /// Report ambiguous references as not found instead of failing
    #[arg(long, global = true)]
    lenient: bool,

    /// Pass-through expansion (single-pass, fixed-point)
    #[arg(long, global = true, value_parser = parse_pass_through)]
    pass_through: Option<quakegraph_config::PassThroughMode>,
}

/// Parse pass-through mode from string
fn parse_pass_through(s: &str) -> Result<quakegraph_config::PassThroughMode, String> {
    s.parse()
        .map_err(|e: quakegraph_config::ConfigError| e.to_string())
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> quakegraph_config::ConfigOverrides {
        quakegraph_config::ConfigOverrides {
            base_corpus_dir: self.base_dir.clone(),
            base_filelist: self.base_list.clone(),
            strict_ambiguity: self.lenient.then_some(false),
            pass_through: self.pass_through,
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan the game tree and write the snapshot
    Scan(commands::scan::ScanArgs),

    /// Build the asset graph from the snapshot
    Graph(commands::graph::GraphArgs),

    /// Show how references resolve against the game tree
    Resolve(commands::resolve::ResolveArgs),

    /// View and manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity, falling back to the configured level
    let log_level = if cli.global.quiet {
        Level::ERROR
    } else if cli.global.verbose {
        Level::DEBUG
    } else {
        commands::configured_log_level(&cli.global)
            .and_then(|level| level.parse().ok())
            .unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Scan(args) => commands::scan::execute(args, cli.global),
        Commands::Graph(args) => commands::graph::execute(args, cli.global),
        Commands::Resolve(args) => commands::resolve::execute(args, cli.global),
        Commands::Config(cmd) => commands::config::execute(cmd, cli.global),
    }
}
