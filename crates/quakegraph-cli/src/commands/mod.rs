//! CLI command implementations
//!
//! This module contains all QuakeGraph CLI command implementations and the
//! glue that turns configuration into core pipeline components.

pub mod config;
pub mod graph;
pub mod resolve;
pub mod scan;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use quakegraph_config::{ConfigLoader, PassThroughMode, QuakeGraphConfig};
use quakegraph_core::{
    AssemblerConfig, BaseCorpus, CommandDisassembler, Disassembler, ExpansionMode, GameLoader,
    GameState, LiteralTableDisassembler, ProjectScanner, ScanConfig,
};
use tracing::{info, warn};

use crate::GlobalOptions;

/// Resolve the game root from options or current directory.
pub fn resolve_root(global: &GlobalOptions) -> Result<PathBuf> {
    match global.root {
        Some(ref root) => root
            .canonicalize()
            .with_context(|| format!("Game root not found: {}", root.display())),
        None => std::env::current_dir().context("Failed to get current directory"),
    }
}

/// Load configuration, applying CLI overrides.
///
/// An explicit `--config` file takes the place of the local config.
pub fn load_config(global: &GlobalOptions, root: &Path) -> Result<QuakeGraphConfig> {
    let mut loader = ConfigLoader::new();
    let overrides = global.to_config_overrides();

    if let Some(ref config_path) = global.config {
        return loader
            .load_file(config_path, Some(&overrides))
            .with_context(|| format!("Failed to load config file {}", config_path.display()));
    }

    loader
        .load(root, Some(&overrides))
        .context("Failed to load configuration")
}

/// Log level from configuration, if it loads. Used before logging is set up,
/// so failures are left for the command itself to report.
pub fn configured_log_level(global: &GlobalOptions) -> Option<String> {
    let root = resolve_root(global).ok()?;
    load_config(global, &root).ok().map(|c| c.logging.level)
}

/// Project scanner built from the `[scan]` section.
pub fn build_scanner(config: &QuakeGraphConfig) -> ProjectScanner {
    let defaults = ScanConfig::default();
    let mut exclude_patterns = defaults.exclude_patterns;
    for pattern in &config.scan.exclude_patterns {
        if !exclude_patterns.contains(pattern) {
            exclude_patterns.push(pattern.clone());
        }
    }
    ProjectScanner::new(ScanConfig {
        exclude_patterns,
        include_hidden: config.scan.include_hidden,
        follow_links: config.scan.follow_links,
    })
}

/// The configured external disassembler, or the built-in literal dump.
pub fn build_disassembler(config: &QuakeGraphConfig) -> Box<dyn Disassembler> {
    match config.scan.disassembler {
        Some(ref d) => Box::new(CommandDisassembler::new(d.program.clone(), d.args.clone())),
        None => Box::new(LiteralTableDisassembler),
    }
}

/// Game loader from configuration, persisting to `snapshot` when given.
pub fn build_loader(config: &QuakeGraphConfig, snapshot: Option<PathBuf>) -> GameLoader {
    let loader =
        GameLoader::new(build_scanner(config)).with_disassembler(build_disassembler(config));
    match snapshot {
        Some(path) => loader.with_snapshot_path(path),
        None => loader,
    }
}

/// Assembler settings from the `[resolve]` and `[graph]` sections.
pub fn assembler_config(config: &QuakeGraphConfig) -> AssemblerConfig {
    AssemblerConfig {
        expansion: match config.graph.pass_through {
            PassThroughMode::SinglePass => ExpansionMode::SinglePass,
            PassThroughMode::FixedPoint => ExpansionMode::FixedPoint,
        },
        strict_ambiguity: config.resolve.strict_ambiguity,
    }
}

/// Base corpus from a file list and/or a directory; empty when neither is set.
pub fn load_base_corpus(config: &QuakeGraphConfig, root: &Path) -> Result<BaseCorpus> {
    let mut paths: Vec<String> = Vec::new();

    if let Some(ref list) = config.resolve.base_filelist {
        let list = config.base_path(root, list);
        let corpus = BaseCorpus::load_filelist(&list)
            .with_context(|| format!("Failed to read base file list {}", list.display()))?;
        if corpus.is_empty() {
            warn!("Base file list {} is missing or empty", list.display());
        }
        paths.extend(corpus.paths().iter().cloned());
    }

    if let Some(ref dir) = config.resolve.base_corpus_dir {
        let dir = config.base_path(root, dir);
        let corpus = BaseCorpus::from_directory(&dir)
            .with_context(|| format!("Failed to scan base directory {}", dir.display()))?;
        paths.extend(corpus.paths().iter().cloned());
    }

    Ok(BaseCorpus::from_paths(paths))
}

/// Load the snapshot, scanning first when there is none or `rescan` is set.
///
/// A snapshot taken over a different file listing keeps its reference maps
/// but is given the current listing.
pub fn load_state(
    config: &QuakeGraphConfig,
    root: &Path,
    rescan: bool,
    quiet: bool,
) -> Result<GameState> {
    let snapshot = config.snapshot_path(root);
    let existing = if rescan {
        None
    } else {
        GameState::load(&snapshot)
            .with_context(|| format!("Failed to read snapshot {}", snapshot.display()))?
    };

    let Some(state) = existing else {
        print_info("Scanning game tree...", quiet);
        let mut sink = crate::progress::PipelineProgress::new(quiet);
        let state = build_loader(config, Some(snapshot.clone()))
            .load_game(root, &mut sink)
            .context("Failed to scan game tree")?;
        sink.finish("Scan complete");
        return Ok(state);
    };

    let corpus = build_scanner(config)
        .scan(root)
        .context("Failed to list game files")?
        .corpus;
    if state.is_stale(&corpus) {
        warn!(
            "Files changed since the last scan; run `quakegraph scan` to refresh references"
        );
        return Ok(state.with_corpus(corpus));
    }
    info!("Using snapshot {}", snapshot.display());
    Ok(state)
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}
