//! Scan command - Extract references from a game tree and write the snapshot

use anyhow::{Context, Result};
use clap::Args;
use quakegraph_core::LoadStats;
use serde::Serialize;

use super::{build_loader, load_config, print_info, resolve_root};
use crate::progress::PipelineProgress;
use crate::GlobalOptions;

/// Arguments for the scan command
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Do not write the snapshot
    #[arg(long)]
    no_snapshot: bool,

    /// Print the scan summary as JSON
    #[arg(long)]
    json: bool,
}

/// Summary printed after a scan.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub files: usize,
    pub maps: usize,
    pub models: usize,
    pub models_with_skins: usize,
    pub shader_scripts: usize,
    pub shaders: usize,
    pub skins: usize,
    pub modules: usize,
    pub entities: usize,
    pub failed: usize,
    pub snapshot: Option<String>,
}

impl ScanSummary {
    fn new(files: usize, shaders: usize, entities: usize, stats: &LoadStats) -> Self {
        Self {
            files,
            maps: stats.maps,
            models: stats.models,
            models_with_skins: stats.models_with_skins,
            shader_scripts: stats.scripts,
            shaders,
            skins: stats.skins,
            modules: stats.modules,
            entities,
            failed: stats.failed,
            snapshot: None,
        }
    }
}

/// Execute the scan command
pub fn execute(args: ScanArgs, global: GlobalOptions) -> Result<()> {
    let root = resolve_root(&global)?;
    let config = load_config(&global, &root)?;
    let quiet = global.quiet || args.json;

    let snapshot = (!args.no_snapshot).then(|| config.snapshot_path(&root));
    let mut loader = build_loader(&config, snapshot.clone());

    print_info(&format!("Scanning {}", root.display()), quiet);
    let mut sink = PipelineProgress::new(quiet);
    let state = loader
        .load_game(&root, &mut sink)
        .context("Failed to scan game tree")?;
    sink.finish("Scan complete");

    let mut summary = ScanSummary::new(
        state.everything.len(),
        state.shaders.len(),
        state.entities.len(),
        loader.stats(),
    );
    summary.snapshot = snapshot.map(|p| p.display().to_string());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if !global.quiet {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &ScanSummary) {
    println!("Files:          {}", summary.files);
    println!("Maps:           {}", summary.maps);
    println!(
        "Models:         {} ({} with skins)",
        summary.models, summary.models_with_skins
    );
    println!(
        "Shader scripts: {} ({} shaders)",
        summary.shader_scripts, summary.shaders
    );
    println!("Skins:          {}", summary.skins);
    println!("QVM modules:    {}", summary.modules);
    println!("Game entities:  {}", summary.entities);
    if summary.failed > 0 {
        println!("Unreadable:     {}", summary.failed);
    }
    if let Some(ref snapshot) = summary.snapshot {
        println!("\nSnapshot written to {}", snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_serialization() {
        let stats = LoadStats {
            maps: 2,
            models: 3,
            ..Default::default()
        };
        let summary = ScanSummary::new(10, 4, 1, &stats);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["files"], 10);
        assert_eq!(json["shaderScripts"], 0);
        assert_eq!(json["modelsWithSkins"], 0);
        assert!(json["snapshot"].is_null());
    }
}
