//! Graph command - Build the asset dependency graph

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use quakegraph_core::{BuildOutput, GraphAssembler, NoProgress, VertexKind};
use serde::Serialize;
use tracing::info;

use super::{assembler_config, load_base_corpus, load_config, load_state, print_info, resolve_root};
use crate::progress::{finish_spinner, finish_spinner_warn, spinner};
use crate::GlobalOptions;

/// Arguments for the graph command
#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Scan the game tree again instead of using the snapshot
    #[arg(long)]
    rescan: bool,

    /// Write the graph JSON to a file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Only print counts, not the graph
    #[arg(long, conflicts_with = "output")]
    summary: bool,
}

/// Counts reported after a build.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSummary {
    pub vertices: BTreeMap<String, usize>,
    pub edges: BTreeMap<String, usize>,
    pub not_found: usize,
    pub baseq3: usize,
    pub assumed_images: usize,
    pub unknown_types: Vec<String>,
}

impl GraphSummary {
    fn from_output(output: &BuildOutput) -> Self {
        let mut summary = GraphSummary {
            not_found: output.not_found.len(),
            baseq3: output.baseq3.len(),
            assumed_images: output.assumed_images.len(),
            unknown_types: output.unknown_types.clone(),
            ..Default::default()
        };
        for kind in [VertexKind::File, VertexKind::Shader, VertexKind::Entity] {
            let count = output.graph.vertices_by_kind(kind).count();
            summary.vertices.insert(kind.as_str().to_string(), count);
        }
        for edge in output.graph.iter_edges() {
            *summary
                .edges
                .entry(edge.kind.as_str().to_string())
                .or_insert(0) += 1;
        }
        summary
    }

    fn print(&self) {
        let total_vertices: usize = self.vertices.values().sum();
        let total_edges: usize = self.edges.values().sum();
        eprintln!("Vertices: {}", total_vertices);
        for (kind, count) in &self.vertices {
            eprintln!("  {}: {}", kind, count);
        }
        eprintln!("Edges: {}", total_edges);
        for (kind, count) in &self.edges {
            eprintln!("  {}: {}", kind, count);
        }
        eprintln!("Not found: {}", self.not_found);
        eprintln!("Base game only: {}", self.baseq3);
        eprintln!("Assumed images: {}", self.assumed_images);
        if !self.unknown_types.is_empty() {
            eprintln!("Unknown file types: {}", self.unknown_types.join(", "));
        }
    }
}

/// Execute the graph command
pub fn execute(args: GraphArgs, global: GlobalOptions) -> Result<()> {
    let root = resolve_root(&global)?;
    let config = load_config(&global, &root)?;

    let state = load_state(&config, &root, args.rescan, global.quiet)?;
    let base = load_base_corpus(&config, &root)?;
    let assembler = GraphAssembler::new(assembler_config(&config));

    let pb = spinner("Building asset graph...", global.quiet);
    let output = match assembler.assemble(&state, &state.everything, &base, &mut NoProgress) {
        Ok(output) => output,
        Err(e) => {
            finish_spinner_warn(pb, "Graph build failed");
            return Err(e).context("Failed to build asset graph");
        }
    };
    finish_spinner(
        pb,
        &format!(
            "Built graph: {} vertices, {} edges",
            output.graph.vertex_count(),
            output.graph.edge_count()
        ),
    );

    let summary = GraphSummary::from_output(&output);
    if args.summary {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let json = serde_json::to_string_pretty(&output.export())?;
    match args.output {
        Some(ref path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Graph written to {}", path.display());
            print_info(&format!("Graph written to {}", path.display()), global.quiet);
        }
        None => println!("{}", json),
    }

    if !global.quiet {
        summary.print();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quakegraph_core::{AssetGraph, EdgeData, Vertex};

    #[test]
    fn test_summary_counts() {
        let mut graph = AssetGraph::new();
        graph.get_or_add_vertex(Vertex::file("maps/a.bsp"));
        graph.get_or_add_vertex(Vertex::shader("textures/a/wall"));
        graph.get_or_add_vertex(Vertex::file("textures/a/wall.tga"));
        graph.add_edge("maps/a.bsp", "textures/a/wall", EdgeData::reference());
        graph.add_edge("textures/a/wall", "textures/a/wall.tga", EdgeData::reference());
        graph.add_edge("maps/a.bsp", "textures/a/wall.tga", EdgeData::pass_through());

        let output = BuildOutput {
            graph,
            not_found: vec!["textures/missing".to_string()],
            baseq3: Vec::new(),
            assumed_images: vec!["textures/a/wall".to_string()],
            unknown_types: vec![".xyz".to_string()],
        };
        let summary = GraphSummary::from_output(&output);
        assert_eq!(summary.vertices["file"], 2);
        assert_eq!(summary.vertices["shader"], 1);
        assert_eq!(summary.vertices["entity"], 0);
        assert_eq!(summary.edges.values().sum::<usize>(), 3);
        assert_eq!(summary.not_found, 1);
        assert_eq!(summary.assumed_images, 1);
    }
}
