//! Resolve command - Show how individual references bind to game files

use anyhow::{Context, Result};
use clap::Args;
use quakegraph_core::{normalize_reference, ResolutionResult, ResolveError, Resolver};
use serde::Serialize;

use super::{build_scanner, load_base_corpus, load_config, resolve_root};
use crate::GlobalOptions;

/// Arguments for the resolve command
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// References as they appear in game content
    #[arg(required = true)]
    references: Vec<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

/// One reference and where it went.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveReport {
    pub reference: String,
    pub normalized: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assumed_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,
}

impl ResolveReport {
    fn new(reference: &str, outcome: Result<ResolutionResult, ResolveError>) -> Self {
        let mut report = ResolveReport {
            reference: reference.to_string(),
            normalized: normalize_reference(reference),
            status: "",
            path: None,
            assumed_group: None,
            error: None,
            candidates: Vec::new(),
        };
        match outcome {
            Ok(ResolutionResult::Resolved(m)) => {
                report.status = "resolved";
                report.path = Some(m.path);
                report.assumed_group = m.assumed_group.map(|g| g.to_string());
            }
            Ok(ResolutionResult::NotFound) => report.status = "not-found",
            Ok(ResolutionResult::FoundInBaseCorpus) => report.status = "base-game",
            Err(e) => {
                report.status = match e {
                    ResolveError::EmptyReference => "empty",
                    ResolveError::UnknownType { .. } => "unknown-type",
                    ResolveError::Ambiguous { .. } => "ambiguous",
                };
                if let ResolveError::Ambiguous { ref candidates, .. } = e {
                    report.candidates = candidates.clone();
                }
                report.error = Some(e.to_string());
            }
        }
        report
    }

    fn print(&self) {
        match self.status {
            "resolved" => {
                let path = self.path.as_deref().unwrap_or_default();
                match self.assumed_group {
                    Some(ref group) => {
                        println!("{} -> {} (assumed {})", self.reference, path, group)
                    }
                    None => println!("{} -> {}", self.reference, path),
                }
            }
            "not-found" => println!("{} -> not found", self.reference),
            "base-game" => println!("{} -> base game", self.reference),
            _ => {
                println!(
                    "{} -> error: {}",
                    self.reference,
                    self.error.as_deref().unwrap_or_default()
                );
                for candidate in &self.candidates {
                    println!("    {}", candidate);
                }
            }
        }
    }
}

/// Execute the resolve command
pub fn execute(args: ResolveArgs, global: GlobalOptions) -> Result<()> {
    let root = resolve_root(&global)?;
    let config = load_config(&global, &root)?;

    let corpus = build_scanner(&config)
        .scan(&root)
        .context("Failed to list game files")?
        .corpus;
    let base = load_base_corpus(&config, &root)?;
    let resolver = Resolver::new(&corpus, &base).with_strict(config.resolve.strict_ambiguity);

    let reports: Vec<ResolveReport> = args
        .references
        .iter()
        .map(|reference| ResolveReport::new(reference, resolver.resolve(reference)))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            report.print();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quakegraph_core::{BaseCorpus, FileCorpus};

    #[test]
    fn test_reports_cover_each_outcome() {
        let corpus = FileCorpus::new(vec![
            "/textures/wall.tga".to_string(),
            "/textures/wall.wav".to_string(),
            "/textures/a/floor.jpg".to_string(),
            "/textures/b/floor.jpg".to_string(),
            "/docs/notes.txt".to_string(),
            "/docs/old/notes.txt".to_string(),
        ]);
        let base = BaseCorpus::from_paths(["/baseq3/sound/wind.wav"]);
        let resolver = Resolver::new(&corpus, &base);

        let report = ResolveReport::new("textures/wall", resolver.resolve("textures/wall"));
        assert_eq!(report.status, "resolved");
        assert_eq!(report.path.as_deref(), Some("/textures/wall.tga"));
        assert_eq!(report.assumed_group.as_deref(), Some("image"));

        let report = ResolveReport::new("sound/wind.wav", resolver.resolve("sound/wind.wav"));
        assert_eq!(report.status, "base-game");

        let report = ResolveReport::new("floor.jpg", resolver.resolve("floor.jpg"));
        assert_eq!(report.status, "ambiguous");
        assert_eq!(report.candidates.len(), 2);

        let report = ResolveReport::new("notes.xyz", resolver.resolve("notes.xyz"));
        assert_eq!(report.status, "unknown-type");
    }
}
