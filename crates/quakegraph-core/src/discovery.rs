//! Project Scanner
//!
//! Enumerates every file under a project root, classifies the ones that carry
//! references by extension, and makes sure each bytecode module has a
//! disassembly artifact beside it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::corpus::{slash_path, FileCorpus};
use crate::disassembler::Disassembler;
use crate::formats::{disassembly_path, AssetKind};
use crate::progress::{steps, ProgressSink, ProgressStep, PHASE_SUBSTEP};

/// Errors during project scanning
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Project root does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Configuration for the project scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Glob patterns, relative to the root, to leave out of the corpus
    pub exclude_patterns: Vec<String>,
    /// Whether to descend into hidden files and directories; the state and
    /// VCS directories stay out through `exclude_patterns` either way
    pub include_hidden: bool,
    pub follow_links: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: vec!["**/.git/**".to_string(), "**/.quakegraph/**".to_string()],
            include_hidden: true,
            follow_links: true,
        }
    }
}

/// Result of scanning a project root.
#[derive(Debug, Clone)]
pub struct DiscoveredProject {
    /// Canonical project root
    pub root: PathBuf,
    /// Every file under the root
    pub corpus: FileCorpus,
    /// Reference-bearing files grouped by kind, sorted
    pub files: BTreeMap<AssetKind, Vec<PathBuf>>,
}

impl DiscoveredProject {
    pub fn files_of(&self, kind: AssetKind) -> &[PathBuf] {
        self.files.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn modules(&self) -> &[PathBuf] {
        self.files_of(AssetKind::BytecodeModule)
    }
}

/// Outcome of [`ensure_disassembly`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisassemblyReport {
    /// Artifacts written during this call
    pub created: Vec<PathBuf>,
    /// Modules whose artifact already existed
    pub existing: usize,
    /// Modules whose disassembly failed, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

/// Project scanner service
#[derive(Debug, Clone, Default)]
pub struct ProjectScanner {
    config: ScanConfig,
}

impl ProjectScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.exclude_patterns.extend(patterns);
        self
    }

    /// Walk `root` and classify every file.
    pub fn scan(&self, root: &Path) -> Result<DiscoveredProject> {
        let root = root
            .canonicalize()
            .map_err(|_| ScanError::RootNotFound(root.to_path_buf()))?;
        if !root.is_dir() {
            return Err(ScanError::RootNotFound(root));
        }
        info!("Scanning project files under {:?}", root);

        let glob_set = self.build_exclude_glob_set();
        let include_hidden = self.config.include_hidden;
        let mut paths: Vec<PathBuf> = Vec::new();

        for entry in WalkDir::new(&root)
            .follow_links(self.config.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                // Always traverse the root, even when it is a hidden temp dir
                e.depth() == 0 || include_hidden || !e.file_name().to_string_lossy().starts_with('.')
            })
        {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Error walking directory: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let rel_path = path.strip_prefix(&root).unwrap_or(path);
            if glob_set.is_match(rel_path) {
                debug!("Skipping excluded file: {:?}", rel_path);
                continue;
            }
            paths.push(path.to_path_buf());
        }
        paths.sort();

        let mut files: BTreeMap<AssetKind, Vec<PathBuf>> = BTreeMap::new();
        for path in &paths {
            if let Some(kind) = AssetKind::from_path(path) {
                files.entry(kind).or_default().push(path.clone());
            }
        }

        let corpus = FileCorpus::new(paths.iter().map(|p| slash_path(p)).collect());
        info!(
            "Found {} files ({} maps, {} models, {} shader scripts, {} skins, {} modules)",
            corpus.len(),
            files.get(&AssetKind::Map).map_or(0, Vec::len),
            files.get(&AssetKind::Model).map_or(0, Vec::len),
            files.get(&AssetKind::ShaderScript).map_or(0, Vec::len),
            files.get(&AssetKind::Skin).map_or(0, Vec::len),
            files.get(&AssetKind::BytecodeModule).map_or(0, Vec::len),
        );

        Ok(DiscoveredProject {
            root,
            corpus,
            files,
        })
    }

    /// Build a glob set from exclude patterns.
    fn build_exclude_glob_set(&self) -> GlobSet {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.config.exclude_patterns {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => warn!("Ignoring invalid exclude pattern {:?}: {}", pattern, e),
            }
        }
        builder.build().unwrap_or_else(|_| GlobSet::empty())
    }
}

/// Make sure every module has a `.dis` artifact beside it.
///
/// The disassembler runs once per missing artifact; existing artifacts are
/// left alone. A failing module is logged and recorded, the rest continue.
pub fn ensure_disassembly(
    modules: &[PathBuf],
    disassembler: &dyn Disassembler,
    progress: &mut dyn ProgressSink,
    pipeline_step: &ProgressStep,
) -> DisassemblyReport {
    let mut report = DisassemblyReport::default();
    let missing: Vec<&PathBuf> = modules
        .iter()
        .filter(|m| {
            let exists = disassembly_path(m).exists();
            if exists {
                report.existing += 1;
            }
            !exists
        })
        .collect();

    for (i, module) in missing.iter().enumerate() {
        let name = module
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        progress.report(&[
            ProgressStep::new(
                pipeline_step.phase,
                pipeline_step.current,
                pipeline_step.total,
                steps::DISASSEMBLE,
            ),
            ProgressStep::new(PHASE_SUBSTEP, Some(i), missing.len(), name),
        ]);

        let artifact = disassembly_path(module);
        let result = disassembler
            .disassemble(module)
            .map_err(|e| e.to_string())
            .and_then(|text| std::fs::write(&artifact, text).map_err(|e| e.to_string()));
        match result {
            Ok(()) => {
                debug!("Wrote disassembly {:?}", artifact);
                report.created.push(artifact);
            }
            Err(reason) => {
                warn!("Failed to disassemble {:?}: {}", module, reason);
                report.failed.push(((*module).clone(), reason));
            }
        }
    }

    if !report.created.is_empty() || !report.failed.is_empty() {
        info!(
            "Disassembled {} modules ({} already present, {} failed)",
            report.created.len(),
            report.existing,
            report.failed.len()
        );
    }
    report
}
