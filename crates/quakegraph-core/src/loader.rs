//! Game Loader
//!
//! Runs the scan and every extraction pass in order and folds the results into
//! a [`GameState`]. Files within one pass are parsed on rayon's pool; results
//! are collected in input order so the state does not depend on scheduling.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::corpus::slash_path;
use crate::disassembler::{Disassembler, LiteralTableDisassembler};
use crate::discovery::{ensure_disassembly, DiscoveredProject, ProjectScanner, ScanError};
use crate::formats::{
    disassembly_path, expand_wildcards, extract_string_constants, group_entity_assets,
    AssetKind, AssetRecord, ReferenceMap,
};
use crate::progress::{steps, ProgressSink, ProgressStep};
use crate::state::{GameState, StateError};

/// File stem of the client game module whose strings describe entities.
pub const CGAME_MODULE: &str = "cgame";

/// Step number of the first per-module wildcard search.
const FIRST_MODULE_STEP: usize = 8;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("Failed to persist snapshot: {0}")]
    State(#[from] StateError),
}

/// Counts gathered while loading, for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub maps: usize,
    pub models: usize,
    pub models_with_skins: usize,
    pub scripts: usize,
    pub skins: usize,
    pub modules: usize,
    pub disassembled: usize,
    /// Files that failed to parse
    pub failed: usize,
}

/// Scans a project and extracts every reference map.
pub struct GameLoader {
    scanner: ProjectScanner,
    disassembler: Box<dyn Disassembler>,
    snapshot_path: Option<PathBuf>,
    stats: LoadStats,
}

impl Default for GameLoader {
    fn default() -> Self {
        Self::new(ProjectScanner::default())
    }
}

impl GameLoader {
    pub fn new(scanner: ProjectScanner) -> Self {
        Self {
            scanner,
            disassembler: Box::new(LiteralTableDisassembler),
            snapshot_path: None,
            stats: LoadStats::default(),
        }
    }

    pub fn with_disassembler(mut self, disassembler: Box<dyn Disassembler>) -> Self {
        self.disassembler = disassembler;
        self
    }

    /// Persist the state here after every full load.
    pub fn with_snapshot_path(mut self, path: PathBuf) -> Self {
        self.snapshot_path = Some(path);
        self
    }

    /// Counts from the most recent [`GameLoader::load_game`].
    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    pub fn load_game(
        &mut self,
        root: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<GameState, LoadError> {
        let total = steps::COUNT;
        self.stats = LoadStats::default();

        progress.report(&[ProgressStep::pipeline(0, total, steps::FILES)]);
        let project = self.scanner.scan(root)?;
        let mut state = GameState::new(project.root.clone(), project.corpus.clone());

        progress.report(&[ProgressStep::pipeline(1, total, steps::MAPS)]);
        for record in self.load_records(&project, AssetKind::Map) {
            if let AssetRecord::Map { path, map } = &record {
                let key = slash_path(path);
                state.map_entities.insert(key.clone(), record.references());
                state.maps.insert(key, map.shader_names());
                self.stats.maps += 1;
            }
        }
        info!("Found {} maps", self.stats.maps);

        progress.report(&[ProgressStep::pipeline(2, total, steps::MODELS)]);
        for record in self.load_records(&project, AssetKind::Model) {
            if let AssetRecord::Model { path, model } = &record {
                state.models.insert(slash_path(path), model.shader_names());
                self.stats.models += 1;
                if model.has_skins() {
                    self.stats.models_with_skins += 1;
                }
            }
        }
        info!(
            "Found {} models, {} with skins",
            self.stats.models, self.stats.models_with_skins
        );

        progress.report(&[ProgressStep::pipeline(3, total, steps::SHADERS)]);
        for record in self.load_records(&project, AssetKind::ShaderScript) {
            if let AssetRecord::ShaderScript { path, script } = &record {
                state.scripts.insert(slash_path(path), script.shader_names());
                for (name, textures) in script.texture_map() {
                    merge_sorted(state.shaders.entry(name).or_default(), textures);
                }
                self.stats.scripts += 1;
            }
        }
        info!(
            "Found {} shader scripts defining {} shaders",
            self.stats.scripts,
            state.shaders.len()
        );

        progress.report(&[ProgressStep::pipeline(4, total, steps::SKINS)]);
        for record in self.load_records(&project, AssetKind::Skin) {
            if let AssetRecord::Skin { path, skin } = &record {
                state.skins.insert(slash_path(path), skin.shader_names());
                self.stats.skins += 1;
            }
        }
        info!("Found {} skins", self.stats.skins);

        let qvm_step = ProgressStep::pipeline(5, total, steps::QVMS);
        progress.report(std::slice::from_ref(&qvm_step));
        let report = ensure_disassembly(
            project.modules(),
            self.disassembler.as_ref(),
            progress,
            &qvm_step,
        );
        self.stats.disassembled = report.created.len();
        if !report.created.is_empty() {
            // new artifacts belong in the listing the snapshot is compared against
            let corpus = self.scanner.scan(&project.root)?.corpus;
            state = state.with_corpus(corpus);
        }

        progress.report(&[ProgressStep::pipeline(6, total, steps::QVMS)]);
        let mut module_strings: Vec<(String, Vec<String>)> = Vec::new();
        for record in self.load_records(&project, AssetKind::BytecodeModule) {
            if let AssetRecord::BytecodeModule { path, strings } = record {
                module_strings.push((slash_path(&path), strings));
                self.stats.modules += 1;
            }
        }

        progress.report(&[ProgressStep::pipeline(7, total, steps::ENTITIES)]);
        state.entities = load_entities(project.modules());
        info!("Found {} game entities", state.entities.len());

        let grown_total = total + module_strings.len();
        for (i, (module, strings)) in module_strings.into_iter().enumerate() {
            let name = Path::new(&module)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            progress.report(&[ProgressStep::pipeline(
                FIRST_MODULE_STEP + i,
                grown_total,
                format!("Searching for QVM files {} from {} strings", name, strings.len()),
            )]);
            let expanded = expand_wildcards(&strings, state.everything.paths());
            debug!("{}: {} references after wildcard expansion", module, expanded.len());
            state.qvms.insert(module, expanded);
        }

        if self.stats.failed > 0 {
            warn!("{} files could not be parsed", self.stats.failed);
        }
        if let Some(path) = &self.snapshot_path {
            state.save(path)?;
        }
        Ok(state)
    }

    /// Parse every file of `kind` in parallel. Failures are logged and counted.
    fn load_records(&mut self, project: &DiscoveredProject, kind: AssetKind) -> Vec<AssetRecord> {
        let results: Vec<_> = project
            .files_of(kind)
            .par_iter()
            .map(|path| (path, AssetRecord::load(kind, path)))
            .collect();

        let mut records = Vec::with_capacity(results.len());
        for (path, result) in results {
            match result {
                Ok(record) => {
                    debug!("Parsed {} {:?}", kind, path);
                    records.push(record);
                }
                Err(e) => {
                    warn!("Skipping {} {:?}: {}", kind, path, e);
                    self.stats.failed += 1;
                }
            }
        }
        records
    }
}

/// Entity groups from the `cgame` module's disassembly, if there is one.
fn load_entities(modules: &[PathBuf]) -> ReferenceMap {
    let Some(cgame) = modules.iter().find(|m| {
        m.file_stem()
            .map(|s| s.to_string_lossy().eq_ignore_ascii_case(CGAME_MODULE))
            .unwrap_or(false)
    }) else {
        return BTreeMap::new();
    };
    match std::fs::read(disassembly_path(cgame)) {
        Ok(bytes) => {
            let constants = extract_string_constants(&String::from_utf8_lossy(&bytes));
            group_entity_assets(&constants)
        }
        Err(e) => {
            warn!("No disassembly for {:?}: {}", cgame, e);
            BTreeMap::new()
        }
    }
}

/// Merge `extra` into a sorted, deduplicated list.
fn merge_sorted(list: &mut Vec<String>, extra: Vec<String>) {
    list.extend(extra);
    list.sort();
    list.dedup();
}
