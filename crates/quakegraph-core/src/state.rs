//! Game state snapshot.
//!
//! The per-kind reference maps and the file listing produced by one scan.
//! Persisted as JSON so repeated graph builds can skip re-scanning; the graph
//! itself is never stored and is rebuilt against the latest corpus.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::corpus::FileCorpus;
use crate::formats::ReferenceMap;

/// Snapshot format version; bumped on incompatible layout changes.
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// Default snapshot file name inside the state directory.
pub const SNAPSHOT_FILE: &str = "previous-graph.json";

#[derive(Error, Debug)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Snapshot {path:?} has schema version {found}, expected {expected}")]
    SchemaMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
}

/// Everything graph assembly needs, minus the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub schema_version: u32,
    pub root: PathBuf,
    pub corpus_fingerprint: String,
    /// cgame entity class name → asset references
    pub entities: ReferenceMap,
    /// map → entity references
    pub map_entities: ReferenceMap,
    /// map → shader lump names
    pub maps: ReferenceMap,
    /// model → surface shader names
    pub models: ReferenceMap,
    /// shader script → shader names it defines
    pub scripts: ReferenceMap,
    /// shader name → texture references
    pub shaders: ReferenceMap,
    /// skin → shader names
    pub skins: ReferenceMap,
    /// bytecode module → asset strings, wildcards expanded
    pub qvms: ReferenceMap,
    /// Full file listing
    pub everything: FileCorpus,
}

impl GameState {
    pub fn new(root: PathBuf, everything: FileCorpus) -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            root,
            corpus_fingerprint: everything.fingerprint(),
            everything,
            ..Default::default()
        }
    }

    /// Write the snapshot as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        info!("Game graph written to {:?}", path);
        Ok(())
    }

    /// Load a snapshot. A missing file is `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>, StateError> {
        match File::open(path) {
            Ok(file) => {
                let state: GameState = serde_json::from_reader(BufReader::new(file))?;
                if state.schema_version != STATE_SCHEMA_VERSION {
                    return Err(StateError::SchemaMismatch {
                        path: path.to_path_buf(),
                        found: state.schema_version,
                        expected: STATE_SCHEMA_VERSION,
                    });
                }
                info!(
                    "Loaded game state with {} files from {:?}",
                    state.everything.len(),
                    path
                );
                Ok(Some(state))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Snapshot not found: {:?}", path);
                Ok(None)
            }
            Err(e) => Err(StateError::Io(e)),
        }
    }

    /// Whether `corpus` differs from the listing this state was scanned from.
    pub fn is_stale(&self, corpus: &FileCorpus) -> bool {
        corpus.fingerprint() != self.corpus_fingerprint
    }

    /// Replace the file listing, keeping the reference maps.
    pub fn with_corpus(mut self, corpus: FileCorpus) -> Self {
        self.corpus_fingerprint = corpus.fingerprint();
        self.everything = corpus;
        self
    }

    /// Total number of source entries across all reference maps.
    pub fn source_count(&self) -> usize {
        [
            &self.entities,
            &self.map_entities,
            &self.maps,
            &self.models,
            &self.scripts,
            &self.skins,
            &self.qvms,
        ]
        .iter()
        .map(|m| m.len())
        .sum()
    }
}
