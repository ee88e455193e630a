//! File listings used as the resolution search space.
//!
//! [`FileCorpus`] is every file under the project root. [`BaseCorpus`] is an
//! optional listing of upstream content (a stock `baseq3` install) consulted
//! only to tell "missing" apart from "expected to come from elsewhere".

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Errors that can occur while reading or writing corpus listings.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base corpus directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),
}

/// Convert a path to the forward-slash form used in listings.
pub fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

// ============================================================================
// File Corpus
// ============================================================================

/// Every file under a project root.
///
/// Original-case paths are kept for display and IO; matching runs over the
/// parallel lower-cased list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FileCorpus {
    paths: Vec<String>,
    lower: Vec<String>,
    index: HashMap<String, usize>,
}

impl FileCorpus {
    pub fn new(paths: Vec<String>) -> Self {
        let paths: Vec<String> = paths.into_iter().map(|p| p.replace('\\', "/")).collect();
        let lower = paths.iter().map(|p| p.to_lowercase()).collect();
        let mut index = HashMap::with_capacity(paths.len());
        for (i, p) in paths.iter().enumerate() {
            index.entry(p.clone()).or_insert(i);
        }
        Self {
            paths,
            lower,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Original-case paths.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Lower-cased paths, parallel to [`FileCorpus::paths`].
    pub fn lower(&self) -> &[String] {
        &self.lower
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.paths.get(index).map(String::as_str)
    }

    /// Index of an exact (original-case) path.
    pub fn position(&self, path: &str) -> Option<usize> {
        self.index.get(path).copied()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Indices of every entry whose lower-cased path contains `needle`.
    pub fn search(&self, needle: &str) -> Vec<usize> {
        self.lower
            .iter()
            .enumerate()
            .filter(|(_, p)| p.contains(needle))
            .map(|(i, _)| i)
            .collect()
    }

    /// SHA-256 over the sorted listing.
    pub fn fingerprint(&self) -> String {
        let mut sorted: Vec<&String> = self.paths.iter().collect();
        sorted.sort();
        let mut hasher = Sha256::new();
        for p in sorted {
            hasher.update(p.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

impl From<Vec<String>> for FileCorpus {
    fn from(paths: Vec<String>) -> Self {
        Self::new(paths)
    }
}

impl From<FileCorpus> for Vec<String> {
    fn from(corpus: FileCorpus) -> Self {
        corpus.paths
    }
}

// ============================================================================
// Base Corpus
// ============================================================================

/// Lower-cased listing of upstream content paths. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseCorpus {
    paths: Vec<String>,
}

impl BaseCorpus {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut paths: Vec<String> = paths
            .into_iter()
            .map(|p| p.as_ref().replace('\\', "/").to_lowercase())
            .collect();
        paths.sort();
        paths.dedup();
        Self { paths }
    }

    /// Walk `dir` and list every file under it.
    pub fn from_directory(dir: &Path) -> Result<Self, CorpusError> {
        if !dir.is_dir() {
            return Err(CorpusError::DirectoryNotFound(dir.to_path_buf()));
        }
        let mut paths = Vec::new();
        for entry in WalkDir::new(dir).follow_links(true) {
            match entry {
                Ok(e) if e.file_type().is_file() => paths.push(slash_path(e.path())),
                Ok(_) => {}
                Err(e) => warn!("Skipping base corpus entry: {}", e),
            }
        }
        let corpus = Self::from_paths(paths);
        info!("Base corpus: {} files under {:?}", corpus.len(), dir);
        Ok(corpus)
    }

    /// Load a JSON file list. A missing file yields an empty corpus.
    pub fn load_filelist(path: &Path) -> Result<Self, CorpusError> {
        match File::open(path) {
            Ok(file) => {
                let paths: Vec<String> = serde_json::from_reader(BufReader::new(file))?;
                let corpus = Self::from_paths(paths);
                debug!("Loaded {} base corpus paths from {:?}", corpus.len(), path);
                Ok(corpus)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Base corpus file list not found: {:?}", path);
                Ok(Self::empty())
            }
            Err(e) => Err(CorpusError::Io(e)),
        }
    }

    /// Write the listing as a pretty JSON array.
    pub fn save_filelist(&self, path: &Path) -> Result<(), CorpusError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, &self.paths)?;
        info!("Saved {} base corpus paths to {:?}", self.len(), path);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Whether any entry contains the lower-cased `needle`.
    pub fn contains_substring(&self, needle: &str) -> bool {
        self.paths.iter().any(|p| p.contains(needle))
    }
}
