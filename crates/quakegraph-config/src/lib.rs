//! QuakeGraph Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.quakegraph/config.toml`
//! - Local config: `.quakegraph/config.toml` (in the game root)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default state directory, relative to the game root.
pub const DEFAULT_STATE_DIR: &str = ".quakegraph";

/// Default snapshot file name inside the state directory.
pub const DEFAULT_SNAPSHOT_FILE: &str = "previous-graph.json";

/// Log levels accepted in `logging.level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration for QuakeGraph.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QuakeGraphConfig {
    /// Where snapshots are kept
    pub storage: StorageConfig,

    /// Project scanning
    pub scan: ScanSettings,

    /// Reference resolution
    pub resolve: ResolveSettings,

    /// Graph assembly
    pub graph: GraphSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Storage configuration for snapshot data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for QuakeGraph data (default: `.quakegraph`)
    pub state_dir: PathBuf,

    /// Snapshot file name inside `state_dir`
    pub snapshot_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            snapshot_file: DEFAULT_SNAPSHOT_FILE.to_string(),
        }
    }
}

/// Project scanning configuration.
///
/// # Example TOML
///
/// ```toml
/// [scan]
/// exclude_patterns = ["**/demos/**"]
///
/// [scan.disassembler]
/// program = "q3vmdis"
/// args = ["--strings", "{input}"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScanSettings {
    /// Glob patterns, relative to the root, left out of the corpus
    pub exclude_patterns: Vec<String>,

    /// Descend into hidden files and directories; `.git` and `.quakegraph`
    /// stay out through the default excludes
    pub include_hidden: bool,

    /// Follow symbolic links while walking
    pub follow_links: bool,

    /// External disassembler; the built-in literal dump is used when unset
    pub disassembler: Option<DisassemblerSettings>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            exclude_patterns: vec!["**/.git/**".to_string(), "**/.quakegraph/**".to_string()],
            include_hidden: true,
            follow_links: true,
            disassembler: None,
        }
    }
}

/// External disassembler command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct DisassemblerSettings {
    pub program: String,

    /// Arguments; `{input}` is replaced by the module path, which is appended
    /// when no argument contains it
    pub args: Vec<String>,
}

/// Reference resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResolveSettings {
    /// Directory holding the base game content
    pub base_corpus_dir: Option<PathBuf>,

    /// JSON file list of the base game content
    pub base_filelist: Option<PathBuf>,

    /// Abort on ambiguous references instead of reporting them as not found
    pub strict_ambiguity: bool,
}

impl Default for ResolveSettings {
    fn default() -> Self {
        Self {
            base_corpus_dir: None,
            base_filelist: None,
            strict_ambiguity: true,
        }
    }
}

/// Graph assembly configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct GraphSettings {
    pub pass_through: PassThroughMode,
}

/// How far shader pass-through expansion is carried.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PassThroughMode {
    /// Expand each edge once when it is added
    SinglePass,
    /// Expand until the graph stops growing (default)
    #[default]
    FixedPoint,
}

impl std::fmt::Display for PassThroughMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SinglePass => write!(f, "single-pass"),
            Self::FixedPoint => write!(f, "fixed-point"),
        }
    }
}

impl std::str::FromStr for PassThroughMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single-pass" | "single_pass" | "single" => Ok(Self::SinglePass),
            "fixed-point" | "fixed_point" | "fixed" => Ok(Self::FixedPoint),
            _ => Err(ConfigError::invalid_value(
                "graph.pass_through",
                format!("unknown mode '{}'. Valid values: single-pass, fixed-point", s),
            )),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override state directory
    pub state_dir: Option<PathBuf>,

    /// Override base corpus directory
    pub base_corpus_dir: Option<PathBuf>,

    /// Override base corpus file list
    pub base_filelist: Option<PathBuf>,

    /// Override ambiguity handling
    pub strict_ambiguity: Option<bool>,

    /// Override pass-through expansion
    pub pass_through: Option<PassThroughMode>,

    /// Override log level
    pub log_level: Option<String>,
}

impl QuakeGraphConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref dir) = overrides.state_dir {
            self.storage.state_dir = dir.clone();
        }

        if let Some(ref dir) = overrides.base_corpus_dir {
            self.resolve.base_corpus_dir = Some(dir.clone());
        }

        if let Some(ref list) = overrides.base_filelist {
            self.resolve.base_filelist = Some(list.clone());
        }

        if let Some(strict) = overrides.strict_ambiguity {
            self.resolve.strict_ambiguity = strict;
        }

        if let Some(mode) = overrides.pass_through {
            self.graph.pass_through = mode;
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!("unknown level '{}'", self.logging.level),
            ));
        }
        if self.storage.snapshot_file.is_empty() {
            return Err(ConfigError::Inconsistent(
                "storage.snapshot_file must not be empty".to_string(),
            ));
        }
        if let Some(ref d) = self.scan.disassembler {
            if d.program.is_empty() {
                return Err(ConfigError::Inconsistent(
                    "scan.disassembler is set but scan.disassembler.program is empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Get the effective state directory for a game root.
    pub fn state_dir(&self, root: &Path) -> PathBuf {
        if self.storage.state_dir.is_absolute() {
            self.storage.state_dir.clone()
        } else {
            root.join(&self.storage.state_dir)
        }
    }

    /// Get the snapshot file path for a game root.
    pub fn snapshot_path(&self, root: &Path) -> PathBuf {
        self.state_dir(root).join(&self.storage.snapshot_file)
    }

    /// Resolve a configured base corpus path against the game root.
    pub fn base_path(&self, root: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }
}
