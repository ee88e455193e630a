//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.quakegraph/config.toml`
//! 2. Local config: `.quakegraph/config.toml` (in the game root)
//! 3. CLI overrides
//!
//! Later sources override earlier ones.

use crate::error::ConfigError;
use crate::{
    ConfigOverrides, GraphSettings, LoggingConfig, QuakeGraphConfig, ResolveSettings,
    ScanSettings, StorageConfig, DEFAULT_SNAPSHOT_FILE, DEFAULT_STATE_DIR,
};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration directory name.
const GLOBAL_CONFIG_DIR: &str = ".quakegraph";

/// Local configuration directory name.
const LOCAL_CONFIG_DIR: &str = ".quakegraph";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.quakegraph`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<QuakeGraphConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.quakegraph`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_DIR));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path for a game root.
    pub fn local_config_path(&self, root: &Path) -> PathBuf {
        root.join(LOCAL_CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a game root with optional CLI overrides.
    ///
    /// Merges config in order: global → local → overrides.
    pub fn load(
        &mut self,
        root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<QuakeGraphConfig, ConfigError> {
        let mut config = QuakeGraphConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = self.load_local(root)? {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load global config, then an explicit config file in place of the
    /// local one.
    pub fn load_file(
        &mut self,
        path: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<QuakeGraphConfig, ConfigError> {
        let mut config = QuakeGraphConfig::default();
        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }
        debug!("Loading config from {:?}", path);
        config = merge_configs(config, load_config_file(path)?);
        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }
        config.validate()?;
        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<QuakeGraphConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path)?;
        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration for a game root.
    pub fn load_local(&self, root: &Path) -> Result<Option<QuakeGraphConfig>, ConfigError> {
        let local_path = self.local_config_path(root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }

    /// Save configuration to the global config file.
    pub fn save_global(&self, config: &QuakeGraphConfig) -> Result<(), ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        save_config_file(&global_dir.join(CONFIG_FILE_NAME), config)
    }

    /// Save configuration to the local config file for a game root.
    pub fn save_local(&self, root: &Path, config: &QuakeGraphConfig) -> Result<(), ConfigError> {
        save_config_file(&self.local_config_path(root), config)
    }

    /// Create `.quakegraph/config.toml` with default configuration.
    pub fn init_local(&self, root: &Path) -> Result<PathBuf, ConfigError> {
        let config_path = self.local_config_path(root);
        if !config_path.exists() {
            save_config_file(&config_path, &QuakeGraphConfig::default())?;
        }
        Ok(config_path)
    }

    /// Forces reload on next `load_global()` call.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

fn load_config_file(path: &Path) -> Result<QuakeGraphConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

fn save_config_file(path: &Path, config: &QuakeGraphConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// This performs a field-by-field merge, allowing partial configs.
fn merge_configs(base: QuakeGraphConfig, overlay: QuakeGraphConfig) -> QuakeGraphConfig {
    QuakeGraphConfig {
        storage: merge_storage(base.storage, overlay.storage),
        scan: merge_scan(base.scan, overlay.scan),
        resolve: merge_resolve(base.resolve, overlay.resolve),
        graph: merge_graph(base.graph, overlay.graph),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

fn merge_storage(base: StorageConfig, overlay: StorageConfig) -> StorageConfig {
    StorageConfig {
        state_dir: if overlay.state_dir != Path::new(DEFAULT_STATE_DIR) {
            overlay.state_dir
        } else {
            base.state_dir
        },
        snapshot_file: if overlay.snapshot_file != DEFAULT_SNAPSHOT_FILE {
            overlay.snapshot_file
        } else {
            base.snapshot_file
        },
    }
}

fn merge_scan(base: ScanSettings, overlay: ScanSettings) -> ScanSettings {
    ScanSettings {
        // Overlay patterns extend base patterns
        exclude_patterns: {
            let mut patterns = base.exclude_patterns;
            for pattern in overlay.exclude_patterns {
                if !patterns.contains(&pattern) {
                    patterns.push(pattern);
                }
            }
            patterns
        },
        include_hidden: overlay.include_hidden && base.include_hidden,
        follow_links: overlay.follow_links && base.follow_links,
        disassembler: overlay.disassembler.or(base.disassembler),
    }
}

fn merge_resolve(base: ResolveSettings, overlay: ResolveSettings) -> ResolveSettings {
    ResolveSettings {
        base_corpus_dir: overlay.base_corpus_dir.or(base.base_corpus_dir),
        base_filelist: overlay.base_filelist.or(base.base_filelist),
        strict_ambiguity: overlay.strict_ambiguity && base.strict_ambiguity,
    }
}

fn merge_graph(base: GraphSettings, overlay: GraphSettings) -> GraphSettings {
    if overlay != GraphSettings::default() {
        overlay
    } else {
        base
    }
}

fn merge_logging(base: LoggingConfig, overlay: LoggingConfig) -> LoggingConfig {
    LoggingConfig {
        level: if overlay.level != "info" {
            overlay.level
        } else {
            base.level
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PassThroughMode;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn create_local_config(content: &str, root: &Path) -> PathBuf {
        let config_dir = root.join(".quakegraph");
        std::fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn create_global_config(content: &str, global_dir: &Path) {
        std::fs::create_dir_all(global_dir).unwrap();
        std::fs::write(global_dir.join("config.toml"), content).unwrap();
    }

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.storage.state_dir, PathBuf::from(".quakegraph"));
        assert!(config.resolve.strict_ambiguity);
    }

    #[test]
    fn test_load_local_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        create_local_config(
            r#"
            [scan]
            exclude_patterns = ["**/demos/**"]

            [scan.disassembler]
            program = "q3vmdis"

            [graph]
            pass_through = "single-pass"
            "#,
            temp.path(),
        );

        let config = loader.load(temp.path(), None).unwrap();

        assert!(config
            .scan
            .exclude_patterns
            .contains(&"**/demos/**".to_string()));
        assert!(config
            .scan
            .exclude_patterns
            .contains(&"**/.git/**".to_string()));
        assert_eq!(
            config.scan.disassembler.map(|d| d.program),
            Some("q3vmdis".to_string())
        );
        assert_eq!(config.graph.pass_through, PassThroughMode::SinglePass);
    }

    #[test]
    fn test_local_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");

        create_global_config(
            r#"
            [logging]
            level = "debug"

            [resolve]
            base_filelist = "/global/baseq3.json"
            "#,
            &global_dir,
        );
        create_local_config(
            r#"
            [resolve]
            base_filelist = "local-baseq3.json"
            strict_ambiguity = false
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(
            config.resolve.base_filelist,
            Some(PathBuf::from("local-baseq3.json"))
        );
        assert!(!config.resolve.strict_ambiguity);
        // Global value should be preserved (since local doesn't override)
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_local_can_skip_hidden_files() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config = loader.load(temp.path(), None).unwrap();
        assert!(config.scan.include_hidden);

        create_local_config(
            r#"
            [scan]
            include_hidden = false
            "#,
            temp.path(),
        );
        let config = loader.load(temp.path(), None).unwrap();
        assert!(!config.scan.include_hidden);
    }

    #[test]
    fn test_cli_overrides_all() {
        let temp = TempDir::new().unwrap();
        create_local_config(
            r#"
            [storage]
            state_dir = ".local-state"
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let overrides = ConfigOverrides {
            state_dir: Some(PathBuf::from("/cli/state")),
            log_level: Some("trace".to_string()),
            ..Default::default()
        };

        let config = loader.load(temp.path(), Some(&overrides)).unwrap();

        assert_eq!(config.storage.state_dir, PathBuf::from("/cli/state"));
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_invalid_toml_names_file() {
        let temp = TempDir::new().unwrap();
        let path = create_local_config("[graph\npass_through = ", temp.path());
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let err = loader.load(temp.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    #[test]
    fn test_load_file_replaces_local() {
        let temp = TempDir::new().unwrap();
        create_local_config("[logging]\nlevel = \"warn\"\n", temp.path());
        let explicit = temp.path().join("other.toml");
        std::fs::write(&explicit, "[logging]\nlevel = \"error\"\n").unwrap();

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let config = loader.load_file(&explicit, None).unwrap();
        assert_eq!(config.logging.level, "error");
    }

    #[test]
    fn test_save_and_init() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let path = loader.init_local(temp.path()).unwrap();
        assert!(path.ends_with(".quakegraph/config.toml"));
        let _: QuakeGraphConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        let mut config = QuakeGraphConfig::default();
        config.logging.level = "warn".to_string();
        loader.save_local(temp.path(), &config).unwrap();

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        assert_eq!(loader.load(temp.path(), None).unwrap().logging.level, "warn");
    }

    #[test]
    fn test_cache_clearing() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");
        create_global_config("[logging]\nlevel = \"debug\"\n", &global_dir);

        let mut loader = ConfigLoader::with_global_dir(&global_dir);
        let _ = loader.load_global().unwrap();
        assert!(loader.global_config.is_some());

        loader.clear_cache();
        assert!(loader.global_config.is_none());
    }
}
