//! Config command - View and manage configuration
//!
//! Values come from three layers: built-in defaults, the global
//! `~/.quakegraph/config.toml` and the game's `.quakegraph/config.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use quakegraph_config::{ConfigLoader, QuakeGraphConfig};
use serde::Serialize;
use serde_json::Value;

use super::resolve_root;
use crate::GlobalOptions;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// List all configuration values with their sources
    List(ListArgs),

    /// Get a specific configuration value
    Get(GetArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Show configuration file paths
    Path(PathArgs),

    /// Write a default local config file if none exists
    Init,
}

/// Arguments for the list command
#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Show only effective values (hide sources)
    #[arg(long)]
    effective: bool,
}

/// Arguments for the get command
#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// Configuration key (e.g., "resolve.strict_ambiguity")
    key: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the set command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (e.g., "graph.pass_through")
    key: String,

    /// Value to set
    value: String,

    /// Set in global config (~/.quakegraph/config.toml) instead of local
    #[arg(long)]
    global: bool,
}

/// Arguments for the path command
#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Configuration value with source information
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue {
    pub key: String,
    pub value: Value,
    /// default, global or local
    pub source: &'static str,
}

/// Configuration paths
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPaths {
    pub global: Option<PathBuf>,
    pub local: PathBuf,
    pub global_exists: bool,
    pub local_exists: bool,
}

/// Execute the config command
pub fn execute(cmd: ConfigCommand, global: GlobalOptions) -> Result<()> {
    let root = resolve_root(&global)?;
    match cmd {
        ConfigCommand::List(args) => execute_list(args, &root),
        ConfigCommand::Get(args) => execute_get(args, &root),
        ConfigCommand::Set(args) => execute_set(args, &root),
        ConfigCommand::Path(args) => execute_path(args, &root),
        ConfigCommand::Init => execute_init(&root, global.quiet),
    }
}

fn execute_list(args: ListArgs, root: &Path) -> Result<()> {
    let mut loader = ConfigLoader::new();

    let global_config = loader.load_global()?.unwrap_or_default();
    let local_config = loader.load_local(root)?.unwrap_or_default();
    let effective = loader.load(root, None)?;

    if args.effective {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&effective)?);
        } else {
            print!("{}", toml::to_string_pretty(&effective)?);
        }
        return Ok(());
    }

    let values = collect_config_values(&QuakeGraphConfig::default(), &global_config, &local_config)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(());
    }

    if let Some(gp) = loader.global_config_path() {
        println!("Global config: {}{}", gp.display(), missing_marker(&gp));
    }
    let lp = loader.local_config_path(root);
    println!("Local config:  {}{}", lp.display(), missing_marker(&lp));

    let mut section = "";
    for value in &values {
        let (head, name) = value.key.split_once('.').unwrap_or(("", value.key.as_str()));
        if head != section {
            println!("\n[{}]", head);
            section = head;
        }
        match value.source {
            "default" => println!("  {} = {}", name, value.value),
            source => println!("  {} = {} ({})", name, value.value, source),
        }
    }
    Ok(())
}

fn execute_get(args: GetArgs, root: &Path) -> Result<()> {
    let config = ConfigLoader::new().load(root, None)?;

    let value = get_config_value(&config, &args.key)
        .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", args.key))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        match value {
            Value::String(s) => println!("{}", s),
            Value::Null => println!("null"),
            other => println!("{}", other),
        }
    }
    Ok(())
}

fn execute_set(args: SetArgs, root: &Path) -> Result<()> {
    let mut loader = ConfigLoader::new();

    let mut config = if args.global {
        loader.load_global()?.unwrap_or_default()
    } else {
        loader.load_local(root)?.unwrap_or_default()
    };

    set_config_value(&mut config, &args.key, &args.value)
        .with_context(|| format!("Failed to set configuration key: {}", args.key))?;
    config
        .validate()
        .with_context(|| format!("Invalid value for {}", args.key))?;

    if args.global {
        loader.save_global(&config)?;
        println!("Set {} = {} in global config", args.key, args.value);
    } else {
        loader.save_local(root, &config)?;
        println!("Set {} = {} in local config", args.key, args.value);
    }
    Ok(())
}

fn execute_path(args: PathArgs, root: &Path) -> Result<()> {
    let loader = ConfigLoader::new();

    let global_path = loader.global_config_path();
    let local_path = loader.local_config_path(root);
    let paths = ConfigPaths {
        global_exists: global_path.as_ref().is_some_and(|p| p.exists()),
        local_exists: local_path.exists(),
        global: global_path,
        local: local_path,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
        return Ok(());
    }

    match paths.global {
        Some(ref gp) => println!("Global: {}{}", gp.display(), missing_marker(gp)),
        None => println!("Global: not available (no home directory)"),
    }
    println!("Local:  {}{}", paths.local.display(), missing_marker(&paths.local));
    Ok(())
}

fn execute_init(root: &Path, quiet: bool) -> Result<()> {
    let path = ConfigLoader::new()
        .init_local(root)
        .context("Failed to write local config")?;
    if !quiet {
        println!("Config file: {}", path.display());
    }
    Ok(())
}

fn missing_marker(path: &Path) -> &'static str {
    if path.exists() {
        ""
    } else {
        " (not found)"
    }
}

/// Get a configuration value by dotted key path
fn get_config_value(config: &QuakeGraphConfig, key: &str) -> Option<Value> {
    let json = serde_json::to_value(config).ok()?;
    key.split('.')
        .try_fold(&json, |current, part| current.get(part))
        .cloned()
}

/// Set a configuration value by dotted key path
fn set_config_value(config: &mut QuakeGraphConfig, key: &str, value: &str) -> Result<()> {
    let optional_path = |v: &str| (!v.is_empty()).then(|| PathBuf::from(v));

    match key {
        // Storage
        "storage.state_dir" => config.storage.state_dir = PathBuf::from(value),
        "storage.snapshot_file" => config.storage.snapshot_file = value.to_string(),

        // Scan
        "scan.include_hidden" => config.scan.include_hidden = value.parse()?,
        "scan.follow_links" => config.scan.follow_links = value.parse()?,

        // Resolve
        "resolve.base_corpus_dir" => config.resolve.base_corpus_dir = optional_path(value),
        "resolve.base_filelist" => config.resolve.base_filelist = optional_path(value),
        "resolve.strict_ambiguity" => config.resolve.strict_ambiguity = value.parse()?,

        // Graph
        "graph.pass_through" => config.graph.pass_through = value.parse()?,

        // Logging
        "logging.level" => config.logging.level = value.to_string(),

        _ => anyhow::bail!("Unknown or read-only configuration key: {}", key),
    }
    Ok(())
}

/// Collect leaf values with the layer each one comes from
fn collect_config_values(
    default: &QuakeGraphConfig,
    global: &QuakeGraphConfig,
    local: &QuakeGraphConfig,
) -> Result<Vec<ConfigValue>> {
    let default_json = serde_json::to_value(default)?;
    let global_json = serde_json::to_value(global)?;
    let local_json = serde_json::to_value(local)?;

    let mut values = Vec::new();
    flatten_config("", &local_json, &global_json, &default_json, &mut values);
    Ok(values)
}

fn flatten_config(
    prefix: &str,
    local: &Value,
    global: &Value,
    default: &Value,
    values: &mut Vec<ConfigValue>,
) {
    if let Value::Object(map) = local {
        for (key, value) in map {
            let key_path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            flatten_config(
                &key_path,
                value,
                global.get(key).unwrap_or(&Value::Null),
                default.get(key).unwrap_or(&Value::Null),
                values,
            );
        }
        return;
    }

    let source = if local != default && local != global {
        "local"
    } else if global != default {
        "global"
    } else {
        "default"
    };
    values.push(ConfigValue {
        key: prefix.to_string(),
        value: local.clone(),
        source,
    });
}
