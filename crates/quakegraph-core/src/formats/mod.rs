//! Format Extractors
//!
//! One extractor per asset kind. Each parses a single file into a record that
//! exposes the raw outgoing reference strings needed for graph edges; nothing
//! else in the file is decoded.
//!
//! ## Supported Formats
//!
//! - Maps (.bsp) - entity lump and shader lump
//! - Models (.md3) - surface shader names
//! - Shader scripts (.shader) - stage texture maps and sky boxes
//! - Skins (.skin) - surface to shader assignments
//! - Bytecode modules (.qvm) - string literals via disassembly

pub mod bsp;
pub mod md3;
pub mod qvm;
pub mod shader;
pub mod skin;

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use bsp::{BspExtractor, BspFile, BspShader, Entity};
pub use md3::{Md3Extractor, Md3Model, Md3Surface};
pub use qvm::{
    expand_wildcards, extract_asset_strings, extract_string_constants, group_entity_assets,
    is_asset_like, QvmExtractor, QvmHeader,
};
pub use shader::{ShaderDefinition, ShaderExtractor, ShaderScript, SkyBox};
pub use skin::{SkinExtractor, SkinFile};

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while parsing a single asset file.
///
/// These never abort a scan; the loader logs them and moves on to the next file.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the expected magic value
    #[error("bad magic {found:?}, expected {expected:?}")]
    InvalidMagic {
        expected: &'static str,
        found: String,
    },

    /// Known format, unsupported revision
    #[error("unsupported {format} version {version}")]
    UnsupportedVersion { format: &'static str, version: i32 },

    /// An offset or count points past the end of the file
    #[error("truncated {format}: {what} out of bounds")]
    Truncated {
        format: &'static str,
        what: &'static str,
    },

    /// Text format syntax error
    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },
}

impl ExtractError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }
}

// ============================================================================
// Asset Kinds
// ============================================================================

/// Asset kinds that carry outgoing references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Map,
    Model,
    ShaderScript,
    Skin,
    BytecodeModule,
}

impl AssetKind {
    /// All kinds, in extraction order.
    pub const ALL: [AssetKind; 5] = [
        AssetKind::Map,
        AssetKind::Model,
        AssetKind::ShaderScript,
        AssetKind::Skin,
        AssetKind::BytecodeModule,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Map => "map",
            AssetKind::Model => "model",
            AssetKind::ShaderScript => "shader",
            AssetKind::Skin => "skin",
            AssetKind::BytecodeModule => "qvm",
        }
    }

    /// Detect the kind from a file extension (case-insensitive, no leading dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "bsp" => Some(AssetKind::Map),
            "md3" => Some(AssetKind::Model),
            "shader" => Some(AssetKind::ShaderScript),
            "skin" => Some(AssetKind::Skin),
            "qvm" => Some(AssetKind::BytecodeModule),
            _ => None,
        }
    }

    /// Detect the kind from a file path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Asset Records
// ============================================================================

/// A parsed asset file together with its path.
#[derive(Debug, Clone)]
pub enum AssetRecord {
    Map { path: PathBuf, map: BspFile },
    Model { path: PathBuf, model: Md3Model },
    ShaderScript { path: PathBuf, script: ShaderScript },
    Skin { path: PathBuf, skin: SkinFile },
    BytecodeModule { path: PathBuf, strings: Vec<String> },
}

impl AssetRecord {
    pub fn kind(&self) -> AssetKind {
        match self {
            AssetRecord::Map { .. } => AssetKind::Map,
            AssetRecord::Model { .. } => AssetKind::Model,
            AssetRecord::ShaderScript { .. } => AssetKind::ShaderScript,
            AssetRecord::Skin { .. } => AssetKind::Skin,
            AssetRecord::BytecodeModule { .. } => AssetKind::BytecodeModule,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            AssetRecord::Map { path, .. }
            | AssetRecord::Model { path, .. }
            | AssetRecord::ShaderScript { path, .. }
            | AssetRecord::Skin { path, .. }
            | AssetRecord::BytecodeModule { path, .. } => path,
        }
    }

    /// Raw outgoing references, sorted and deduplicated.
    ///
    /// For shader scripts this is the union of every definition's textures;
    /// use [`ShaderScript::texture_map`] for the per-shader breakdown.
    pub fn references(&self) -> Vec<String> {
        let refs = match self {
            AssetRecord::Map { path, map } => map.entity_references(path),
            AssetRecord::Model { model, .. } => model.shader_names(),
            AssetRecord::ShaderScript { script, .. } => script
                .texture_map()
                .into_values()
                .flatten()
                .collect::<Vec<_>>(),
            AssetRecord::Skin { skin, .. } => skin.shader_names(),
            AssetRecord::BytecodeModule { strings, .. } => strings.clone(),
        };
        sorted_unique(refs)
    }

    /// Parse `path` according to `kind`.
    ///
    /// Bytecode modules are read through their disassembly artifact (`.dis`
    /// beside the module); the scanner is responsible for producing it.
    pub fn load(kind: AssetKind, path: &Path) -> Result<Self, ExtractError> {
        let path_buf = path.to_path_buf();
        Ok(match kind {
            AssetKind::Map => AssetRecord::Map {
                map: BspExtractor.extract(&std::fs::read(path)?)?,
                path: path_buf,
            },
            AssetKind::Model => AssetRecord::Model {
                model: Md3Extractor.extract(&std::fs::read(path)?)?,
                path: path_buf,
            },
            AssetKind::ShaderScript => AssetRecord::ShaderScript {
                script: ShaderExtractor.extract(&std::fs::read(path)?)?,
                path: path_buf,
            },
            AssetKind::Skin => AssetRecord::Skin {
                skin: SkinExtractor.extract(&std::fs::read(path)?)?,
                path: path_buf,
            },
            AssetKind::BytecodeModule => AssetRecord::BytecodeModule {
                strings: QvmExtractor.extract(&std::fs::read(disassembly_path(path))?)?,
                path: path_buf,
            },
        })
    }
}

/// Parse file bytes of one kind into a structured record.
pub trait Extractor {
    type Output;

    fn extract(&self, bytes: &[u8]) -> Result<Self::Output, ExtractError>;
}

/// One reference list per source file, keyed by path.
pub type ReferenceMap = BTreeMap<String, Vec<String>>;

/// Location of the disassembly artifact for a bytecode module.
pub fn disassembly_path(module: &Path) -> PathBuf {
    module.with_extension("dis")
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Sort and deduplicate, dropping empty strings.
pub fn sorted_unique(mut items: Vec<String>) -> Vec<String> {
    items.retain(|s| !s.is_empty());
    items.sort();
    items.dedup();
    items
}

/// Read a fixed-size, NUL-padded name field.
pub(crate) fn read_fixed_string<R: Read>(rdr: &mut R, len: usize) -> std::io::Result<String> {
    let mut buf = vec![0u8; len];
    rdr.read_exact(&mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(len);
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

/// Check that `[offset, offset + len)` lies inside a buffer of `total` bytes.
pub(crate) fn in_bounds(offset: i64, len: i64, total: usize) -> bool {
    offset >= 0 && len >= 0 && offset.saturating_add(len) <= total as i64
}
