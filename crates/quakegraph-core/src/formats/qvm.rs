//! Bytecode module (QVM) string extraction.
//!
//! References inside a compiled module are string literals. They are read from
//! the module's disassembly text, which either an external disassembler or
//! [`disassemble_literals`] produces.

use std::collections::BTreeMap;
use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use globset::GlobBuilder;
use tracing::warn;

use super::{in_bounds, sorted_unique, ExtractError, Extractor};
use crate::resolver::TypeGroup;

const QVM_MAGIC: u32 = 0x1272_1444;
const QVM_MAGIC_JTRG: u32 = 0x1272_1445;
const HEADER_LEN: usize = 32;

/// Class name prefixes of item-like game entities.
pub const ENTITY_PREFIXES: [&str; 5] = ["item_", "weapon_", "ammo_", "holdable_", "team_"];

/// Fixed header at the start of every `.qvm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QvmHeader {
    pub magic: u32,
    pub instruction_count: i32,
    pub code_offset: i32,
    pub code_length: i32,
    pub data_offset: i32,
    pub data_length: i32,
    pub lit_length: i32,
    pub bss_length: i32,
}

impl QvmHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self, ExtractError> {
        if bytes.len() < HEADER_LEN {
            return Err(ExtractError::Truncated {
                format: "qvm",
                what: "header",
            });
        }
        let mut rdr = Cursor::new(bytes);
        let magic = rdr.read_u32::<LittleEndian>()?;
        if magic != QVM_MAGIC && magic != QVM_MAGIC_JTRG {
            return Err(ExtractError::InvalidMagic {
                expected: "0x12721444",
                found: format!("{magic:#010x}"),
            });
        }
        Ok(Self {
            magic,
            instruction_count: rdr.read_i32::<LittleEndian>()?,
            code_offset: rdr.read_i32::<LittleEndian>()?,
            code_length: rdr.read_i32::<LittleEndian>()?,
            data_offset: rdr.read_i32::<LittleEndian>()?,
            data_length: rdr.read_i32::<LittleEndian>()?,
            lit_length: rdr.read_i32::<LittleEndian>()?,
            bss_length: rdr.read_i32::<LittleEndian>()?,
        })
    }

    /// Byte range of the literal segment, which follows the data segment.
    fn literal_range(&self) -> (i64, i64) {
        (
            self.data_offset as i64 + self.data_length as i64,
            self.lit_length as i64,
        )
    }
}

/// NUL-separated strings of the module's literal segment, in order.
pub fn literal_table(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    let header = QvmHeader::parse(bytes)?;
    let (offset, len) = header.literal_range();
    if !in_bounds(offset, len, bytes.len()) {
        return Err(ExtractError::Truncated {
            format: "qvm",
            what: "literal segment",
        });
    }
    let segment = &bytes[offset as usize..(offset + len) as usize];
    Ok(segment
        .split(|&b| b == 0)
        .filter(|s| !s.is_empty())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect())
}

/// Render the literal segment as disassembly text, one quoted string per line.
pub fn disassemble_literals(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    for literal in literal_table(bytes)? {
        out.push_str("lit \"");
        for c in literal.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                c => out.push(c),
            }
        }
        out.push_str("\"\n");
    }
    Ok(out)
}

// ============================================================================
// String Constants
// ============================================================================

/// Every double-quoted constant in disassembly text, in order of appearance.
pub fn extract_string_constants(text: &str) -> Vec<String> {
    let mut constants = Vec::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '"' {
            continue;
        }
        let mut value = String::new();
        let mut closed = false;
        while let Some(ch) = chars.next() {
            match ch {
                '"' => {
                    closed = true;
                    break;
                }
                '\\' => match chars.next() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(other) => value.push(other),
                    None => break,
                },
                '\n' => break,
                ch => value.push(ch),
            }
        }
        if closed {
            constants.push(value);
        }
    }
    constants
}

/// Whether a string constant looks like an asset path or path pattern.
pub fn is_asset_like(s: &str) -> bool {
    if s.is_empty()
        || !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '\\' | '.' | '_' | '-' | '*'))
    {
        return false;
    }
    if s.contains('/') || s.contains('*') {
        return true;
    }
    match s.rsplit_once('.') {
        Some((stem, ext)) => !stem.is_empty() && TypeGroup::from_extension(ext).is_some(),
        None => false,
    }
}

/// Asset-like string constants, sorted and deduplicated.
pub fn extract_asset_strings(text: &str) -> Vec<String> {
    sorted_unique(
        extract_string_constants(text)
            .into_iter()
            .filter(|s| is_asset_like(s))
            .collect(),
    )
}

/// Group string constants into `classname -> assets`.
///
/// An item-like class name opens a group that collects the asset-like strings
/// following it; the first other non-empty string closes it.
pub fn group_entity_assets(constants: &[String]) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut current: Option<String> = None;
    for s in constants {
        if s.is_empty() {
            continue;
        }
        if ENTITY_PREFIXES.iter().any(|p| s.starts_with(p)) && !s.contains('/') {
            groups.entry(s.clone()).or_default();
            current = Some(s.clone());
        } else if is_asset_like(s) {
            if let Some(name) = &current {
                groups.entry(name.clone()).or_default().push(s.clone());
            }
        } else {
            current = None;
        }
    }
    groups
        .into_iter()
        .map(|(name, assets)| (name, sorted_unique(assets)))
        .collect()
}

/// Replace wildcard references with the corpus paths they match.
///
/// Each wildcard `w` is matched as `**/w`, case-insensitively, with `*` not
/// crossing a `/`. Plain references pass through. Output is sorted and
/// deduplicated.
pub fn expand_wildcards(refs: &[String], corpus: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(refs.len());
    for r in refs {
        if !r.contains('*') {
            out.push(r.clone());
            continue;
        }
        let pattern = format!("**/{}", r.trim_start_matches('/'));
        match GlobBuilder::new(&pattern)
            .case_insensitive(true)
            .literal_separator(true)
            .build()
        {
            Ok(glob) => {
                let matcher = glob.compile_matcher();
                out.extend(corpus.iter().filter(|f| matcher.is_match(f)).cloned());
            }
            Err(e) => warn!("Skipping invalid wildcard {:?}: {}", r, e),
        }
    }
    sorted_unique(out)
}

/// Extractor for bytecode disassembly text.
#[derive(Debug, Clone, Copy, Default)]
pub struct QvmExtractor;

impl Extractor for QvmExtractor {
    type Output = Vec<String>;

    fn extract(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
        Ok(extract_asset_strings(&String::from_utf8_lossy(bytes)))
    }
}
