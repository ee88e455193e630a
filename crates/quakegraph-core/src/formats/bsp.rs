//! Quake III map (IBSP) extraction.
//!
//! Only two lumps are read: the entity string (lump 0) and the shader table
//! (lump 1). Geometry, lightmaps and visibility data are never touched.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use super::{in_bounds, read_fixed_string, sorted_unique, ExtractError, Extractor};

const BSP_MAGIC: &[u8; 4] = b"IBSP";
const BSP_VERSIONS: [i32; 2] = [46, 47];
const LUMP_COUNT: usize = 17;
const LUMP_ENTITIES: usize = 0;
const LUMP_SHADERS: usize = 1;
const SHADER_NAME_LEN: usize = 64;
const SHADER_RECORD_LEN: usize = SHADER_NAME_LEN + 8;

/// Extension of the bot navigation file that accompanies every map.
const NAV_EXTENSION: &str = "aas";

/// One entry of the map's shader lump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BspShader {
    pub name: String,
    pub surface_flags: i32,
    pub content_flags: i32,
}

/// One entity from the entity lump, as key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entity {
    pub fields: BTreeMap<String, String>,
}

impl Entity {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn classname(&self) -> Option<&str> {
        self.get("classname")
    }

    /// Asset references carried by the spawn fields.
    ///
    /// `music` may list an intro and a loop track in one value; it is split
    /// after each `.wav` that is followed by whitespace. Inline brush models
    /// (`*1`, `*2`, ...) are not files and are dropped.
    pub fn asset_fields(&self) -> Vec<String> {
        let mut refs = Vec::new();
        if let Some(noise) = self.get("noise") {
            refs.push(noise.to_string());
        }
        if let Some(music) = self.get("music") {
            refs.extend(split_music(music));
        }
        for key in ["model", "model2"] {
            if let Some(model) = self.get(key) {
                refs.push(model.to_string());
            }
        }
        refs.retain(|r| !r.is_empty() && !r.starts_with('*'));
        refs
    }
}

/// The reference-bearing parts of a map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BspFile {
    pub version: i32,
    pub entities: Vec<Entity>,
    pub shaders: Vec<BspShader>,
}

impl BspFile {
    /// Entity references of the map stored at `path`.
    ///
    /// Spawn-field assets of every entity, the map's navigation file and the
    /// set of entity class names, sorted and deduplicated.
    pub fn entity_references(&self, path: &Path) -> Vec<String> {
        let mut refs: Vec<String> = self
            .entities
            .iter()
            .flat_map(Entity::asset_fields)
            .collect();
        if let Some(nav) = navigation_path(path) {
            refs.push(nav);
        }
        refs.extend(
            self.entities
                .iter()
                .filter_map(|e| e.classname().map(str::to_string)),
        );
        sorted_unique(refs)
    }

    /// Shader names from the shader lump, sorted and deduplicated.
    pub fn shader_names(&self) -> Vec<String> {
        sorted_unique(self.shaders.iter().map(|s| s.name.clone()).collect())
    }
}

/// Extractor for `.bsp` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct BspExtractor;

impl Extractor for BspExtractor {
    type Output = BspFile;

    fn extract(&self, bytes: &[u8]) -> Result<BspFile, ExtractError> {
        if bytes.len() < 8 + LUMP_COUNT * 8 {
            return Err(ExtractError::Truncated {
                format: "bsp",
                what: "header",
            });
        }
        if &bytes[..4] != BSP_MAGIC {
            return Err(ExtractError::InvalidMagic {
                expected: "IBSP",
                found: String::from_utf8_lossy(&bytes[..4]).into_owned(),
            });
        }

        let mut rdr = Cursor::new(bytes);
        rdr.set_position(4);
        let version = rdr.read_i32::<LittleEndian>()?;
        if !BSP_VERSIONS.contains(&version) {
            return Err(ExtractError::UnsupportedVersion {
                format: "bsp",
                version,
            });
        }

        let mut lumps = [(0i32, 0i32); LUMP_COUNT];
        for lump in lumps.iter_mut() {
            *lump = (
                rdr.read_i32::<LittleEndian>()?,
                rdr.read_i32::<LittleEndian>()?,
            );
        }

        let (ent_ofs, ent_len) = lumps[LUMP_ENTITIES];
        if !in_bounds(ent_ofs as i64, ent_len as i64, bytes.len()) {
            return Err(ExtractError::Truncated {
                format: "bsp",
                what: "entity lump",
            });
        }
        let raw = &bytes[ent_ofs as usize..(ent_ofs + ent_len) as usize];
        let text_end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let entities = parse_entities(&String::from_utf8_lossy(&raw[..text_end]))?;

        let (sh_ofs, sh_len) = lumps[LUMP_SHADERS];
        if !in_bounds(sh_ofs as i64, sh_len as i64, bytes.len()) {
            return Err(ExtractError::Truncated {
                format: "bsp",
                what: "shader lump",
            });
        }
        let count = sh_len as usize / SHADER_RECORD_LEN;
        let mut shaders = Vec::with_capacity(count);
        rdr.set_position(sh_ofs as u64);
        for _ in 0..count {
            shaders.push(BspShader {
                name: read_fixed_string(&mut rdr, SHADER_NAME_LEN)?,
                surface_flags: rdr.read_i32::<LittleEndian>()?,
                content_flags: rdr.read_i32::<LittleEndian>()?,
            });
        }

        Ok(BspFile {
            version,
            entities,
            shaders,
        })
    }
}

/// Parse the entity lump text: `{ "key" "value" ... }` blocks.
pub fn parse_entities(text: &str) -> Result<Vec<Entity>, ExtractError> {
    let mut entities = Vec::new();
    let mut current: Option<Entity> = None;
    let mut pending_key: Option<String> = None;
    let mut line = 1;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '{' => {
                if current.is_some() {
                    return Err(ExtractError::syntax(line, "nested entity"));
                }
                current = Some(Entity::default());
            }
            '}' => {
                let entity = current
                    .take()
                    .ok_or_else(|| ExtractError::syntax(line, "unexpected '}'"))?;
                if pending_key.is_some() {
                    return Err(ExtractError::syntax(line, "key without value"));
                }
                entities.push(entity);
            }
            '"' => {
                let mut token = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\n') => {
                            line += 1;
                            token.push('\n');
                        }
                        Some(ch) => token.push(ch),
                        None => return Err(ExtractError::syntax(line, "unterminated string")),
                    }
                }
                let entity = current
                    .as_mut()
                    .ok_or_else(|| ExtractError::syntax(line, "string outside entity"))?;
                match pending_key.take() {
                    Some(key) => {
                        entity.fields.insert(key, token);
                    }
                    None => pending_key = Some(token),
                }
            }
            other => {
                return Err(ExtractError::syntax(
                    line,
                    format!("unexpected character {other:?}"),
                ))
            }
        }
    }

    if current.is_some() {
        return Err(ExtractError::syntax(line, "unterminated entity"));
    }
    Ok(entities)
}

/// Split a `music` value that may hold several tracks.
fn split_music(value: &str) -> Vec<String> {
    let lower = value.to_ascii_lowercase();
    let mut tracks = Vec::new();
    let mut start = 0;
    let mut search = 0;
    while let Some(found) = lower[search..].find(".wav") {
        let end = search + found + 4;
        search = end;
        let rest = &value[end..];
        let trimmed = rest.trim_start();
        if trimmed.len() == rest.len() {
            continue;
        }
        tracks.push(value[start..end].to_string());
        start = value.len() - trimmed.len();
        search = start;
    }
    tracks.push(value[start..].to_string());
    tracks
}

/// The navigation file that belongs to a map path.
fn navigation_path(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    if !ext.eq_ignore_ascii_case("bsp") {
        return None;
    }
    Some(
        path.with_extension(NAV_EXTENSION)
            .to_string_lossy()
            .replace('\\', "/"),
    )
}
