//! Common test utilities for integration tests.
//!
//! Byte builders for the binary asset formats and a small game tree that
//! exercises every reference kind.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use tempfile::TempDir;

// ============================================================================
// Format Builders
// ============================================================================

fn name_field(out: &mut Vec<u8>, name: &str) {
    let mut field = name.as_bytes().to_vec();
    field.resize(64, 0);
    out.extend_from_slice(&field);
}

/// IBSP v46 with an entity lump and a shader lump; other lumps are empty.
pub fn bsp_bytes(entities: &str, shaders: &[&str]) -> Vec<u8> {
    let header_len = 8 + 17 * 8;
    let mut ent = entities.as_bytes().to_vec();
    ent.push(0);
    let sh_ofs = header_len + ent.len();

    let mut out = Vec::new();
    out.extend_from_slice(b"IBSP");
    out.write_i32::<LittleEndian>(46).unwrap();
    for lump in 0..17 {
        let (ofs, len) = match lump {
            0 => (header_len, ent.len()),
            1 => (sh_ofs, shaders.len() * 72),
            _ => (0, 0),
        };
        out.write_i32::<LittleEndian>(ofs as i32).unwrap();
        out.write_i32::<LittleEndian>(len as i32).unwrap();
    }
    out.extend_from_slice(&ent);
    for shader in shaders {
        name_field(&mut out, shader);
        out.write_i32::<LittleEndian>(0).unwrap();
        out.write_i32::<LittleEndian>(1).unwrap();
    }
    out
}

/// IDP3 v15 with one surface per entry, each carrying the given shaders.
pub fn md3_bytes(surfaces: &[(&str, &[&str])]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"IDP3");
    out.write_i32::<LittleEndian>(15).unwrap();
    name_field(&mut out, "model");
    for value in [0, 1, 0, surfaces.len() as i32, 0, 0, 0] {
        out.write_i32::<LittleEndian>(value).unwrap();
    }
    out.write_i32::<LittleEndian>(108).unwrap();
    out.write_i32::<LittleEndian>(0).unwrap();

    for (name, shaders) in surfaces {
        let end = 108 + shaders.len() * 68;
        out.extend_from_slice(b"IDP3");
        name_field(&mut out, name);
        for value in [0, 1, shaders.len() as i32, 0, 0, 0] {
            out.write_i32::<LittleEndian>(value).unwrap();
        }
        for value in [108, 0, 0, end as i32] {
            out.write_i32::<LittleEndian>(value).unwrap();
        }
        for (i, shader) in shaders.iter().enumerate() {
            name_field(&mut out, shader);
            out.write_i32::<LittleEndian>(i as i32).unwrap();
        }
    }
    out
}

/// QVM whose literal segment holds `literals`, NUL-terminated.
pub fn qvm_bytes(literals: &[&str]) -> Vec<u8> {
    let mut lit = Vec::new();
    for l in literals {
        lit.extend_from_slice(l.as_bytes());
        lit.push(0);
    }
    let mut out = Vec::new();
    out.write_u32::<LittleEndian>(0x1272_1444).unwrap();
    // instructions, code offset/len, data offset/len, lit len, bss len
    for value in [1, 32, 4, 36, 4, lit.len() as i32, 0] {
        out.write_i32::<LittleEndian>(value).unwrap();
    }
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&lit);
    out
}

// ============================================================================
// Game Tree
// ============================================================================

pub fn write(root: &Path, rel: &str, bytes: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

pub const ARENA_ENTITIES: &str = r#"{
"classname" "worldspawn"
}
{
"classname" "misc_model"
"model" "models/player.md3"
}
"#;

pub const PLAYER_SHADERS: &str = r#"
// player surfaces
player_skin
{
    {
        map textures/player.tga
    }
}

textures/arena/floor
{
    {
        map textures/arena/floor.jpg
        blendFunc GL_DST_COLOR GL_ZERO
    }
}
"#;

/// A small game tree:
///
/// - `maps/arena.bsp` places `models/player.md3` and uses `textures/arena/floor`
/// - `models/player.md3` uses `player_skin`, defined in `scripts/player.shader`
/// - `vm/cgame.qvm` names an armor item and a wildcard sound
pub fn create_game() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(
        root,
        "maps/arena.bsp",
        &bsp_bytes(ARENA_ENTITIES, &["textures/arena/floor"]),
    );
    write(root, "models/player.md3", &md3_bytes(&[("body", &["player_skin"])]));
    write(root, "models/powerups/armor/armor_red.md3", &md3_bytes(&[]));
    write(root, "scripts/player.shader", PLAYER_SHADERS.as_bytes());
    write(root, "textures/player.tga", b"tga");
    write(root, "textures/arena/floor.jpg", b"jpg");
    write(root, "sound/items/pickup.wav", b"wav");
    write(
        root,
        "vm/cgame.qvm",
        &qvm_bytes(&[
            "item_armor_body",
            "models/powerups/armor/armor_red.md3",
            "%s",
            "sound/items/*.wav",
        ]),
    );
    temp
}

/// Absolute, slash-separated path of `rel` under the canonical root.
pub fn abs(root: &Path, rel: &str) -> String {
    quakegraph_core::slash_path(&root.canonicalize().unwrap().join(rel))
}
