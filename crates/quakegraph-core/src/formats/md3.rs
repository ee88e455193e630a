//! Quake III model (IDP3) extraction.
//!
//! Walks the surface chain and reads each surface's shader records. Frames,
//! tags and vertex data are skipped.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use super::{in_bounds, read_fixed_string, sorted_unique, ExtractError, Extractor};

const MD3_MAGIC: &[u8; 4] = b"IDP3";
const MD3_VERSION: i32 = 15;
const NAME_LEN: usize = 64;
const HEADER_LEN: usize = 108;
const SURFACE_HEADER_LEN: usize = 108;
const SHADER_RECORD_LEN: usize = NAME_LEN + 4;

/// One surface and the shaders assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Md3Surface {
    pub name: String,
    pub shaders: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Md3Model {
    pub name: String,
    pub num_skins: i32,
    pub surfaces: Vec<Md3Surface>,
}

impl Md3Model {
    /// Every surface shader name, flattened, sorted and deduplicated.
    pub fn shader_names(&self) -> Vec<String> {
        sorted_unique(
            self.surfaces
                .iter()
                .flat_map(|s| s.shaders.iter().cloned())
                .collect(),
        )
    }

    /// Whether the model declares embedded skins.
    pub fn has_skins(&self) -> bool {
        self.num_skins > 0
    }
}

/// Extractor for `.md3` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Md3Extractor;

impl Extractor for Md3Extractor {
    type Output = Md3Model;

    fn extract(&self, bytes: &[u8]) -> Result<Md3Model, ExtractError> {
        if bytes.len() < HEADER_LEN {
            return Err(ExtractError::Truncated {
                format: "md3",
                what: "header",
            });
        }
        if &bytes[..4] != MD3_MAGIC {
            return Err(ExtractError::InvalidMagic {
                expected: "IDP3",
                found: String::from_utf8_lossy(&bytes[..4]).into_owned(),
            });
        }

        let mut rdr = Cursor::new(bytes);
        rdr.set_position(4);
        let version = rdr.read_i32::<LittleEndian>()?;
        if version != MD3_VERSION {
            return Err(ExtractError::UnsupportedVersion {
                format: "md3",
                version,
            });
        }
        let name = read_fixed_string(&mut rdr, NAME_LEN)?;
        let _flags = rdr.read_i32::<LittleEndian>()?;
        let _num_frames = rdr.read_i32::<LittleEndian>()?;
        let _num_tags = rdr.read_i32::<LittleEndian>()?;
        let num_surfaces = rdr.read_i32::<LittleEndian>()?;
        let num_skins = rdr.read_i32::<LittleEndian>()?;
        let _ofs_frames = rdr.read_i32::<LittleEndian>()?;
        let _ofs_tags = rdr.read_i32::<LittleEndian>()?;
        let ofs_surfaces = rdr.read_i32::<LittleEndian>()?;

        // a surface header cannot be smaller than SURFACE_HEADER_LEN bytes
        let max_surfaces = bytes.len() / SURFACE_HEADER_LEN;
        let mut surfaces = Vec::with_capacity((num_surfaces.max(0) as usize).min(max_surfaces));
        let mut surface_start = ofs_surfaces as i64;
        for _ in 0..num_surfaces.max(0) {
            if !in_bounds(surface_start, SURFACE_HEADER_LEN as i64, bytes.len()) {
                return Err(ExtractError::Truncated {
                    format: "md3",
                    what: "surface header",
                });
            }
            rdr.set_position(surface_start as u64);
            let mut ident = [0u8; 4];
            std::io::Read::read_exact(&mut rdr, &mut ident)?;
            if &ident != MD3_MAGIC {
                return Err(ExtractError::InvalidMagic {
                    expected: "IDP3",
                    found: String::from_utf8_lossy(&ident).into_owned(),
                });
            }
            let surface_name = read_fixed_string(&mut rdr, NAME_LEN)?;
            let _flags = rdr.read_i32::<LittleEndian>()?;
            let _num_frames = rdr.read_i32::<LittleEndian>()?;
            let num_shaders = rdr.read_i32::<LittleEndian>()?.max(0) as i64;
            let _num_verts = rdr.read_i32::<LittleEndian>()?;
            let _num_triangles = rdr.read_i32::<LittleEndian>()?;
            let _ofs_triangles = rdr.read_i32::<LittleEndian>()?;
            let ofs_shaders = rdr.read_i32::<LittleEndian>()? as i64;
            let _ofs_st = rdr.read_i32::<LittleEndian>()?;
            let _ofs_xyznormal = rdr.read_i32::<LittleEndian>()?;
            let ofs_end = rdr.read_i32::<LittleEndian>()? as i64;

            let shaders_start = surface_start + ofs_shaders;
            if !in_bounds(
                shaders_start,
                num_shaders * SHADER_RECORD_LEN as i64,
                bytes.len(),
            ) {
                return Err(ExtractError::Truncated {
                    format: "md3",
                    what: "surface shaders",
                });
            }
            rdr.set_position(shaders_start as u64);
            let mut shaders = Vec::with_capacity(num_shaders as usize);
            for _ in 0..num_shaders {
                shaders.push(read_fixed_string(&mut rdr, NAME_LEN)?);
                let _shader_index = rdr.read_i32::<LittleEndian>()?;
            }

            surfaces.push(Md3Surface {
                name: surface_name,
                shaders,
            });
            if ofs_end <= 0 {
                break;
            }
            surface_start += ofs_end;
        }

        Ok(Md3Model {
            name,
            num_skins,
            surfaces,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use pretty_assertions::assert_eq;

    fn name_field(out: &mut Vec<u8>, name: &str) {
        let mut field = name.as_bytes().to_vec();
        field.resize(NAME_LEN, 0);
        out.extend_from_slice(&field);
    }

    fn build_md3(surfaces: &[(&str, &[&str])], num_skins: i32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MD3_MAGIC);
        out.write_i32::<LittleEndian>(MD3_VERSION).unwrap();
        name_field(&mut out, "test");
        for value in [0, 1, 0, surfaces.len() as i32, num_skins, 0, 0] {
            out.write_i32::<LittleEndian>(value).unwrap();
        }
        out.write_i32::<LittleEndian>(HEADER_LEN as i32).unwrap();
        out.write_i32::<LittleEndian>(0).unwrap();

        for (name, shaders) in surfaces {
            let end = SURFACE_HEADER_LEN + shaders.len() * SHADER_RECORD_LEN;
            out.extend_from_slice(MD3_MAGIC);
            name_field(&mut out, name);
            for value in [0, 1, shaders.len() as i32, 0, 0, 0] {
                out.write_i32::<LittleEndian>(value).unwrap();
            }
            out.write_i32::<LittleEndian>(SURFACE_HEADER_LEN as i32)
                .unwrap();
            out.write_i32::<LittleEndian>(0).unwrap();
            out.write_i32::<LittleEndian>(0).unwrap();
            out.write_i32::<LittleEndian>(end as i32).unwrap();
            for (i, shader) in shaders.iter().enumerate() {
                name_field(&mut out, shader);
                out.write_i32::<LittleEndian>(i as i32).unwrap();
            }
        }
        out
    }

    #[test]
    fn test_extract_md3() {
        let bytes = build_md3(
            &[
                ("h_head", &["models/players/sarge/head", ""]),
                ("u_torso", &["models/players/sarge/body"]),
                ("u_arm", &["models/players/sarge/body"]),
            ],
            0,
        );
        let model = Md3Extractor.extract(&bytes).unwrap();
        assert_eq!(model.surfaces.len(), 3);
        assert_eq!(model.surfaces[0].name, "h_head");
        assert_eq!(
            model.shader_names(),
            vec!["models/players/sarge/body", "models/players/sarge/head"]
        );
        assert!(!model.has_skins());
    }

    #[test]
    fn test_extract_md3_with_skins() {
        let bytes = build_md3(&[("s", &["player_skin"])], 2);
        let model = Md3Extractor.extract(&bytes).unwrap();
        assert!(model.has_skins());
        assert_eq!(model.shader_names(), vec!["player_skin"]);
    }

    #[test]
    fn test_extract_md3_no_surfaces() {
        let bytes = build_md3(&[], 0);
        let model = Md3Extractor.extract(&bytes).unwrap();
        assert!(model.shader_names().is_empty());
    }

    #[test]
    fn test_extract_md3_oversized_surface_count() {
        let mut bytes = build_md3(&[], 0);
        // num_surfaces and ofs_surfaces in the header
        bytes[84..88].copy_from_slice(&i32::MAX.to_le_bytes());
        bytes[100..104].copy_from_slice(&1_000_000i32.to_le_bytes());
        assert!(matches!(
            Md3Extractor.extract(&bytes),
            Err(ExtractError::Truncated {
                what: "surface header",
                ..
            })
        ));
    }

    #[test]
    fn test_extract_md3_errors() {
        let mut bytes = build_md3(&[("s", &["a"])], 0);
        assert!(matches!(
            Md3Extractor.extract(&bytes[..HEADER_LEN + 10]),
            Err(ExtractError::Truncated { .. })
        ));
        assert!(matches!(
            Md3Extractor.extract(&bytes[..50]),
            Err(ExtractError::Truncated { .. })
        ));

        bytes[4..8].copy_from_slice(&16i32.to_le_bytes());
        assert!(matches!(
            Md3Extractor.extract(&bytes),
            Err(ExtractError::UnsupportedVersion { version: 16, .. })
        ));

        bytes[..4].copy_from_slice(b"IDP2");
        assert!(matches!(
            Md3Extractor.extract(&bytes),
            Err(ExtractError::InvalidMagic { .. })
        ));
    }
}
