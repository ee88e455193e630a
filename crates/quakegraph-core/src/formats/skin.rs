//! Skin file extraction.
//!
//! A skin is plain text, one `surface,shader` assignment per line.

use super::{sorted_unique, ExtractError, Extractor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinSurface {
    pub surface: String,
    pub shader: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkinFile {
    pub surfaces: Vec<SkinSurface>,
}

impl SkinFile {
    pub fn shader_names(&self) -> Vec<String> {
        sorted_unique(self.surfaces.iter().map(|s| s.shader.clone()).collect())
    }
}

/// Extractor for `.skin` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkinExtractor;

impl Extractor for SkinExtractor {
    type Output = SkinFile;

    fn extract(&self, bytes: &[u8]) -> Result<SkinFile, ExtractError> {
        Ok(parse_skin(&String::from_utf8_lossy(bytes)))
    }
}

/// Parse skin text. Lines without a comma or with a blank shader are skipped.
pub fn parse_skin(text: &str) -> SkinFile {
    let surfaces = text
        .lines()
        .filter_map(|line| {
            let (surface, shader) = line.split_once(',')?;
            let shader = shader.trim().trim_matches('"').trim();
            if shader.is_empty() {
                return None;
            }
            Some(SkinSurface {
                surface: surface.trim().trim_matches('"').to_string(),
                shader: shader.to_string(),
            })
        })
        .collect();
    SkinFile { surfaces }
}
