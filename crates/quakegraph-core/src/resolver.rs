//! Reference Resolver
//!
//! Maps a raw reference string to a corpus entry. References are often written
//! without an extension or with different case than the file on disk, so the
//! lookup is a substring search over the lower-cased corpus, narrowed by the
//! reference's type group when more than one file matches.
//!
//! Resolution is a pure function of the reference, the [`FileCorpus`], the
//! [`BaseCorpus`] and the strictness flag.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::corpus::{BaseCorpus, FileCorpus};

// ============================================================================
// Type Groups
// ============================================================================

/// Extension groups used to disambiguate multiple matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeGroup {
    Image,
    Audio,
    Source,
    File,
}

const IMAGE_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".tga", ".gif", ".pcx", ".webp", ".bmp", ".dds",
];
const AUDIO_EXTENSIONS: &[&str] = &[".wav", ".mp3", ".ogg", ".opus", ".flac", ".m4a"];
const SOURCE_EXTENSIONS: &[&str] = &[".map", ".scc", ".c", ".h", ".asm"];
const FILE_EXTENSIONS: &[&str] = &[
    ".cfg", ".qvm", ".dis", ".bot", ".txt", ".bsp", ".aas", ".md3", ".md5", ".iqm", ".mdr",
    ".shader", ".skin", ".font", ".menu", ".defi", ".arena", ".roq", ".dm_68",
];

impl TypeGroup {
    /// Groups in lookup order; an extension belongs to the first that lists it.
    pub const ALL: [TypeGroup; 4] = [
        TypeGroup::Image,
        TypeGroup::Audio,
        TypeGroup::Source,
        TypeGroup::File,
    ];

    /// Extensions of this group, with leading dot.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            TypeGroup::Image => IMAGE_EXTENSIONS,
            TypeGroup::Audio => AUDIO_EXTENSIONS,
            TypeGroup::Source => SOURCE_EXTENSIONS,
            TypeGroup::File => FILE_EXTENSIONS,
        }
    }

    /// Group of an extension, with or without the leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = format!(".{}", ext.trim_start_matches('.').to_ascii_lowercase());
        Self::ALL
            .into_iter()
            .find(|g| g.extensions().contains(&ext.as_str()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeGroup::Image => "image",
            TypeGroup::Audio => "audio",
            TypeGroup::Source => "source",
            TypeGroup::File => "file",
        }
    }
}

impl std::fmt::Display for TypeGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Results and Errors
// ============================================================================

/// A reference bound to a corpus entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMatch {
    /// Index into the [`FileCorpus`].
    pub index: usize,
    /// Original-case corpus path.
    pub path: String,
    /// Set when the reference had no extension and the image group was assumed.
    pub assumed_group: Option<TypeGroup>,
}

/// Outcome of resolving one raw reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionResult {
    Resolved(ResolvedMatch),
    NotFound,
    FoundInBaseCorpus,
}

impl ResolutionResult {
    pub fn resolved(&self) -> Option<&ResolvedMatch> {
        match self {
            ResolutionResult::Resolved(m) => Some(m),
            _ => None,
        }
    }
}

/// Resolution failures. `UnknownType` and `Ambiguous` abort a graph build.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Nothing left after normalization; callers skip these
    #[error("reference is empty after normalization")]
    EmptyReference,

    #[error("File type not found for {reference:?}: extension {extension:?} is in no type group")]
    UnknownType {
        reference: String,
        extension: String,
    },

    #[error("Ambiguous {group} reference {reference:?}: {} candidates remain", candidates.len())]
    Ambiguous {
        reference: String,
        group: TypeGroup,
        candidates: Vec<String>,
    },
}

// ============================================================================
// Normalization
// ============================================================================

/// Normalize a raw reference for matching.
///
/// Backslashes become `/`, repeated separators collapse, the extension of the
/// last segment is dropped and the result is lower-cased.
pub fn normalize_reference(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = if c == '\\' { '/' } else { c };
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    let name_start = out.rfind('/').map(|i| i + 1).unwrap_or(0);
    if let Some(dot) = out[name_start..].rfind('.') {
        out.truncate(name_start + dot);
    }
    out.to_lowercase()
}

/// Extension of the last path segment, lower-cased, without the dot.
///
/// Leading-dot names (`.hidden`) have no extension.
pub fn reference_extension(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(i) if i + 1 == name.len() => None,
        Some(i) => Some(name[i + 1..].to_ascii_lowercase()),
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolves raw references against a corpus pair.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    corpus: &'a FileCorpus,
    base: &'a BaseCorpus,
    strict: bool,
}

impl<'a> Resolver<'a> {
    /// Strict resolver: ambiguity is an error.
    pub fn new(corpus: &'a FileCorpus, base: &'a BaseCorpus) -> Self {
        Self {
            corpus,
            base,
            strict: true,
        }
    }

    /// When `strict` is false, an ambiguity resolves to `NotFound` instead.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn resolve(&self, raw: &str) -> Result<ResolutionResult, ResolveError> {
        let lookup = normalize_reference(raw);
        if lookup.is_empty() {
            return Err(ResolveError::EmptyReference);
        }

        let matches = self.corpus.search(&lookup);
        if matches.is_empty() {
            return Ok(if self.base.contains_substring(&lookup) {
                ResolutionResult::FoundInBaseCorpus
            } else {
                ResolutionResult::NotFound
            });
        }
        if let [only] = matches[..] {
            return Ok(self.resolved(only, None));
        }

        let extension = reference_extension(raw);
        let (group, assumed) = match &extension {
            Some(ext) => match TypeGroup::from_extension(ext) {
                Some(group) => (group, None),
                None => {
                    return Err(ResolveError::UnknownType {
                        reference: raw.to_string(),
                        extension: format!(".{ext}"),
                    })
                }
            },
            None => (TypeGroup::Image, Some(TypeGroup::Image)),
        };

        let lower = self.corpus.lower();
        let survivors: Vec<usize> = matches
            .into_iter()
            .filter(|&i| {
                group
                    .extensions()
                    .iter()
                    .any(|ext| lower[i].contains(&format!("{lookup}{ext}")))
            })
            .collect();

        match survivors.as_slice() {
            [only] => Ok(self.resolved(*only, assumed)),
            _ if !self.strict => Ok(ResolutionResult::NotFound),
            _ => Err(ResolveError::Ambiguous {
                reference: raw.to_string(),
                group,
                candidates: survivors
                    .iter()
                    .filter_map(|&i| self.corpus.get(i).map(str::to_string))
                    .collect(),
            }),
        }
    }

    fn resolved(&self, index: usize, assumed_group: Option<TypeGroup>) -> ResolutionResult {
        ResolutionResult::Resolved(ResolvedMatch {
            index,
            path: self.corpus.paths()[index].clone(),
            assumed_group,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn corpus(paths: &[&str]) -> FileCorpus {
        FileCorpus::new(paths.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_normalize_reference() {
        assert_eq!(normalize_reference("Textures//Base\\Floor.TGA"), "textures/base/floor");
        assert_eq!(normalize_reference("maps/q3dm1.v2/readme"), "maps/q3dm1.v2/readme");
        assert_eq!(normalize_reference("sound/a.b.wav"), "sound/a.b");
        assert_eq!(normalize_reference(".tga"), "");
        assert_eq!(normalize_reference(""), "");
    }

    #[test]
    fn test_reference_extension() {
        assert_eq!(reference_extension("a/b.TGA"), Some("tga".to_string()));
        assert_eq!(reference_extension("a.dir/b"), None);
        assert_eq!(reference_extension("a/.hidden"), None);
        assert_eq!(reference_extension("a/b."), None);
    }

    #[test]
    fn test_type_group_lookup() {
        assert_eq!(TypeGroup::from_extension("tga"), Some(TypeGroup::Image));
        assert_eq!(TypeGroup::from_extension(".WAV"), Some(TypeGroup::Audio));
        assert_eq!(TypeGroup::from_extension("map"), Some(TypeGroup::Source));
        assert_eq!(TypeGroup::from_extension("md3"), Some(TypeGroup::File));
        assert_eq!(TypeGroup::from_extension("xyz"), None);
    }

    #[test]
    fn test_resolve_single_match() {
        let c = corpus(&["/q3/textures/Foo.tga", "/q3/sound/bar.wav"]);
        let base = BaseCorpus::empty();
        let result = Resolver::new(&c, &base).resolve("TEXTURES/foo").unwrap();
        assert_eq!(
            result,
            ResolutionResult::Resolved(ResolvedMatch {
                index: 0,
                path: "/q3/textures/Foo.tga".to_string(),
                assumed_group: None,
            })
        );
    }

    #[test]
    fn test_resolve_not_found_and_base_corpus() {
        let c = corpus(&["/q3/textures/foo.tga"]);
        let base = BaseCorpus::from_paths(["/baseq3/sound/world/wind.wav"]);
        let resolver = Resolver::new(&c, &base);
        assert_eq!(
            resolver.resolve("sound/world/wind.wav").unwrap(),
            ResolutionResult::FoundInBaseCorpus
        );
        assert_eq!(
            resolver.resolve("sound/world/rain.wav").unwrap(),
            ResolutionResult::NotFound
        );
    }

    #[test]
    fn test_resolve_empty_reference() {
        let c = corpus(&[]);
        let base = BaseCorpus::empty();
        assert_eq!(
            Resolver::new(&c, &base).resolve(".tga"),
            Err(ResolveError::EmptyReference)
        );
    }

    #[test]
    fn test_resolve_by_extension_group() {
        let c = corpus(&["textures/foo.tga", "textures/foo.wav"]);
        let base = BaseCorpus::empty();
        let resolver = Resolver::new(&c, &base);

        let wav = resolver.resolve("textures/foo.wav").unwrap();
        assert_eq!(wav.resolved().map(|m| m.index), Some(1));

        let assumed = resolver.resolve("textures/foo").unwrap();
        let m = assumed.resolved().unwrap();
        assert_eq!(m.path, "textures/foo.tga");
        assert_eq!(m.assumed_group, Some(TypeGroup::Image));
    }

    #[test]
    fn test_resolve_extensionless_without_image_is_ambiguous() {
        let c = corpus(&["textures/foo.wav", "textures/foo.ogg"]);
        let base = BaseCorpus::empty();
        let err = Resolver::new(&c, &base).resolve("textures/foo").unwrap_err();
        assert_eq!(
            err,
            ResolveError::Ambiguous {
                reference: "textures/foo".to_string(),
                group: TypeGroup::Image,
                candidates: vec![],
            }
        );
        assert!(err.to_string().contains("image"));
    }

    #[test]
    fn test_resolve_several_survivors_is_ambiguous() {
        let c = corpus(&["a/textures/foo.tga", "b/textures/foo.jpg"]);
        let base = BaseCorpus::empty();
        match Resolver::new(&c, &base).resolve("textures/foo.tga") {
            Err(ResolveError::Ambiguous {
                group, candidates, ..
            }) => {
                assert_eq!(group, TypeGroup::Image);
                assert_eq!(candidates, vec!["a/textures/foo.tga", "b/textures/foo.jpg"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_unknown_type() {
        let c = corpus(&["models/foo.xyz", "models/foo.md3"]);
        let base = BaseCorpus::empty();
        assert_eq!(
            Resolver::new(&c, &base).resolve("models/foo.xyz"),
            Err(ResolveError::UnknownType {
                reference: "models/foo.xyz".to_string(),
                extension: ".xyz".to_string(),
            })
        );
    }

    #[test]
    fn test_lenient_ambiguity_is_not_found() {
        let c = corpus(&["textures/foo.wav", "textures/foo.ogg"]);
        let base = BaseCorpus::empty();
        let resolver = Resolver::new(&c, &base).with_strict(false);
        assert!(!resolver.is_strict());
        assert_eq!(
            resolver.resolve("textures/foo").unwrap(),
            ResolutionResult::NotFound
        );
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let c = corpus(&["textures/foo.tga", "textures/foo.wav", "maps/arena.bsp"]);
        let base = BaseCorpus::empty();
        let resolver = Resolver::new(&c, &base);
        for raw in ["textures/foo", "textures/foo.wav", "maps/arena", "missing"] {
            assert_eq!(resolver.resolve(raw), resolver.resolve(raw));
        }
    }
}
