//! Reference resolution against scanned trees and base corpus file lists.

mod common;

use common::{abs, write};
use pretty_assertions::assert_eq;
use quakegraph_core::{
    BaseCorpus, ProjectScanner, ResolutionResult, ResolveError, Resolver, TypeGroup,
};
use tempfile::TempDir;

fn scanned(files: &[&str]) -> (TempDir, quakegraph_core::FileCorpus) {
    let temp = TempDir::new().unwrap();
    for file in files {
        write(temp.path(), file, b"x");
    }
    let corpus = ProjectScanner::default().scan(temp.path()).unwrap().corpus;
    (temp, corpus)
}

#[test]
fn test_extensionless_reference_prefers_images() {
    let (temp, corpus) = scanned(&[
        "textures/base/wall.TGA",
        "textures/base/wall.wav",
        "textures/base/wall2.jpg",
    ]);
    let base = BaseCorpus::empty();
    let resolver = Resolver::new(&corpus, &base);

    let result = resolver.resolve("Textures\\Base\\WALL").unwrap();
    let m = result.resolved().unwrap();
    assert_eq!(m.path, abs(temp.path(), "textures/base/wall.TGA"));
    assert_eq!(m.assumed_group, Some(TypeGroup::Image));

    let result = resolver.resolve("textures/base/wall.ogg").unwrap();
    assert_eq!(
        result.resolved().map(|m| m.path.clone()),
        Some(abs(temp.path(), "textures/base/wall.wav"))
    );
}

#[test]
fn test_base_corpus_file_list_round_trip() {
    let (_temp, corpus) = scanned(&["maps/arena.bsp"]);
    let lists = TempDir::new().unwrap();
    let filelist = lists.path().join("baseq3.json");

    assert!(BaseCorpus::load_filelist(&filelist).unwrap().is_empty());
    BaseCorpus::from_paths(["/baseq3/Textures/Sky.tga", "/baseq3/sound/world/wind.wav"])
        .save_filelist(&filelist)
        .unwrap();
    let base = BaseCorpus::load_filelist(&filelist).unwrap();
    assert_eq!(base.len(), 2);

    let resolver = Resolver::new(&corpus, &base);
    assert_eq!(
        resolver.resolve("textures/sky").unwrap(),
        ResolutionResult::FoundInBaseCorpus
    );
    assert_eq!(
        resolver.resolve("textures/cloud").unwrap(),
        ResolutionResult::NotFound
    );
}

#[test]
fn test_ambiguity_depends_on_strictness() {
    let (_temp, corpus) = scanned(&["a/gfx/icon.png", "b/gfx/icon.jpg", "gfx/icon.cfg"]);
    let base = BaseCorpus::empty();

    let strict = Resolver::new(&corpus, &base);
    match strict.resolve("gfx/icon") {
        Err(ResolveError::Ambiguous {
            group, candidates, ..
        }) => {
            assert_eq!(group, TypeGroup::Image);
            assert_eq!(candidates.len(), 2);
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
    assert!(matches!(
        strict.resolve("gfx/icon.zzz"),
        Err(ResolveError::UnknownType { .. })
    ));

    let lenient = strict.with_strict(false);
    assert_eq!(lenient.resolve("gfx/icon").unwrap(), ResolutionResult::NotFound);
    assert!(lenient.resolve("gfx/icon.cfg").unwrap().resolved().is_some());
}
