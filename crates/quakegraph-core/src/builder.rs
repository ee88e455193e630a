//! Graph Assembler
//!
//! Turns a [`GameState`] into an [`AssetGraph`]. Every distinct reference
//! token is looked up once, as a file and as a shader, then edges are added
//! per reference map in a fixed order. Edges into a shader pull in whatever
//! feeds that shader (pass-through expansion).
//!
//! ## Usage
//!
//! ```ignore
//! use quakegraph_core::builder::{AssemblerConfig, GraphAssembler};
//! use quakegraph_core::progress::NoProgress;
//!
//! let assembler = GraphAssembler::new(AssemblerConfig::default());
//! let output = assembler.assemble(&state, &state.everything, &base, &mut NoProgress)?;
//! println!("{} vertices", output.graph.vertex_count());
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::stable_graph::NodeIndex;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::corpus::{BaseCorpus, FileCorpus};
use crate::graph::{AssetGraph, EdgeData, EdgeKind, GraphExport, Vertex, VertexKind};
use crate::progress::{steps, ProgressSink, ProgressStep};
use crate::resolver::{
    normalize_reference, reference_extension, ResolutionResult, ResolveError, Resolver, TypeGroup,
};
use crate::state::GameState;

// ============================================================================
// Errors
// ============================================================================

/// Errors that abort a graph build.
#[derive(Debug, Error)]
pub enum AssembleError {
    /// An unknown extension or an ambiguous reference; the content must be
    /// disambiguated by hand
    #[error("Graph build aborted: {0}")]
    Resolve(#[from] ResolveError),
}

// ============================================================================
// Assembler Configuration
// ============================================================================

/// How far shader pass-through expansion is carried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpansionMode {
    /// Expand each edge once, against the edges present when it is added
    SinglePass,
    /// Repeat expansion over the whole graph until no edge is added
    #[default]
    FixedPoint,
}

/// Configuration for the graph assembler.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    pub expansion: ExpansionMode,
    /// Treat ambiguous references as errors rather than as not found
    pub strict_ambiguity: bool,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            expansion: ExpansionMode::FixedPoint,
            strict_ambiguity: true,
        }
    }
}

// ============================================================================
// Build Output
// ============================================================================

/// The graph plus diagnostic lists, each sorted and deduplicated.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub graph: AssetGraph,
    /// References that matched nothing
    pub not_found: Vec<String>,
    /// References found only in the base corpus
    pub baseq3: Vec<String>,
    /// Extension-less references resolved by assuming an image
    pub assumed_images: Vec<String>,
    /// Corpus file extensions outside every type group
    pub unknown_types: Vec<String>,
}

/// Serializable form of [`BuildOutput`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildExport {
    #[serde(flatten)]
    pub graph: GraphExport,
    pub not_found: Vec<String>,
    pub baseq3: Vec<String>,
    pub assumed_images: Vec<String>,
    pub unknown_types: Vec<String>,
}

impl BuildOutput {
    pub fn export(&self) -> BuildExport {
        BuildExport {
            graph: self.graph.export(),
            not_found: self.not_found.clone(),
            baseq3: self.baseq3.clone(),
            assumed_images: self.assumed_images.clone(),
            unknown_types: self.unknown_types.clone(),
        }
    }
}

// ============================================================================
// Graph Assembler
// ============================================================================

/// Builds asset graphs from game state.
#[derive(Debug, Clone, Default)]
pub struct GraphAssembler {
    config: AssemblerConfig,
}

impl GraphAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Assemble the graph for `state` against the current `corpus`.
    pub fn assemble(
        &self,
        state: &GameState,
        corpus: &FileCorpus,
        base: &BaseCorpus,
        progress: &mut dyn ProgressSink,
    ) -> Result<BuildOutput, AssembleError> {
        let resolver = Resolver::new(corpus, base).with_strict(self.config.strict_ambiguity);
        let mut run = AssemblyRun::new(resolver, corpus);
        let module_count = state.qvms.len();
        let total = steps::COUNT + module_count;

        // File lookups
        let file_tokens = distinct(
            values(&state.map_entities)
                .chain(keys(&state.qvms))
                .chain(keys(&state.maps))
                .chain(keys(&state.scripts))
                .chain(keys(&state.models))
                .chain(keys(&state.skins))
                .chain(values(&state.shaders))
                .chain(values(&state.qvms)),
        );
        progress.report(&[ProgressStep::pipeline(
            steps::COUNT - 2 + module_count,
            total,
            steps::VERTICES,
        )]);
        debug!("{} distinct file references", file_tokens.len());
        for token in &file_tokens {
            if let Some(idx) = run.lookup_file(token) {
                run.file_lookups.insert(token.clone(), idx);
            }
        }

        // Shader lookups
        let known_shaders = ShaderIndex::new(values(&state.scripts));
        let shader_tokens = distinct(
            values(&state.entities)
                .chain(values(&state.maps))
                .chain(values(&state.models))
                .chain(values(&state.scripts))
                .chain(values(&state.skins))
                .chain(values(&state.qvms)),
        );
        progress.report(&[ProgressStep::pipeline(
            steps::COUNT - 1 + module_count,
            total,
            steps::GRAPH_SHADERS,
        )]);
        debug!("{} distinct shader references", shader_tokens.len());
        for token in &shader_tokens {
            let idx = match known_shaders.find(token) {
                Some(name) => Some(run.graph.get_or_add_vertex(Vertex::shader(name))),
                None => run.lookup_file(token),
            };
            if let Some(idx) = idx {
                run.shader_lookups.insert(token.clone(), idx);
            }
        }
        run.classify(file_tokens.iter().chain(&shader_tokens))?;

        // Edges
        for (script, names) in &state.scripts {
            run.link_source(Vertex::file(script), names, Lookup::Shader, EdgeData::defines());
        }
        for (shader, textures) in &state.shaders {
            run.link_source(Vertex::shader(shader), textures, Lookup::File, EdgeData::reference());
        }
        for (classname, refs) in &state.entities {
            run.link_source(Vertex::entity(classname), refs, Lookup::Both, EdgeData::reference());
        }
        for (map, refs) in &state.map_entities {
            run.link_source(Vertex::file(map), refs, Lookup::File, EdgeData::reference());
        }
        for (map, shaders) in &state.maps {
            run.link_source(Vertex::file(map), shaders, Lookup::Shader, EdgeData::reference());
        }
        for (model, shaders) in &state.models {
            run.link_source(Vertex::file(model), shaders, Lookup::Shader, EdgeData::reference());
        }
        for (skin, shaders) in &state.skins {
            run.link_source(Vertex::file(skin), shaders, Lookup::Shader, EdgeData::reference());
        }
        for (module, refs) in &state.qvms {
            run.link_source(Vertex::file(module), refs, Lookup::Both, EdgeData::reference());
        }

        if self.config.expansion == ExpansionMode::FixedPoint {
            let rounds = run.expand_to_fixed_point();
            debug!("Pass-through expansion settled after {} rounds", rounds);
        }

        let output = run.finish(corpus);
        info!(
            "Graph has {} vertices and {} edges ({} pass-through); {} not found, {} in base corpus",
            output.graph.vertex_count(),
            output.graph.edge_count(),
            output.graph.edges_by_kind(EdgeKind::PassThrough).count(),
            output.not_found.len(),
            output.baseq3.len()
        );
        Ok(output)
    }
}

// ============================================================================
// Assembly State
// ============================================================================

/// Which lookup tables a reference map's values go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    File,
    Shader,
    Both,
}

/// Where a token landed in the file corpus.
#[derive(Debug, Clone)]
enum FileOutcome {
    Vertex(NodeIndex),
    BaseCorpus,
    NotFound,
    Failed(ResolveError),
}

/// Mutable state of one assembly.
struct AssemblyRun<'a> {
    resolver: Resolver<'a>,
    corpus: &'a FileCorpus,
    graph: AssetGraph,
    file_outcomes: HashMap<String, FileOutcome>,
    file_lookups: HashMap<String, NodeIndex>,
    shader_lookups: HashMap<String, NodeIndex>,
    not_found: Vec<String>,
    baseq3: Vec<String>,
    assumed_images: Vec<String>,
}

impl<'a> AssemblyRun<'a> {
    fn new(resolver: Resolver<'a>, corpus: &'a FileCorpus) -> Self {
        Self {
            resolver,
            corpus,
            graph: AssetGraph::new(),
            file_outcomes: HashMap::new(),
            file_lookups: HashMap::new(),
            shader_lookups: HashMap::new(),
            not_found: Vec::new(),
            baseq3: Vec::new(),
            assumed_images: Vec::new(),
        }
    }

    /// File vertex for a token: an exact corpus path, or a resolved match.
    /// Misses and resolver errors are kept per token for [`Self::classify`].
    fn lookup_file(&mut self, token: &str) -> Option<NodeIndex> {
        if let Some(outcome) = self.file_outcomes.get(token) {
            return match outcome {
                FileOutcome::Vertex(idx) => Some(*idx),
                _ => None,
            };
        }
        let outcome = if self.corpus.contains(token) {
            FileOutcome::Vertex(self.graph.get_or_add_vertex(Vertex::file(token)))
        } else {
            match self.resolver.resolve(token) {
                Ok(ResolutionResult::Resolved(m)) => {
                    if m.assumed_group == Some(TypeGroup::Image) {
                        self.assumed_images.push(token.to_string());
                    }
                    FileOutcome::Vertex(self.graph.get_or_add_vertex(Vertex::file(m.path)))
                }
                Ok(ResolutionResult::FoundInBaseCorpus) => FileOutcome::BaseCorpus,
                Ok(ResolutionResult::NotFound) => FileOutcome::NotFound,
                Err(ResolveError::EmptyReference) => return None,
                Err(e) => FileOutcome::Failed(e),
            }
        };
        let idx = match outcome {
            FileOutcome::Vertex(idx) => Some(idx),
            _ => None,
        };
        self.file_outcomes.insert(token.to_string(), outcome);
        idx
    }

    /// Give every token exactly one outcome once both lookup passes ran.
    /// A token bound to any vertex is resolved; otherwise a resolver error
    /// aborts, and the rest are base-corpus or not-found.
    fn classify<'t>(
        &mut self,
        tokens: impl Iterator<Item = &'t String>,
    ) -> Result<(), AssembleError> {
        let tokens: BTreeSet<&String> = tokens.collect();
        for token in tokens {
            if self.file_lookups.contains_key(token) || self.shader_lookups.contains_key(token) {
                continue;
            }
            match self.file_outcomes.get(token) {
                Some(FileOutcome::Failed(e)) => return Err(e.clone().into()),
                Some(FileOutcome::BaseCorpus) => self.baseq3.push(token.clone()),
                Some(FileOutcome::NotFound) => self.not_found.push(token.clone()),
                Some(FileOutcome::Vertex(_)) | None => {}
            }
        }
        Ok(())
    }

    fn targets(&self, refs: &[String], lookup: Lookup) -> Vec<NodeIndex> {
        let mut targets = Vec::new();
        for r in refs {
            if matches!(lookup, Lookup::File | Lookup::Both) {
                targets.extend(self.file_lookups.get(r).copied());
            }
            if matches!(lookup, Lookup::Shader | Lookup::Both) {
                targets.extend(self.shader_lookups.get(r).copied());
            }
        }
        targets
    }

    /// Link `source` to every resolved reference. The source vertex is only
    /// materialized when at least one reference resolved.
    fn link_source(&mut self, source: Vertex, refs: &[String], lookup: Lookup, data: EdgeData) {
        let targets = self.targets(refs, lookup);
        if targets.is_empty() {
            return;
        }
        let source = self.graph.get_or_add_vertex(source);
        for target in targets {
            self.graph.add_edge_by_index(source, target, data);
            if data.kind != EdgeKind::Defines {
                self.expand_shader_edge(source, target);
            }
        }
    }

    /// Vertices a shader pulls in: its outbound targets, shaders pointing at
    /// it and the scripts defining it.
    fn feeders(&self, shader: NodeIndex) -> Vec<NodeIndex> {
        let mut feeders: Vec<NodeIndex> = self
            .graph
            .neighbors_by_index(shader, Direction::Outgoing)
            .into_iter()
            .map(|(v, _)| v)
            .collect();
        feeders.extend(
            self.graph
                .neighbors_by_index(shader, Direction::Incoming)
                .into_iter()
                .filter(|&(v, kind)| kind == EdgeKind::Defines || self.is_shader(v))
                .map(|(v, _)| v),
        );
        feeders
    }

    fn is_shader(&self, idx: NodeIndex) -> bool {
        self.graph
            .get_vertex_by_index(idx)
            .map(|v| v.kind == VertexKind::Shader)
            .unwrap_or(false)
    }

    /// For `source → target` with a shader target, add `source → feeder`.
    /// Returns the number of edges added.
    fn expand_shader_edge(&mut self, source: NodeIndex, target: NodeIndex) -> usize {
        if !self.is_shader(target) {
            return 0;
        }
        let before = self.graph.edge_count();
        for feeder in self.feeders(target) {
            self.graph
                .add_edge_by_index(source, feeder, EdgeData::pass_through());
        }
        self.graph.edge_count() - before
    }

    /// Repeat expansion until the graph stops growing. Besides shader
    /// feeders, a pass-through edge `X → t` is carried to every `A → X`.
    fn expand_to_fixed_point(&mut self) -> usize {
        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut added = 0;
            for (source, target, kind) in self.graph.edge_pairs() {
                if kind == EdgeKind::Defines {
                    continue;
                }
                added += self.expand_shader_edge(source, target);
                let before = self.graph.edge_count();
                for (t, k) in self.graph.neighbors_by_index(target, Direction::Outgoing) {
                    if k == EdgeKind::PassThrough {
                        self.graph
                            .add_edge_by_index(source, t, EdgeData::pass_through());
                    }
                }
                added += self.graph.edge_count() - before;
            }
            if added == 0 {
                return rounds;
            }
        }
    }

    fn finish(self, corpus: &FileCorpus) -> BuildOutput {
        let mut unknown: Vec<String> = corpus
            .paths()
            .iter()
            .filter_map(|p| reference_extension(p))
            .filter(|ext| TypeGroup::from_extension(ext).is_none())
            .map(|ext| format!(".{ext}"))
            .collect();
        unknown.sort();
        unknown.dedup();

        BuildOutput {
            graph: self.graph,
            not_found: sorted_dedup(self.not_found),
            baseq3: sorted_dedup(self.baseq3),
            assumed_images: sorted_dedup(self.assumed_images),
            unknown_types: unknown,
        }
    }
}

/// Known shader names, matched exactly and then by normalized name.
struct ShaderIndex {
    exact: HashSet<String>,
    normalized: BTreeMap<String, String>,
}

impl ShaderIndex {
    fn new<'s>(names: impl Iterator<Item = &'s String>) -> Self {
        let mut exact = HashSet::new();
        let mut normalized = BTreeMap::new();
        let mut sorted: Vec<&String> = names.collect();
        sorted.sort();
        for name in sorted {
            exact.insert(name.clone());
            normalized
                .entry(normalize_reference(name))
                .or_insert_with(|| name.clone());
        }
        Self { exact, normalized }
    }

    fn find(&self, token: &str) -> Option<String> {
        if self.exact.contains(token) {
            return Some(token.to_string());
        }
        let key = normalize_reference(token);
        if key.is_empty() {
            return None;
        }
        self.normalized.get(&key).cloned()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn keys(map: &BTreeMap<String, Vec<String>>) -> impl Iterator<Item = &String> {
    map.keys()
}

fn values(map: &BTreeMap<String, Vec<String>>) -> impl Iterator<Item = &String> {
    map.values().flatten()
}

/// First occurrence of every non-empty token, in order.
fn distinct<'s>(tokens: impl Iterator<Item = &'s String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens
        .filter(|t| !t.is_empty() && seen.insert(t.as_str()))
        .cloned()
        .collect()
}

fn sorted_dedup(mut items: Vec<String>) -> Vec<String> {
    items.sort();
    items.dedup();
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn refs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn state_with(corpus: &[&str]) -> GameState {
        GameState::new(PathBuf::from("/q3"), FileCorpus::new(refs(corpus)))
    }

    fn assemble(state: &GameState, config: AssemblerConfig) -> BuildOutput {
        GraphAssembler::new(config)
            .assemble(state, &state.everything, &BaseCorpus::empty(), &mut NoProgress)
            .unwrap()
    }

    #[test]
    fn test_distinct_keeps_first_occurrence() {
        let a = refs(&["b", "", "a", "b"]);
        assert_eq!(distinct(a.iter()), vec!["b", "a"]);
    }

    #[test]
    fn test_shader_index_matches_normalized() {
        let names = refs(&["textures/base/Floor", "player_skin"]);
        let index = ShaderIndex::new(names.iter());
        assert_eq!(index.find("player_skin"), Some("player_skin".to_string()));
        assert_eq!(
            index.find("textures\\base\\floor.tga"),
            Some("textures/base/Floor".to_string())
        );
        assert_eq!(index.find("textures/base/wall"), None);
        assert_eq!(index.find(""), None);
    }

    #[test]
    fn test_pass_through_copies_shader_sources() {
        // M → S with T → S (T a shader) gives M → T
        let corpus = FileCorpus::new(refs(&["/q3/maps/m.bsp"]));
        let base = BaseCorpus::empty();
        let mut run = AssemblyRun::new(Resolver::new(&corpus, &base), &corpus);
        let t = run.graph.get_or_add_vertex(Vertex::shader("T"));
        let s = run.graph.get_or_add_vertex(Vertex::shader("S"));
        let m = run.graph.get_or_add_vertex(Vertex::file("/q3/maps/m.bsp"));
        run.graph.add_edge_by_index(t, s, EdgeData::reference());

        run.graph.add_edge_by_index(m, s, EdgeData::reference());
        assert_eq!(run.expand_shader_edge(m, s), 1);

        assert_eq!(
            run.graph.edge_kind("/q3/maps/m.bsp", "T"),
            Some(EdgeKind::PassThrough)
        );
        assert_eq!(run.expand_shader_edge(m, s), 0);
        assert_eq!(run.expand_shader_edge(t, m), 0);
    }

    #[test]
    fn test_defines_and_textures() {
        let mut state = state_with(&["/q3/scripts/a.shader", "/q3/textures/a.tga"]);
        state
            .scripts
            .insert("/q3/scripts/a.shader".to_string(), refs(&["a_shader"]));
        state
            .shaders
            .insert("a_shader".to_string(), refs(&["textures/a.tga"]));

        let output = assemble(&state, AssemblerConfig::default());
        let graph = &output.graph;
        assert_eq!(
            graph.edge_kind("/q3/scripts/a.shader", "a_shader"),
            Some(EdgeKind::Defines)
        );
        assert_eq!(
            graph.edge_kind("a_shader", "/q3/textures/a.tga"),
            Some(EdgeKind::Reference)
        );
        assert!(!graph.has_edge("/q3/scripts/a.shader", "/q3/textures/a.tga"));
        assert!(output.not_found.is_empty());
    }

    #[test]
    fn test_single_pass_versus_fixed_point() {
        let mut state = state_with(&[
            "/q3/maps/arena.bsp",
            "/q3/models/player.md3",
            "/q3/scripts/player.shader",
            "/q3/textures/player.tga",
        ]);
        state.map_entities.insert(
            "/q3/maps/arena.bsp".to_string(),
            refs(&["models/player.md3"]),
        );
        state.models.insert(
            "/q3/models/player.md3".to_string(),
            refs(&["player_skin"]),
        );
        state.scripts.insert(
            "/q3/scripts/player.shader".to_string(),
            refs(&["player_skin"]),
        );
        state
            .shaders
            .insert("player_skin".to_string(), refs(&["textures/player.tga"]));

        let single = assemble(
            &state,
            AssemblerConfig {
                expansion: ExpansionMode::SinglePass,
                ..Default::default()
            },
        );
        assert!(single
            .graph
            .has_edge("/q3/models/player.md3", "/q3/textures/player.tga"));
        assert!(!single
            .graph
            .has_edge("/q3/maps/arena.bsp", "/q3/textures/player.tga"));

        let fixed = assemble(&state, AssemblerConfig::default());
        assert_eq!(
            fixed
                .graph
                .edge_kind("/q3/maps/arena.bsp", "/q3/textures/player.tga"),
            Some(EdgeKind::PassThrough)
        );
        assert_eq!(fixed.graph.vertex_ids(), single.graph.vertex_ids());
    }

    #[test]
    fn test_entities_need_a_resolved_reference() {
        let mut state = state_with(&["/q3/models/armor.md3", "/q3/vm/cgame.qvm"]);
        state
            .entities
            .insert("item_armor".to_string(), refs(&["models/armor.md3"]));
        state
            .entities
            .insert("item_ghost".to_string(), refs(&["models/ghost.md3"]));
        state
            .qvms
            .insert("/q3/vm/cgame.qvm".to_string(), refs(&["models/armor.md3"]));

        let output = assemble(&state, AssemblerConfig::default());
        assert!(output.graph.has_edge("item_armor", "/q3/models/armor.md3"));
        assert!(!output.graph.contains_vertex("item_ghost"));
        assert!(output.graph.has_edge("/q3/vm/cgame.qvm", "/q3/models/armor.md3"));
        assert_eq!(output.not_found, vec!["models/ghost.md3"]);
    }

    #[test]
    fn test_diagnostics() {
        let mut state = state_with(&[
            "/q3/maps/m.bsp",
            "/q3/textures/wall.tga",
            "/q3/textures/wall.wav",
            "/q3/docs/notes.xyz",
        ]);
        state.maps.insert(
            "/q3/maps/m.bsp".to_string(),
            refs(&["textures/wall", "textures/sky", "textures/missing"]),
        );
        let base = BaseCorpus::from_paths(["/baseq3/textures/sky.tga"]);

        let output = GraphAssembler::default()
            .assemble(&state, &state.everything, &base, &mut NoProgress)
            .unwrap();
        assert!(output.graph.has_edge("/q3/maps/m.bsp", "/q3/textures/wall.tga"));
        assert_eq!(output.assumed_images, vec!["textures/wall"]);
        assert_eq!(output.baseq3, vec!["textures/sky"]);
        assert_eq!(output.not_found, vec!["textures/missing"]);
        assert_eq!(output.unknown_types, vec![".xyz"]);

        let json = serde_json::to_value(output.export()).unwrap();
        assert_eq!(json["baseq3"][0], "textures/sky");
        assert!(json["notFound"].is_array());
        assert!(json["vertices"].is_array());
    }

    #[test]
    fn test_module_string_naming_a_shader_is_resolved_once() {
        let mut state = state_with(&[
            "/q3/scripts/a.shader",
            "/q3/vm/cgame.qvm",
            "/q3/textures/x.tga",
            "/q3/a/shader_x.tga",
            "/q3/b/shader_x.jpg",
        ]);
        state
            .scripts
            .insert("/q3/scripts/a.shader".to_string(), refs(&["shader_x"]));
        state
            .shaders
            .insert("shader_x".to_string(), refs(&["textures/x.tga"]));
        state
            .qvms
            .insert("/q3/vm/cgame.qvm".to_string(), refs(&["shader_x", "sound/gone.wav"]));

        // the file lookup of shader_x is ambiguous, the shader lookup is not
        let output = assemble(&state, AssemblerConfig::default());
        assert!(output.graph.has_edge("/q3/vm/cgame.qvm", "shader_x"));
        assert!(output
            .graph
            .has_edge("/q3/vm/cgame.qvm", "/q3/textures/x.tga"));
        assert_eq!(output.not_found, vec!["sound/gone.wav"]);
        assert!(output.baseq3.is_empty());
    }

    #[test]
    fn test_ambiguity_aborts_build() {
        let mut state = state_with(&["/q3/maps/m.bsp", "/a/textures/x.tga", "/b/textures/x.jpg"]);
        state
            .maps
            .insert("/q3/maps/m.bsp".to_string(), refs(&["textures/x"]));

        let err = GraphAssembler::default()
            .assemble(&state, &state.everything, &BaseCorpus::empty(), &mut NoProgress)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("textures/x"));
        assert!(message.contains("image"));

        let lenient = assemble(
            &state,
            AssemblerConfig {
                strict_ambiguity: false,
                ..Default::default()
            },
        );
        assert_eq!(lenient.not_found, vec!["textures/x"]);
    }

    #[test]
    fn test_progress_labels() {
        let state = state_with(&["/q3/a.txt"]);
        let mut labels = Vec::new();
        GraphAssembler::default()
            .assemble(
                &state,
                &state.everything,
                &BaseCorpus::empty(),
                &mut |s: &[ProgressStep]| labels.extend(s.iter().map(|p| p.label.clone())),
            )
            .unwrap();
        assert_eq!(labels, vec![steps::VERTICES, steps::GRAPH_SHADERS]);
    }
}
