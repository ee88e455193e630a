//! QuakeGraph Core - asset dependency graphs for Quake III content trees
//!
//! This crate provides the scanning and graph construction pipeline:
//! - Binary and text extractors for maps, models, shader scripts, skins and
//!   bytecode modules
//! - A file corpus and a reference resolver tolerant of missing extensions
//! - A game state snapshot persisted between runs
//! - Graph assembly with shader pass-through expansion

pub mod builder;
pub mod corpus;
pub mod disassembler;
pub mod discovery;
pub mod formats;
pub mod graph;
pub mod loader;
pub mod progress;
pub mod resolver;
pub mod state;

// Graph re-exports
pub use graph::{
    AssetGraph, Edge, EdgeData, EdgeKind, GraphExport, Vertex, VertexKind, GRAPH_SCHEMA_VERSION,
};

// Builder re-exports
pub use builder::{
    AssembleError, AssemblerConfig, BuildExport, BuildOutput, ExpansionMode, GraphAssembler,
};

// Corpus and resolution re-exports
pub use corpus::{slash_path, BaseCorpus, CorpusError, FileCorpus};
pub use resolver::{
    normalize_reference, reference_extension, ResolutionResult, ResolveError, ResolvedMatch,
    Resolver, TypeGroup,
};

// Scanning and loading re-exports
pub use disassembler::{
    CommandDisassembler, DisassembleError, Disassembler, LiteralTableDisassembler,
};
pub use discovery::{
    ensure_disassembly, DiscoveredProject, DisassemblyReport, ProjectScanner, ScanConfig,
    ScanError,
};
pub use formats::{AssetKind, AssetRecord, ExtractError, Extractor, ReferenceMap};
pub use loader::{GameLoader, LoadError, LoadStats};
pub use progress::{NoProgress, ProgressSink, ProgressStep};
pub use state::{GameState, StateError, SNAPSHOT_FILE, STATE_SCHEMA_VERSION};
