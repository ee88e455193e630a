//! Asset Graph
//!
//! Directed dependency graph over two partially overlapping namespaces: file
//! paths and logical shader names, plus game entity class names.
//!
//! This module provides the `AssetGraph` implementation using petgraph's
//! `StableGraph`, with an id index so that vertex lookup is O(1) and
//! requesting an existing id never creates a second vertex.

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Schema version of the exported graph document
pub const GRAPH_SCHEMA_VERSION: &str = "1.0";

// ============================================================================
// Edge Kinds
// ============================================================================

/// How an edge came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    /// Direct extraction edge (map → model, model → shader, ...)
    Reference,
    /// Shader script file → shader it defines
    Defines,
    /// Added by shader pass-through expansion
    PassThrough,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Reference => "REFERENCE",
            EdgeKind::Defines => "DEFINES",
            EdgeKind::PassThrough => "PASS_THROUGH",
        }
    }
}

// ============================================================================
// Vertices
// ============================================================================

/// Namespace of a vertex id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexKind {
    File,
    Shader,
    Entity,
}

impl VertexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VertexKind::File => "file",
            VertexKind::Shader => "shader",
            VertexKind::Entity => "entity",
        }
    }
}

/// A vertex in the asset graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    /// File path, shader name or entity class name
    pub id: String,
    /// Display name
    pub name: String,
    pub kind: VertexKind,
}

impl Vertex {
    pub fn new(id: impl Into<String>, kind: VertexKind) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
        }
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self::new(path, VertexKind::File)
    }

    pub fn shader(name: impl Into<String>) -> Self {
        Self::new(name, VertexKind::Shader)
    }

    pub fn entity(classname: impl Into<String>) -> Self {
        Self::new(classname, VertexKind::Entity)
    }

    pub fn is_shader(&self) -> bool {
        self.kind == VertexKind::Shader
    }
}

// ============================================================================
// Edges
// ============================================================================

/// Edge weight stored in petgraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeData {
    pub kind: EdgeKind,
}

impl EdgeData {
    pub fn reference() -> Self {
        Self {
            kind: EdgeKind::Reference,
        }
    }

    pub fn defines() -> Self {
        Self {
            kind: EdgeKind::Defines,
        }
    }

    pub fn pass_through() -> Self {
        Self {
            kind: EdgeKind::PassThrough,
        }
    }
}

/// An edge by vertex id, as exported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

/// Serializable form of the whole graph, sorted for stable output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphExport {
    pub schema_version: String,
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
}

// ============================================================================
// AssetGraph
// ============================================================================

/// A petgraph-based asset dependency graph.
///
/// Vertices are deduplicated by id. At most one edge exists per ordered
/// vertex pair and self-edges are never stored.
#[derive(Debug, Clone)]
pub struct AssetGraph {
    graph: StableGraph<Vertex, EdgeData, petgraph::Directed>,

    /// Map from vertex id to NodeIndex
    node_index_map: HashMap<String, NodeIndex>,
}

impl Default for AssetGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetGraph {
    pub fn new() -> Self {
        Self {
            graph: StableGraph::new(),
            node_index_map: HashMap::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Vertex Operations
    // ------------------------------------------------------------------------

    /// Return the index of the vertex with `vertex.id`, adding it if absent.
    ///
    /// An existing vertex is returned unchanged, whatever kind was requested.
    pub fn get_or_add_vertex(&mut self, vertex: Vertex) -> NodeIndex {
        if let Some(&idx) = self.node_index_map.get(&vertex.id) {
            return idx;
        }
        let id = vertex.id.clone();
        let idx = self.graph.add_node(vertex);
        self.node_index_map.insert(id, idx);
        idx
    }

    pub fn get_vertex(&self, id: &str) -> Option<&Vertex> {
        self.node_index_map
            .get(id)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    pub fn get_vertex_by_index(&self, idx: NodeIndex) -> Option<&Vertex> {
        self.graph.node_weight(idx)
    }

    pub fn get_vertex_index(&self, id: &str) -> Option<NodeIndex> {
        self.node_index_map.get(id).copied()
    }

    pub fn contains_vertex(&self, id: &str) -> bool {
        self.node_index_map.contains_key(id)
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn iter_vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.graph.node_weights()
    }

    pub fn vertices_by_kind(&self, kind: VertexKind) -> impl Iterator<Item = &Vertex> {
        self.graph.node_weights().filter(move |v| v.kind == kind)
    }

    /// Sorted set of vertex ids.
    pub fn vertex_ids(&self) -> BTreeSet<String> {
        self.node_index_map.keys().cloned().collect()
    }

    // ------------------------------------------------------------------------
    // Edge Operations
    // ------------------------------------------------------------------------

    /// Add an edge between two vertices by id.
    ///
    /// Returns `None` if either vertex is missing or the ids are equal. An
    /// already connected pair returns the existing edge untouched.
    pub fn add_edge(&mut self, source_id: &str, target_id: &str, data: EdgeData) -> Option<EdgeIndex> {
        let source = self.get_vertex_index(source_id)?;
        let target = self.get_vertex_index(target_id)?;
        self.add_edge_by_index(source, target, data)
    }

    /// Add an edge using NodeIndices directly, with the same rules as
    /// [`AssetGraph::add_edge`].
    pub fn add_edge_by_index(
        &mut self,
        source: NodeIndex,
        target: NodeIndex,
        data: EdgeData,
    ) -> Option<EdgeIndex> {
        if source == target
            || !self.graph.contains_node(source)
            || !self.graph.contains_node(target)
        {
            return None;
        }
        if let Some(existing) = self.graph.find_edge(source, target) {
            return Some(existing);
        }
        Some(self.graph.add_edge(source, target, data))
    }

    pub fn has_edge(&self, source_id: &str, target_id: &str) -> bool {
        match (
            self.get_vertex_index(source_id),
            self.get_vertex_index(target_id),
        ) {
            (Some(s), Some(t)) => self.graph.find_edge(s, t).is_some(),
            _ => false,
        }
    }

    pub fn edge_kind(&self, source_id: &str, target_id: &str) -> Option<EdgeKind> {
        let s = self.get_vertex_index(source_id)?;
        let t = self.get_vertex_index(target_id)?;
        let e = self.graph.find_edge(s, t)?;
        self.graph.edge_weight(e).map(|d| d.kind)
    }

    /// Get all incoming edges for a vertex (edges where it is the target)
    pub fn incoming_edges(&self, id: &str) -> impl Iterator<Item = (&Vertex, &EdgeData)> {
        let idx = self.node_index_map.get(id).copied();
        self.graph
            .edges_directed(
                idx.unwrap_or(NodeIndex::new(usize::MAX)),
                Direction::Incoming,
            )
            .filter_map(move |edge_ref| {
                let source = self.graph.node_weight(edge_ref.source())?;
                Some((source, edge_ref.weight()))
            })
    }

    /// Get all outgoing edges from a vertex (edges where it is the source)
    pub fn outgoing_edges(&self, id: &str) -> impl Iterator<Item = (&Vertex, &EdgeData)> {
        let idx = self.node_index_map.get(id).copied();
        self.graph
            .edges_directed(
                idx.unwrap_or(NodeIndex::new(usize::MAX)),
                Direction::Outgoing,
            )
            .filter_map(move |edge_ref| {
                let target = self.graph.node_weight(edge_ref.target())?;
                Some((target, edge_ref.weight()))
            })
    }

    /// Neighbor indices and edge kinds in one direction, collected so the
    /// caller may mutate the graph afterwards.
    pub fn neighbors_by_index(&self, idx: NodeIndex, direction: Direction) -> Vec<(NodeIndex, EdgeKind)> {
        self.graph
            .edges_directed(idx, direction)
            .map(|e| {
                let other = match direction {
                    Direction::Incoming => e.source(),
                    Direction::Outgoing => e.target(),
                };
                (other, e.weight().kind)
            })
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterate over all edges as id-based [`Edge`]s.
    pub fn iter_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.graph.edge_references().filter_map(move |edge_ref| {
            let source = self.graph.node_weight(edge_ref.source())?;
            let target = self.graph.node_weight(edge_ref.target())?;
            Some(Edge {
                source: source.id.clone(),
                target: target.id.clone(),
                kind: edge_ref.weight().kind,
            })
        })
    }

    pub fn edges_by_kind(&self, kind: EdgeKind) -> impl Iterator<Item = Edge> + '_ {
        self.iter_edges().filter(move |e| e.kind == kind)
    }

    /// All edge index pairs, in insertion order.
    pub fn edge_pairs(&self) -> Vec<(NodeIndex, NodeIndex, EdgeKind)> {
        self.graph
            .edge_references()
            .map(|e| (e.source(), e.target(), e.weight().kind))
            .collect()
    }

    /// Sorted, serializable snapshot of the graph.
    pub fn export(&self) -> GraphExport {
        let mut vertices: Vec<Vertex> = self.iter_vertices().cloned().collect();
        vertices.sort_by(|a, b| a.id.cmp(&b.id));
        let mut edges: Vec<Edge> = self.iter_edges().collect();
        edges.sort();
        GraphExport {
            schema_version: GRAPH_SCHEMA_VERSION.to_string(),
            vertices,
            edges,
        }
    }
}
