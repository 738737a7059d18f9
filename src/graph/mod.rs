//! Mutable multimodal graph
//!
//! Vertices and edges live in arenas addressed by [`VertexId`] / [`EdgeId`].
//! Vertices are never removed. Edges move through [`EdgeState`]s, and only
//! `Live` edges are referenced from the per-vertex adjacency lists, so the
//! graph's edge set is exactly the set of live edges.

pub mod annotation;
pub mod edge;
pub mod vertex;

use chrono::{DateTime, Utc};
use geo::Coord;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::GraphError;

pub use annotation::{Annotation, AnnotationCategory, AnnotationLog};
pub use edge::{planar_length, Edge, EdgeKind, EdgeState, Permission, StreetEdge};
pub use vertex::{TransitStop, Vertex, VertexClass, VertexKind, SPLIT_LABEL_PREFIX};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

impl VertexId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl EdgeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    /// Set by the stage that loads street data
    pub has_streets: bool,
    /// Set by the stage that loads transit or other facility data
    pub has_transit: bool,
    annotations: AnnotationLog,
    built_at: Option<DateTime<Utc>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------
    // Vertices
    // ---------------------------------------------------------------

    pub fn add_vertex(&mut self, label: impl Into<String>, coord: Coord<f64>, kind: VertexKind) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Vertex {
            id,
            label: label.into(),
            coord,
            kind,
            outgoing: Vec::new(),
            incoming: Vec::new(),
        });
        id
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.index())
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> Option<&mut Vertex> {
        self.vertices.get_mut(id.index())
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter()
    }

    /// Stable copy of the current vertex ids of one class.
    ///
    /// Callers that add vertices or edges while walking a class of vertices
    /// iterate this snapshot, never the live arena.
    pub fn snapshot_vertices(&self, class: VertexClass) -> Vec<VertexId> {
        self.vertices
            .iter()
            .filter(|v| v.class() == class)
            .map(|v| v.id)
            .collect()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    // ---------------------------------------------------------------
    // Edges
    // ---------------------------------------------------------------

    /// Add an edge and attach it to its endpoints immediately
    pub fn add_edge(&mut self, from: VertexId, to: VertexId, kind: EdgeKind) -> Result<EdgeId, GraphError> {
        let id = self.push_edge(from, to, kind, EdgeState::Pending)?;
        self.attach_edge(id)?;
        Ok(id)
    }

    /// Add an edge to the arena without attaching it
    pub fn add_pending_edge(&mut self, from: VertexId, to: VertexId, kind: EdgeKind) -> Result<EdgeId, GraphError> {
        self.push_edge(from, to, kind, EdgeState::Pending)
    }

    fn push_edge(&mut self, from: VertexId, to: VertexId, kind: EdgeKind, state: EdgeState) -> Result<EdgeId, GraphError> {
        for endpoint in [from, to] {
            if self.vertex(endpoint).is_none() {
                return Err(GraphError::UnknownVertex(endpoint));
            }
        }
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            id,
            from,
            to,
            kind,
            state,
        });
        Ok(id)
    }

    /// Pending -> Live: insert into both endpoints' adjacency lists
    pub fn attach_edge(&mut self, id: EdgeId) -> Result<(), GraphError> {
        let (from, to) = self.transition(id, EdgeState::Pending, EdgeState::Live)?;
        self.vertices[from.index()].outgoing.push(id);
        self.vertices[to.index()].incoming.push(id);
        Ok(())
    }

    /// Live -> Removed: drop from both endpoints' adjacency lists
    pub fn detach_edge(&mut self, id: EdgeId) -> Result<(), GraphError> {
        let (from, to) = self.transition(id, EdgeState::Live, EdgeState::Removed)?;
        self.vertices[from.index()].outgoing.retain(|&e| e != id);
        self.vertices[to.index()].incoming.retain(|&e| e != id);
        Ok(())
    }

    /// Pending -> Removed: an edge that will never be attached
    pub fn discard_edge(&mut self, id: EdgeId) -> Result<(), GraphError> {
        self.transition(id, EdgeState::Pending, EdgeState::Removed)?;
        Ok(())
    }

    fn transition(&mut self, id: EdgeId, expected: EdgeState, next: EdgeState) -> Result<(VertexId, VertexId), GraphError> {
        let edge = self.edges.get_mut(id.index()).ok_or(GraphError::UnknownEdge(id))?;
        if edge.state != expected {
            return Err(GraphError::InvalidTransition {
                edge: id,
                from: edge.state,
                to: next,
            });
        }
        edge.state = next;
        Ok((edge.from, edge.to))
    }

    /// Any edge in the arena, whatever its state
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index())
    }

    pub fn street_edge(&self, id: EdgeId) -> Result<&StreetEdge, GraphError> {
        self.edge(id)
            .ok_or(GraphError::UnknownEdge(id))?
            .street()
            .ok_or(GraphError::NotAStreetEdge(id))
    }

    /// The graph's edge set (live edges only)
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| e.is_live())
    }

    pub fn street_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges().filter(|e| e.is_street())
    }

    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    /// Edges ever allocated, in any state; grows on every split or link
    pub fn edge_arena_len(&self) -> usize {
        self.edges.len()
    }

    pub fn outgoing(&self, vertex: VertexId) -> impl Iterator<Item = &Edge> {
        self.vertex(vertex)
            .map(|v| v.outgoing.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(move |&id| self.edge(id))
    }

    pub fn incoming(&self, vertex: VertexId) -> impl Iterator<Item = &Edge> {
        self.vertex(vertex)
            .map(|v| v.incoming.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(move |&id| self.edge(id))
    }

    /// True if the vertex already has an outgoing street/transit connector
    pub fn has_outgoing_transit_link(&self, vertex: VertexId) -> bool {
        self.outgoing(vertex).any(Edge::is_transit_link)
    }

    /// Live street edge running the opposite way over the same geometry
    pub fn find_twin(&self, id: EdgeId) -> Option<EdgeId> {
        let edge = self.edge(id)?;
        let street = edge.street()?;
        let reversed = street.reversed().geometry;
        self.outgoing(edge.to)
            .filter(|candidate| candidate.id != id && candidate.to == edge.from)
            .find(|candidate| candidate.street().is_some_and(|s| s.geometry == reversed))
            .map(|candidate| candidate.id)
    }

    // ---------------------------------------------------------------
    // Annotations and metadata
    // ---------------------------------------------------------------

    /// Record a builder annotation, returning its message for logging
    pub fn add_annotation(&mut self, annotation: Annotation) -> String {
        self.annotations.push(annotation)
    }

    pub fn annotations(&self) -> &AnnotationLog {
        &self.annotations
    }

    pub fn summarize_annotations(&self) {
        self.annotations.summarize();
    }

    pub(crate) fn clear_annotations(&mut self) {
        self.annotations.clear();
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }

    pub fn set_built_at(&mut self, at: DateTime<Utc>) {
        self.built_at = Some(at);
    }

    // ---------------------------------------------------------------
    // Validation
    // ---------------------------------------------------------------

    /// Check arena ids and adjacency consistency
    pub fn check_invariants(&self) -> Result<(), GraphError> {
        for (idx, vertex) in self.vertices.iter().enumerate() {
            if vertex.id.index() != idx {
                return Err(GraphError::Invariant(format!(
                    "vertex at slot {idx} carries id {}",
                    vertex.id
                )));
            }
        }

        for (idx, edge) in self.edges.iter().enumerate() {
            if edge.id.index() != idx {
                return Err(GraphError::Invariant(format!(
                    "edge at slot {idx} carries id {}",
                    edge.id
                )));
            }
            let from = self.vertex(edge.from).ok_or(GraphError::UnknownVertex(edge.from))?;
            let to = self.vertex(edge.to).ok_or(GraphError::UnknownVertex(edge.to))?;

            let out_refs = from.outgoing.iter().filter(|&&e| e == edge.id).count();
            let in_refs = to.incoming.iter().filter(|&&e| e == edge.id).count();
            let expected = usize::from(edge.is_live());
            if out_refs != expected || in_refs != expected {
                return Err(GraphError::Invariant(format!(
                    "edge {} ({:?}) referenced {out_refs}x outgoing / {in_refs}x incoming",
                    edge.id, edge.state
                )));
            }
        }

        for vertex in &self.vertices {
            for &id in vertex.outgoing.iter().chain(vertex.incoming.iter()) {
                match self.edge(id) {
                    Some(edge) if edge.is_live() => {}
                    _ => {
                        return Err(GraphError::Invariant(format!(
                            "vertex {} references non-live edge {id}",
                            vertex.id
                        )))
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::LineString;

    fn street(graph: &Graph, from: VertexId, to: VertexId) -> EdgeKind {
        let a = graph.vertex(from).unwrap().coord;
        let b = graph.vertex(to).unwrap().coord;
        EdgeKind::Street(StreetEdge::new("st", LineString::new(vec![a, b]), Permission::ALL))
    }

    fn two_vertex_graph() -> (Graph, VertexId, VertexId) {
        let mut graph = Graph::new();
        let a = graph.add_vertex("a", Coord { x: 0.0, y: 0.0 }, VertexKind::Street);
        let b = graph.add_vertex("b", Coord { x: 10.0, y: 0.0 }, VertexKind::Street);
        (graph, a, b)
    }

    #[test]
    fn test_add_edge_updates_adjacency() {
        let (mut graph, a, b) = two_vertex_graph();
        let kind = street(&graph, a, b);
        let e = graph.add_edge(a, b, kind).unwrap();

        assert_eq!(graph.vertex(a).unwrap().outgoing(), &[e]);
        assert_eq!(graph.vertex(b).unwrap().incoming(), &[e]);
        assert_eq!(graph.edge_count(), 1);
        graph.check_invariants().unwrap();
    }

    #[test]
    fn test_pending_edges_are_not_in_edge_set() {
        let (mut graph, a, b) = two_vertex_graph();
        let kind = street(&graph, a, b);
        let e = graph.add_pending_edge(a, b, kind).unwrap();

        assert_eq!(graph.edge_count(), 0);
        assert!(graph.vertex(a).unwrap().outgoing().is_empty());
        graph.check_invariants().unwrap();

        graph.attach_edge(e).unwrap();
        assert_eq!(graph.edge_count(), 1);
        graph.detach_edge(e).unwrap();
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.edge(e).unwrap().state, EdgeState::Removed);
        graph.check_invariants().unwrap();
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let (mut graph, a, b) = two_vertex_graph();
        let kind = street(&graph, a, b);
        let e = graph.add_edge(a, b, kind).unwrap();

        assert!(matches!(
            graph.attach_edge(e),
            Err(GraphError::InvalidTransition { .. })
        ));
        graph.detach_edge(e).unwrap();
        assert!(graph.detach_edge(e).is_err());
        assert!(graph.discard_edge(e).is_err());
        assert!(matches!(
            graph.attach_edge(EdgeId(99)),
            Err(GraphError::UnknownEdge(_))
        ));
    }

    #[test]
    fn test_edge_to_unknown_vertex_fails() {
        let (mut graph, a, _) = two_vertex_graph();
        let result = graph.add_edge(a, VertexId(7), EdgeKind::StreetTransitLink { wheelchair_accessible: false });
        assert!(matches!(result, Err(GraphError::UnknownVertex(VertexId(7)))));
    }

    #[test]
    fn test_find_twin() {
        let (mut graph, a, b) = two_vertex_graph();
        let forward = graph.add_edge(a, b, street(&graph, a, b)).unwrap();
        assert_eq!(graph.find_twin(forward), None);

        let back = graph.add_edge(b, a, street(&graph, b, a)).unwrap();
        assert_eq!(graph.find_twin(forward), Some(back));
        assert_eq!(graph.find_twin(back), Some(forward));
    }

    #[test]
    fn test_snapshot_filters_by_class() {
        let (mut graph, _, _) = two_vertex_graph();
        let stop = graph.add_vertex(
            "stop",
            Coord { x: 1.0, y: 1.0 },
            VertexKind::TransitStop(TransitStop::new("S", "Stop")),
        );
        assert_eq!(graph.snapshot_vertices(VertexClass::TransitStop), vec![stop]);
        assert_eq!(graph.snapshot_vertices(VertexClass::Street).len(), 2);
        assert!(graph.snapshot_vertices(VertexClass::BikePark).is_empty());
    }

    #[test]
    fn test_has_outgoing_transit_link() {
        let (mut graph, a, b) = two_vertex_graph();
        assert!(!graph.has_outgoing_transit_link(a));
        graph
            .add_edge(a, b, EdgeKind::StreetTransitLink { wheelchair_accessible: true })
            .unwrap();
        assert!(graph.has_outgoing_transit_link(a));
        assert!(!graph.has_outgoing_transit_link(b));
    }
}
