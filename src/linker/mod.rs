//! Network linker: attach point facilities to the nearest street edge
//!
//! Linking never touches the street edge set directly. Each split creates
//! its split vertex and connector right away, but the replacement halves are
//! added as pending edges and recorded in a [`ReplacementRecord`]; the caller
//! commits the whole batch once every facility has been processed.

pub mod replacement;
pub mod spatial;
pub mod split;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::GraphError;
use crate::graph::{
    planar_length, EdgeId, EdgeKind, Graph, StreetEdge, VertexId, VertexKind, SPLIT_LABEL_PREFIX,
};

pub use replacement::{CommitStats, Replacement, ReplacementRecord, SplitPair};
pub use spatial::StreetIndex;
pub use split::{project, split_geometry, split_street, Projection};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    /// Search radius around a facility, in graph units
    pub max_distance: f64,
    /// Projections this close to a street endpoint link to that endpoint
    pub endpoint_tolerance: f64,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            max_distance: 100.0,
            endpoint_tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkOutcome {
    Linked {
        connector: EdgeId,
        street_vertex: VertexId,
        split: bool,
    },
    /// No usable street within the search radius
    NotLinked,
}

impl LinkOutcome {
    pub fn is_linked(&self) -> bool {
        matches!(self, LinkOutcome::Linked { .. })
    }
}

/// The street segment a facility will be attached to
struct Target {
    primary: EdgeId,
    secondary: Option<EdgeId>,
    /// Index of the pending pair being divided again, if any
    pending_pair: Option<usize>,
}

pub struct NetworkLinker<'a> {
    index: &'a StreetIndex,
    config: LinkerConfig,
    replacements: ReplacementRecord,
    splits: usize,
}

impl<'a> NetworkLinker<'a> {
    pub fn new(index: &'a StreetIndex, config: LinkerConfig) -> Self {
        Self {
            index,
            config,
            replacements: ReplacementRecord::new(),
            splits: 0,
        }
    }

    pub fn replacements(&self) -> &ReplacementRecord {
        &self.replacements
    }

    pub fn into_replacements(self) -> ReplacementRecord {
        self.replacements
    }

    pub fn split_count(&self) -> usize {
        self.splits
    }

    /// Connect `vertex` to the nearest walkable/bikeable street.
    ///
    /// The connector is a single facility -> street edge carrying the
    /// wheelchair flag. Street replacements stay pending until commit.
    pub fn connect_vertex_to_streets(
        &mut self,
        graph: &mut Graph,
        vertex: VertexId,
        wheelchair_accessible: bool,
    ) -> Result<LinkOutcome, GraphError> {
        let coord = graph.vertex(vertex).ok_or(GraphError::UnknownVertex(vertex))?.coord;

        let nearest = self.index.nearest_within(coord, self.config.max_distance, |id| {
            graph
                .edge(id)
                .is_some_and(|e| e.is_live() && e.street().is_some_and(|s| s.permission.allows_walk_or_bike()))
        });
        let Some((original, distance)) = nearest else {
            return Ok(LinkOutcome::NotLinked);
        };

        let target = self.target_for(graph, original, coord)?;
        let street = graph.street_edge(target.primary)?.clone();
        let Some(projection) = project(&street.geometry, coord) else {
            return Ok(LinkOutcome::NotLinked);
        };
        let primary = graph.edge(target.primary).ok_or(GraphError::UnknownEdge(target.primary))?;
        let (from, to) = (primary.from, primary.to);

        trace!(%vertex, %original, distance, along = projection.along, "linking facility");

        let total = planar_length(&street.geometry);
        let tolerance = self.config.endpoint_tolerance;
        let (street_vertex, split) = if projection.along <= tolerance {
            (from, false)
        } else if projection.along >= total - tolerance {
            (to, false)
        } else {
            let split_vertex = self.split(graph, original, &target, &street, &projection)?;
            (split_vertex, true)
        };

        let connector = graph.add_edge(
            vertex,
            street_vertex,
            EdgeKind::StreetTransitLink { wheelchair_accessible },
        )?;

        Ok(LinkOutcome::Linked {
            connector,
            street_vertex,
            split,
        })
    }

    /// Resolve the original street to the segment to split: the street itself
    /// on first contact, or the pending segment closest to the facility.
    fn target_for(&self, graph: &Graph, original: EdgeId, coord: geo::Coord<f64>) -> Result<Target, GraphError> {
        let Some(replacement) = self.replacements.get(original) else {
            return Ok(Target {
                primary: original,
                secondary: graph.find_twin(original),
                pending_pair: None,
            });
        };

        let mut best: Option<(f64, usize, EdgeId, Option<EdgeId>)> = None;
        for (idx, pair) in replacement.current_pairs() {
            let geometry = &graph.street_edge(pair.primary)?.geometry;
            let Some(p) = project(geometry, coord) else {
                continue;
            };
            if best.as_ref().map_or(true, |(d, ..)| p.distance < *d) {
                best = Some((p.distance, idx, pair.primary, pair.secondary));
            }
        }

        let (_, idx, primary, secondary) = best.ok_or_else(|| {
            GraphError::Invariant(format!("street {original} has no pending segment left"))
        })?;
        Ok(Target {
            primary,
            secondary,
            pending_pair: Some(idx),
        })
    }

    fn split(
        &mut self,
        graph: &mut Graph,
        original: EdgeId,
        target: &Target,
        street: &StreetEdge,
        projection: &Projection,
    ) -> Result<VertexId, GraphError> {
        let primary = graph.edge(target.primary).ok_or(GraphError::UnknownEdge(target.primary))?;
        let (from, to) = (primary.from, primary.to);

        let label = format!("{SPLIT_LABEL_PREFIX}{} on {}", self.splits, street.name);
        let split_vertex = graph.add_vertex(label, projection.point, VertexKind::Split);
        self.splits += 1;

        let (head, tail) = split_street(street, projection);
        let head_fwd = graph.add_pending_edge(from, split_vertex, EdgeKind::Street(head.clone()))?;
        let tail_fwd = graph.add_pending_edge(split_vertex, to, EdgeKind::Street(tail.clone()))?;

        // Twin halves reuse the twin's own attributes over the reversed geometry
        let (head_back, tail_back) = match target.secondary {
            Some(twin) => {
                let twin_street = graph.street_edge(twin)?.clone();
                let head_back = StreetEdge {
                    geometry: head.reversed().geometry,
                    length: twin_street.length * ratio(head.length, street.length),
                    ..twin_street.clone()
                };
                let tail_back = StreetEdge {
                    geometry: tail.reversed().geometry,
                    length: twin_street.length - head_back.length,
                    ..twin_street
                };
                (
                    Some(graph.add_pending_edge(split_vertex, from, EdgeKind::Street(head_back))?),
                    Some(graph.add_pending_edge(to, split_vertex, EdgeKind::Street(tail_back))?),
                )
            }
            None => (None, None),
        };

        let halves = [
            SplitPair::new(head_fwd, head_back),
            SplitPair::new(tail_fwd, tail_back),
        ];
        match target.pending_pair {
            Some(divided) => self.replacements.record_resplit(original, divided, halves)?,
            None => self.replacements.record_first_split(original, target.secondary, halves),
        }

        Ok(split_vertex)
    }
}

fn ratio(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole
    } else {
        0.0
    }
}
