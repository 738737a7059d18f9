//! Spatial index for snapping facilities to street edges

use geo::{BoundingRect, Coord, LineString};
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use rustc_hash::FxHashSet;

use super::split::project;
use crate::graph::{EdgeId, Graph};

/// Street geometry with its edge id for the R-tree
#[derive(Clone, Debug)]
pub struct StreetSegmentNode {
    pub edge: EdgeId,
    geometry: LineString<f64>,
    envelope: AABB<[f64; 2]>,
}

impl StreetSegmentNode {
    pub fn new(edge: EdgeId, geometry: LineString<f64>) -> Option<Self> {
        let rect = geometry.bounding_rect()?;
        let envelope = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
        Some(Self {
            edge,
            geometry,
            envelope,
        })
    }
}

impl RTreeObject for StreetSegmentNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl PointDistance for StreetSegmentNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        match project(&self.geometry, Coord { x: point[0], y: point[1] }) {
            Some(p) => p.distance * p.distance,
            None => f64::INFINITY,
        }
    }
}

/// Spatial index over the street edges present when it was built.
///
/// Twin edges (the two directions of one street) are indexed once; the
/// linker finds the twin through the graph when it splits.
#[derive(Clone, Debug, Default)]
pub struct StreetIndex {
    tree: RTree<StreetSegmentNode>,
    built_for: usize,
}

impl StreetIndex {
    /// Build from live street edges usable on foot or by bike
    pub fn build(graph: &Graph) -> Self {
        let mut indexed: FxHashSet<EdgeId> = FxHashSet::default();
        let mut nodes = Vec::new();

        for edge in graph.street_edges() {
            let Some(street) = edge.street() else {
                continue;
            };
            if !street.permission.allows_walk_or_bike() {
                continue;
            }
            if graph.find_twin(edge.id).is_some_and(|twin| indexed.contains(&twin)) {
                continue;
            }
            if let Some(node) = StreetSegmentNode::new(edge.id, street.geometry.clone()) {
                indexed.insert(edge.id);
                nodes.push(node);
            }
        }

        Self {
            tree: RTree::bulk_load(nodes),
            built_for: graph.edge_arena_len(),
        }
    }

    /// False once edges were added to `graph` after the index was built,
    /// e.g. by a committed round of splits
    pub fn is_current(&self, graph: &Graph) -> bool {
        self.built_for == graph.edge_arena_len()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Nearest accepted street edge within `max_distance`, with its distance
    pub fn nearest_within(
        &self,
        point: Coord<f64>,
        max_distance: f64,
        mut accept: impl FnMut(EdgeId) -> bool,
    ) -> Option<(EdgeId, f64)> {
        let max_2 = max_distance * max_distance;
        for (node, dist_2) in self
            .tree
            .nearest_neighbor_iter_with_distance_2(&[point.x, point.y])
        {
            if dist_2 > max_2 {
                break;
            }
            if accept(node.edge) {
                return Some((node.edge, dist_2.sqrt()));
            }
        }
        None
    }
}
