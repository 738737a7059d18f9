//! Edge variants: street edges with geometry and street/transit connectors

use geo::{Coord, LineString};
use serde::{Deserialize, Serialize};
use std::ops::BitOr;

use super::{EdgeId, VertexId};

/// Traversal permission bits (bit0=walk, bit1=bike, bit2=car)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Permission(u8);

impl Permission {
    pub const NONE: Permission = Permission(0);
    pub const WALK: Permission = Permission(1);
    pub const BIKE: Permission = Permission(1 << 1);
    pub const CAR: Permission = Permission(1 << 2);
    pub const ALL: Permission = Permission(0b111);

    pub fn contains(self, other: Permission) -> bool {
        self.0 & other.0 == other.0
    }

    /// Facilities are reached on foot or by bike, never from car-only edges
    pub fn allows_walk_or_bike(self) -> bool {
        self.contains(Self::WALK) || self.contains(Self::BIKE)
    }
}

impl BitOr for Permission {
    type Output = Permission;

    fn bitor(self, rhs: Permission) -> Permission {
        Permission(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreetEdge {
    pub name: String,
    /// Runs from the from-vertex to the to-vertex
    pub geometry: LineString<f64>,
    pub length: f64,
    pub permission: Permission,
    pub wheelchair_accessible: bool,
}

impl StreetEdge {
    /// Street edge whose length is the planar length of its geometry
    pub fn new(name: impl Into<String>, geometry: LineString<f64>, permission: Permission) -> Self {
        let length = planar_length(&geometry);
        Self {
            name: name.into(),
            geometry,
            length,
            permission,
            wheelchair_accessible: true,
        }
    }

    /// Same street traversed the other way
    pub fn reversed(&self) -> Self {
        let mut coords: Vec<Coord<f64>> = self.geometry.coords().copied().collect();
        coords.reverse();
        Self {
            geometry: LineString::new(coords),
            ..self.clone()
        }
    }
}

/// Sum of segment lengths of a line string
pub fn planar_length(geometry: &LineString<f64>) -> f64 {
    geometry
        .lines()
        .map(|line| {
            let delta = line.delta();
            delta.x.hypot(delta.y)
        })
        .sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EdgeKind {
    Street(StreetEdge),
    /// Facility to street connector; carries no geometry of its own
    StreetTransitLink { wheelchair_accessible: bool },
}

/// Whether an edge is part of the graph's edge set.
///
/// Only `Live` edges appear in adjacency lists. `Pending` edges are split
/// halves awaiting commit; `Removed` edges were detached or discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeState {
    Live,
    Pending,
    Removed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub from: VertexId,
    pub to: VertexId,
    pub kind: EdgeKind,
    pub state: EdgeState,
}

impl Edge {
    pub fn street(&self) -> Option<&StreetEdge> {
        match &self.kind {
            EdgeKind::Street(street) => Some(street),
            _ => None,
        }
    }

    pub fn is_street(&self) -> bool {
        matches!(self.kind, EdgeKind::Street(_))
    }

    pub fn is_transit_link(&self) -> bool {
        matches!(self.kind, EdgeKind::StreetTransitLink { .. })
    }

    pub fn is_live(&self) -> bool {
        self.state == EdgeState::Live
    }
}
