//! Vertex variants and their capability queries

use geo::Coord;
use serde::{Deserialize, Serialize};

use super::{EdgeId, VertexId};

/// Label prefix given to vertices synthesized mid-edge by the linker
pub const SPLIT_LABEL_PREFIX: &str = "split ";

/// Transit stop payload.
///
/// A stop either is an entrance itself, owns a set of entrance vertices, or
/// has no entrance substructure at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitStop {
    pub stop_id: String,
    pub name: String,
    pub is_entrance: bool,
    #[serde(default)]
    pub entrances: Vec<VertexId>,
    #[serde(default)]
    pub wheelchair_entrance: bool,
}

impl TransitStop {
    pub fn new(stop_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            stop_id: stop_id.into(),
            name: name.into(),
            is_entrance: false,
            entrances: Vec::new(),
            wheelchair_entrance: false,
        }
    }

    pub fn entrance(stop_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            is_entrance: true,
            ..Self::new(stop_id, name)
        }
    }

    pub fn with_wheelchair_entrance(mut self, accessible: bool) -> Self {
        self.wheelchair_entrance = accessible;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VertexKind {
    /// Plain street intersection or shape node
    Street,
    TransitStop(TransitStop),
    BikeRentalStation { station_id: String, name: String },
    BikePark { park_id: String, name: String },
    /// Synthesized where a street edge was divided to attach a facility
    Split,
}

/// Discriminant-only view of [`VertexKind`], used for filtering snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexClass {
    Street,
    TransitStop,
    BikeRentalStation,
    BikePark,
    Split,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub label: String,
    pub coord: Coord<f64>,
    pub kind: VertexKind,
    pub(crate) outgoing: Vec<EdgeId>,
    pub(crate) incoming: Vec<EdgeId>,
}

impl Vertex {
    pub fn class(&self) -> VertexClass {
        match self.kind {
            VertexKind::Street => VertexClass::Street,
            VertexKind::TransitStop(_) => VertexClass::TransitStop,
            VertexKind::BikeRentalStation { .. } => VertexClass::BikeRentalStation,
            VertexKind::BikePark { .. } => VertexClass::BikePark,
            VertexKind::Split => VertexClass::Split,
        }
    }

    pub fn transit_stop(&self) -> Option<&TransitStop> {
        match &self.kind {
            VertexKind::TransitStop(stop) => Some(stop),
            _ => None,
        }
    }

    pub fn is_entrance(&self) -> bool {
        self.transit_stop().is_some_and(|s| s.is_entrance)
    }

    pub fn has_entrances(&self) -> bool {
        self.transit_stop().is_some_and(|s| !s.entrances.is_empty())
    }

    pub fn has_wheelchair_entrance(&self) -> bool {
        self.transit_stop().is_some_and(|s| s.wheelchair_entrance)
    }

    pub fn is_split(&self) -> bool {
        matches!(self.kind, VertexKind::Split)
    }

    pub fn outgoing(&self) -> &[EdgeId] {
        &self.outgoing
    }

    pub fn incoming(&self) -> &[EdgeId] {
        &self.incoming
    }
}
