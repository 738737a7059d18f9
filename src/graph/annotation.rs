//! Build-time annotations: non-fatal observations kept on the graph

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

use super::VertexId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnnotationCategory {
    StopUnlinked,
    BikeRentalStationUnlinked,
    BikeParkUnlinked,
}

impl fmt::Display for AnnotationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnnotationCategory::StopUnlinked => "StopUnlinked",
            AnnotationCategory::BikeRentalStationUnlinked => "BikeRentalStationUnlinked",
            AnnotationCategory::BikeParkUnlinked => "BikeParkUnlinked",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Annotation {
    StopUnlinked { vertex: VertexId, label: String },
    BikeRentalStationUnlinked { vertex: VertexId, label: String },
    BikeParkUnlinked { vertex: VertexId, label: String },
}

impl Annotation {
    pub fn category(&self) -> AnnotationCategory {
        match self {
            Annotation::StopUnlinked { .. } => AnnotationCategory::StopUnlinked,
            Annotation::BikeRentalStationUnlinked { .. } => {
                AnnotationCategory::BikeRentalStationUnlinked
            }
            Annotation::BikeParkUnlinked { .. } => AnnotationCategory::BikeParkUnlinked,
        }
    }

    pub fn vertex(&self) -> VertexId {
        match self {
            Annotation::StopUnlinked { vertex, .. }
            | Annotation::BikeRentalStationUnlinked { vertex, .. }
            | Annotation::BikeParkUnlinked { vertex, .. } => *vertex,
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::StopUnlinked { label, .. } => {
                write!(f, "Stop {label} not near any streets; it will not be usable.")
            }
            Annotation::BikeRentalStationUnlinked { label, .. } => write!(
                f,
                "Bike rental station {label} not near any streets; it will not be usable."
            ),
            Annotation::BikeParkUnlinked { label, .. } => write!(
                f,
                "Bike park {label} not near any streets; it will not be usable."
            ),
        }
    }
}

/// Append-only log of annotations, in insertion order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationLog {
    entries: Vec<Annotation>,
}

impl AnnotationLog {
    /// Record an annotation and return its message for the caller to log
    pub fn push(&mut self, annotation: Annotation) -> String {
        let message = annotation.to_string();
        self.entries.push(annotation);
        message
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn of_category(&self, category: AnnotationCategory) -> impl Iterator<Item = &Annotation> {
        self.entries.iter().filter(move |a| a.category() == category)
    }

    pub fn counts_by_category(&self) -> BTreeMap<AnnotationCategory, usize> {
        let mut counts = BTreeMap::new();
        for annotation in &self.entries {
            *counts.entry(annotation.category()).or_insert(0) += 1;
        }
        counts
    }

    /// Log one line per category for operator review
    pub fn summarize(&self) {
        if self.entries.is_empty() {
            info!("No graph builder annotations");
            return;
        }
        info!(total = self.entries.len(), "Summary of graph builder annotations");
        for (category, count) in self.counts_by_category() {
            warn!(%category, count, "{count} annotations of type {category}");
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
