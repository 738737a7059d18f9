//! Batched edge replacements produced while linking

use std::collections::BTreeMap;
use tracing::debug;

use crate::error::GraphError;
use crate::graph::{EdgeId, Graph};

/// One segment of a split street: the half in the original direction and,
/// when the street has a twin, the same half in the opposite direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPair {
    pub primary: EdgeId,
    pub secondary: Option<EdgeId>,
    /// Set when a later split in the same batch divided this segment again
    pub superseded: bool,
}

impl SplitPair {
    pub fn new(primary: EdgeId, secondary: Option<EdgeId>) -> Self {
        Self {
            primary,
            secondary,
            superseded: false,
        }
    }

    fn edges(&self) -> impl Iterator<Item = EdgeId> {
        std::iter::once(self.primary).chain(self.secondary)
    }
}

/// Everything pending against one original street
#[derive(Debug, Clone, Default)]
pub struct Replacement {
    /// The original edge and its twin, if any
    pub to_remove: Vec<EdgeId>,
    /// Split segments in the order they were produced
    pub to_add: Vec<SplitPair>,
}

impl Replacement {
    /// Segments not divided again later in the batch
    pub fn current_pairs(&self) -> impl Iterator<Item = (usize, &SplitPair)> {
        self.to_add.iter().enumerate().filter(|(_, pair)| !pair.superseded)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitStats {
    pub removed: usize,
    pub added: usize,
    pub suppressed: usize,
}

/// Replacement record keyed by the original (indexed) street edge
#[derive(Debug, Default)]
pub struct ReplacementRecord {
    entries: BTreeMap<EdgeId, Replacement>,
}

impl ReplacementRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, original: EdgeId) -> Option<&Replacement> {
        self.entries.get(&original)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EdgeId, &Replacement)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First split of an original street
    pub fn record_first_split(&mut self, original: EdgeId, twin: Option<EdgeId>, halves: [SplitPair; 2]) {
        let entry = self.entries.entry(original).or_default();
        if entry.to_remove.is_empty() {
            entry.to_remove.push(original);
            entry.to_remove.extend(twin);
        }
        entry.to_add.extend(halves);
    }

    /// Re-split of a pending segment; the divided pair is marked superseded
    pub fn record_resplit(&mut self, original: EdgeId, divided: usize, halves: [SplitPair; 2]) -> Result<(), GraphError> {
        let entry = self
            .entries
            .get_mut(&original)
            .ok_or(GraphError::UnknownEdge(original))?;
        let pair = entry.to_add.get_mut(divided).ok_or_else(|| {
            GraphError::Invariant(format!("no pending segment {divided} recorded for {original}"))
        })?;
        pair.superseded = true;
        entry.to_add.extend(halves);
        Ok(())
    }

    /// Apply the whole batch: detach every original, then attach every
    /// segment that was not superseded. Superseded segments are discarded
    /// together with their secondary edge.
    pub fn commit(self, graph: &mut Graph) -> Result<CommitStats, GraphError> {
        let mut stats = CommitStats::default();

        for replacement in self.entries.values() {
            for &edge in &replacement.to_remove {
                graph.detach_edge(edge)?;
                stats.removed += 1;
            }
        }

        for (original, replacement) in &self.entries {
            for pair in &replacement.to_add {
                if pair.superseded {
                    for edge in pair.edges() {
                        graph.discard_edge(edge)?;
                        stats.suppressed += 1;
                    }
                    continue;
                }
                for edge in pair.edges() {
                    graph.attach_edge(edge)?;
                    stats.added += 1;
                }
            }
            debug!(%original, segments = replacement.current_pairs().count(), "replaced street");
        }

        Ok(stats)
    }
}
