//! Per-run scratch registry shared by build modules
//!
//! Each well-known artifact kind has one typed slot. A slot can be written
//! once per run and read by any later module.

use crate::error::ScratchError;
use crate::linker::StreetIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    /// Spatial index over the street edges, built once and reused for linking
    StreetIndex,
}

/// A value that can be stored in the scratch registry
pub trait Artifact: Sized {
    const KIND: ArtifactKind;

    fn slot(scratch: &Scratch) -> &Option<Self>;
    fn slot_mut(scratch: &mut Scratch) -> &mut Option<Self>;
}

impl Artifact for StreetIndex {
    const KIND: ArtifactKind = ArtifactKind::StreetIndex;

    fn slot(scratch: &Scratch) -> &Option<Self> {
        &scratch.street_index
    }

    fn slot_mut(scratch: &mut Scratch) -> &mut Option<Self> {
        &mut scratch.street_index
    }
}

#[derive(Debug, Default)]
pub struct Scratch {
    street_index: Option<StreetIndex>,
}

impl Scratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an artifact; fails if its kind was already written this run
    pub fn insert<A: Artifact>(&mut self, artifact: A) -> Result<(), ScratchError> {
        let slot = A::slot_mut(self);
        if slot.is_some() {
            return Err(ScratchError::AlreadyWritten(A::KIND));
        }
        *slot = Some(artifact);
        Ok(())
    }

    pub fn get<A: Artifact>(&self) -> Option<&A> {
        A::slot(self).as_ref()
    }

    /// Read an artifact, producing and storing it first if this run has none
    pub fn get_or_insert_with<A: Artifact>(&mut self, make: impl FnOnce() -> A) -> &A {
        A::slot_mut(self).get_or_insert_with(make)
    }

    pub fn contains(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::StreetIndex => self.street_index.is_some(),
        }
    }

    /// Kinds written so far, for run diagnostics
    pub fn kinds(&self) -> Vec<ArtifactKind> {
        [ArtifactKind::StreetIndex]
            .into_iter()
            .filter(|&kind| self.contains(kind))
            .collect()
    }
}
