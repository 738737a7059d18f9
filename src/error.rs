//! Error types for streetlink
//!
//! Each layer has its own error type; [`PipelineError`] tags failures with
//! the phase of the build run they happened in.

use std::path::PathBuf;
use thiserror::Error;

use crate::builder::ArtifactKind;
use crate::graph::{EdgeId, VertexId};

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("unknown vertex {0}")]
    UnknownVertex(VertexId),

    #[error("unknown edge {0}")]
    UnknownEdge(EdgeId),

    #[error("edge {0} is not a street edge")]
    NotAStreetEdge(EdgeId),

    #[error("edge {edge} cannot go from {from:?} to {to:?}")]
    InvalidTransition {
        edge: EdgeId,
        from: crate::graph::EdgeState,
        to: crate::graph::EdgeState,
    },

    #[error("graph invariant violated: {0}")]
    Invariant(String),
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a graph file (magic {0:#010x})")]
    BadMagic(u32),

    #[error("unsupported graph file version {0}")]
    UnsupportedVersion(u16),

    #[error("graph file is corrupt: CRC expected {expected:#018x}, found {found:#018x}")]
    CrcMismatch { expected: u64, found: u64 },

    #[error("graph payload could not be decoded: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ScratchError {
    #[error("artifact {0:?} was already written during this run")]
    AlreadyWritten(ArtifactKind),
}

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("input {} is missing", .0.display())]
    MissingInput(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Scratch(#[from] ScratchError),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("cannot create or overwrite graph at {}: {source}", path.display())]
    OutputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("input check failed in module {module}: {source}")]
    InputCheck {
        module: String,
        #[source]
        source: ModuleError,
    },

    #[error("build failed in module {module}: {source}")]
    Build {
        module: String,
        #[source]
        source: ModuleError,
    },

    #[error("graph was built but could not be saved to {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: PersistError,
    },
}

/// Convenience result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_names_phase_and_module() {
        let err = PipelineError::InputCheck {
            module: "network input".into(),
            source: ModuleError::MissingInput(PathBuf::from("/nope/city.json")),
        };
        let message = err.to_string();
        assert!(message.starts_with("input check failed"));
        assert!(message.contains("network input"));
        assert!(message.contains("/nope/city.json"));
    }

    #[test]
    fn test_persist_error_is_distinct_from_build() {
        let err = PipelineError::Persist {
            path: PathBuf::from("out/Graph.obj"),
            source: PersistError::UnsupportedVersion(9),
        };
        assert!(matches!(err, PipelineError::Persist { .. }));
        assert!(err.to_string().contains("was built but could not be saved"));
    }
}
