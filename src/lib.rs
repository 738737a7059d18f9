//! # Streetlink
//!
//! Builds a multimodal routing graph in ordered stages and stitches point
//! facilities (transit stops, bike rental stations, bike parks) onto the
//! nearest walkable street, splitting street edges where needed.
//!
//! ```no_run
//! use streetlink::BuildConfig;
//!
//! let config = BuildConfig {
//!     graph_dir: Some("graphs/city".into()),
//!     inputs: vec!["city.json".into()],
//!     ..BuildConfig::default()
//! };
//! let mut builder = config.into_builder()?;
//! builder.run()?;
//! # Ok::<(), streetlink::PipelineError>(())
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod graph;
pub mod linker;
pub mod modules;
pub mod persist;

pub use builder::{BuildOutcome, GraphBuilder, GraphBuilderModule, Scratch, GRAPH_FILE_NAME};
pub use config::BuildConfig;
pub use error::{GraphError, ModuleError, PersistError, PipelineError, Result, ScratchError};
pub use graph::{Annotation, AnnotationCategory, EdgeId, Graph, VertexId};
pub use linker::{LinkerConfig, NetworkLinker, StreetIndex};
pub use persist::LoadLevel;
