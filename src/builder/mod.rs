//! Graph build pipeline
//!
//! Runs an ordered list of [`GraphBuilderModule`]s over one [`Graph`]:
//! every module's input check first, then every module's build step, then
//! annotation summary and serialization.

pub mod module;
pub mod scratch;

use chrono::Utc;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::graph::Graph;
use crate::persist::LoadLevel;

pub use module::GraphBuilderModule;
pub use scratch::{Artifact, ArtifactKind, Scratch};

/// File name of the serialized graph inside the graph directory
pub const GRAPH_FILE_NAME: &str = "Graph.obj";

#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    /// Output existed and rebuilding was not requested; no module ran
    Skipped { graph_file: PathBuf },
    Built {
        elapsed: Duration,
        saved_to: Option<PathBuf>,
    },
}

pub struct GraphBuilder {
    modules: Vec<Box<dyn GraphBuilderModule>>,
    graph_file: Option<PathBuf>,
    always_rebuild: bool,
    serialize_graph: bool,
    graph: Graph,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self {
            modules: Vec::new(),
            graph_file: None,
            always_rebuild: true,
            serialize_graph: true,
            graph: Graph::new(),
        }
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&mut self, module: Box<dyn GraphBuilderModule>) {
        self.modules.push(module);
    }

    pub fn set_modules(&mut self, modules: Vec<Box<dyn GraphBuilderModule>>) {
        self.modules = modules;
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn set_always_rebuild(&mut self, always_rebuild: bool) {
        self.always_rebuild = always_rebuild;
    }

    pub fn set_serialize_graph(&mut self, serialize_graph: bool) {
        self.serialize_graph = serialize_graph;
    }

    /// Graph directory; the file name is always [`GRAPH_FILE_NAME`]
    pub fn set_path(&mut self, dir: impl AsRef<Path>) {
        self.graph_file = Some(dir.as_ref().join(GRAPH_FILE_NAME));
    }

    pub fn graph_file(&self) -> Option<&Path> {
        self.graph_file.as_deref()
    }

    /// Start from a previously saved graph instead of an empty one
    pub fn set_base_graph(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.graph = Graph::load(path, LoadLevel::Full).map_err(|e| {
            PipelineError::Config(format!("error loading base graph {}: {e}", path.display()))
        })?;
        info!(path = %path.display(), vertices = self.graph.vertex_count(), "loaded base graph");
        Ok(())
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    pub fn run(&mut self) -> Result<BuildOutcome> {
        let start = Instant::now();

        let graph_file = if self.serialize_graph {
            let graph_file = self
                .graph_file
                .clone()
                .ok_or_else(|| PipelineError::Config("graph builder has no output path".into()))?;

            if graph_file.exists() && !self.always_rebuild {
                info!(
                    path = %graph_file.display(),
                    "graph already exists and always_rebuild=false => skipping graph build"
                );
                return Ok(BuildOutcome::Skipped { graph_file });
            }

            prepare_output(&graph_file)?;
            Some(graph_file)
        } else {
            None
        };

        if let Err(e) = self.build() {
            // An empty placeholder must not look like a finished graph to a later non-rebuild run
            if let Some(path) = &graph_file {
                let _ = std::fs::remove_file(path);
            }
            return Err(e);
        }

        let saved_to = match graph_file {
            Some(path) => {
                let save_start = Instant::now();
                if let Err(source) = self.graph.save(&path) {
                    let _ = std::fs::remove_file(&path);
                    return Err(PipelineError::Persist { path, source });
                }
                info!(
                    path = %path.display(),
                    elapsed_s = save_start.elapsed().as_secs_f64(),
                    "graph saved"
                );
                Some(path)
            }
            None => {
                info!("Not saving graph to disk, as requested.");
                None
            }
        };

        let elapsed = start.elapsed();
        info!(
            "Graph building took {:.1} minutes.",
            elapsed.as_secs_f64() / 60.0
        );
        Ok(BuildOutcome::Built { elapsed, saved_to })
    }

    /// Fail-fast input checks, then every build step in order
    fn build(&mut self) -> Result<()> {
        for module in &self.modules {
            debug!(
                module = module.name(),
                provides = ?module.provides(),
                prerequisites = ?module.prerequisites(),
                "checking inputs"
            );
            module
                .check_inputs()
                .map_err(|source| PipelineError::InputCheck {
                    module: module.name().to_string(),
                    source,
                })?;
        }

        let mut scratch = Scratch::new();
        for module in &mut self.modules {
            let module_start = Instant::now();
            info!(module = module.name(), "running build module");
            module
                .build_graph(&mut self.graph, &mut scratch)
                .map_err(|source| PipelineError::Build {
                    module: module.name().to_string(),
                    source,
                })?;
            info!(
                module = module.name(),
                elapsed_s = module_start.elapsed().as_secs_f64(),
                vertices = self.graph.vertex_count(),
                edges = self.graph.edge_count(),
                "build module finished"
            );
        }
        debug!(artifacts = ?scratch.kinds(), "scratch artifacts at end of run");

        self.graph.set_built_at(Utc::now());
        self.graph.summarize_annotations();
        if let Err(e) = self.graph.check_invariants() {
            warn!(error = %e, "graph failed its consistency check after build");
        }
        Ok(())
    }
}

/// Create the graph directory and create/truncate the output file up front,
/// so path and permission problems surface before any module runs.
fn prepare_output(graph_file: &Path) -> Result<()> {
    let output_error = |source| PipelineError::OutputFile {
        path: graph_file.to_path_buf(),
        source,
    };
    if let Some(parent) = graph_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(output_error)?;
        }
    }
    File::create(graph_file).map_err(output_error)?;
    Ok(())
}
