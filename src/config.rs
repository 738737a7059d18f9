//! Build configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::builder::{GraphBuilder, GraphBuilderModule};
use crate::error::{PipelineError, Result};
use crate::linker::LinkerConfig;
use crate::modules::{NetworkInputModule, StreetIndexModule, TransitToStreetModule};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Output directory; the graph file inside it is always `Graph.obj`
    pub graph_dir: Option<PathBuf>,
    pub always_rebuild: bool,
    pub serialize_graph: bool,
    /// Start from this saved graph instead of an empty one
    pub base_graph: Option<PathBuf>,
    /// Network files, loaded in order
    pub inputs: Vec<PathBuf>,
    pub build_street_index: bool,
    pub link_transit: bool,
    pub linker: LinkerConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            graph_dir: None,
            always_rebuild: true,
            serialize_graph: true,
            base_graph: None,
            inputs: Vec::new(),
            build_street_index: true,
            link_transit: true,
            linker: LinkerConfig::default(),
        }
    }
}

impl BuildConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| PipelineError::Config(format!("invalid config {}: {e}", path.display())))
    }

    /// Stages in standard order: network inputs, street index, linking
    pub fn modules(&self) -> Vec<Box<dyn GraphBuilderModule>> {
        let mut modules: Vec<Box<dyn GraphBuilderModule>> = self
            .inputs
            .iter()
            .map(|path| Box::new(NetworkInputModule::new(path)) as Box<dyn GraphBuilderModule>)
            .collect();
        if self.build_street_index {
            modules.push(Box::new(StreetIndexModule::new()));
        }
        if self.link_transit {
            modules.push(Box::new(TransitToStreetModule::new(self.linker)));
        }
        modules
    }

    pub fn into_builder(self) -> Result<GraphBuilder> {
        let mut builder = GraphBuilder::new();
        builder.set_modules(self.modules());
        builder.set_always_rebuild(self.always_rebuild);
        builder.set_serialize_graph(self.serialize_graph);
        if let Some(dir) = &self.graph_dir {
            builder.set_path(dir);
        }
        if let Some(base) = &self.base_graph {
            builder.set_base_graph(base)?;
        }
        Ok(builder)
    }
}
