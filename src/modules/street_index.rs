//! Builds the street spatial index once and publishes it for later stages

use std::time::Instant;
use tracing::info;

use crate::builder::{GraphBuilderModule, Scratch};
use crate::error::ModuleError;
use crate::graph::Graph;
use crate::linker::StreetIndex;

#[derive(Debug, Default)]
pub struct StreetIndexModule;

impl StreetIndexModule {
    pub fn new() -> Self {
        Self
    }
}

impl GraphBuilderModule for StreetIndexModule {
    fn name(&self) -> &str {
        "street index"
    }

    fn provides(&self) -> &[&'static str] {
        &["street index"]
    }

    fn prerequisites(&self) -> &[&'static str] {
        &["streets"]
    }

    fn check_inputs(&self) -> Result<(), ModuleError> {
        Ok(())
    }

    fn build_graph(&mut self, graph: &mut Graph, scratch: &mut Scratch) -> Result<(), ModuleError> {
        let start = Instant::now();
        let index = StreetIndex::build(graph);
        info!(
            streets = index.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "indexed streets"
        );
        scratch.insert(index)?;
        Ok(())
    }
}
