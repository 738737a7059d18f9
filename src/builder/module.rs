//! Build module contract

use crate::builder::Scratch;
use crate::error::ModuleError;
use crate::graph::Graph;

/// One stage of the graph build.
///
/// `provides` and `prerequisites` are advisory capability tags. The builder
/// logs them but runs modules in the order they were configured.
pub trait GraphBuilderModule {
    fn name(&self) -> &str;

    fn provides(&self) -> &[&'static str] {
        &[]
    }

    fn prerequisites(&self) -> &[&'static str] {
        &[]
    }

    /// Validate inputs before any module builds. Must not touch the graph.
    fn check_inputs(&self) -> Result<(), ModuleError>;

    /// Mutate the graph and/or publish artifacts for later modules
    fn build_graph(&mut self, graph: &mut Graph, scratch: &mut Scratch) -> Result<(), ModuleError>;
}
