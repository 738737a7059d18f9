//! End-to-end pipeline runs over JSON network files

use std::path::{Path, PathBuf};
use streetlink::builder::{GraphBuilderModule, Scratch};
use streetlink::error::ModuleError;
use streetlink::graph::{AnnotationCategory, VertexClass};
use streetlink::modules::{NetworkInputModule, TransitToStreetModule};
use streetlink::{BuildConfig, BuildOutcome, Graph, GraphBuilder, LoadLevel, PipelineError, GRAPH_FILE_NAME};
use tempfile::TempDir;

const CITY: &str = r#"{
    "nodes": [
        { "id": "a", "x": 0.0, "y": 0.0 },
        { "id": "b", "x": 100.0, "y": 0.0 },
        { "id": "c", "x": 100.0, "y": 100.0 }
    ],
    "streets": [
        { "from": "a", "to": "b", "name": "First Ave", "permission": ["walk", "bike"] },
        { "from": "b", "to": "c", "name": "Second St", "points": [[100.0, 50.0]] }
    ],
    "stops": [
        { "id": "central", "name": "Central", "x": 30.0, "y": 5.0, "wheelchair": true },
        { "id": "outpost", "name": "Outpost", "x": 500.0, "y": 500.0 }
    ],
    "bike_rental_stations": [{ "id": "dock", "x": 104.0, "y": 60.0 }],
    "bike_parks": [{ "id": "racks", "x": 60.0, "y": -3.0 }]
}"#;

fn write_network(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn city_config(dir: &TempDir) -> BuildConfig {
    let input = write_network(dir.path(), "city.json", CITY);
    BuildConfig {
        graph_dir: Some(dir.path().join("graph")),
        inputs: vec![input],
        linker: streetlink::LinkerConfig {
            max_distance: 20.0,
            ..Default::default()
        },
        ..BuildConfig::default()
    }
}

#[test]
fn builds_links_and_saves_city() {
    let dir = TempDir::new().unwrap();
    let mut builder = city_config(&dir).into_builder().unwrap();

    let outcome = builder.run().unwrap();
    let graph_file = dir.path().join("graph").join(GRAPH_FILE_NAME);
    assert!(matches!(outcome, BuildOutcome::Built { saved_to: Some(ref p), .. } if *p == graph_file));

    let graph = builder.graph();
    graph.check_invariants().unwrap();
    // central, dock and racks link; outpost is far away
    assert_eq!(graph.edges().filter(|e| e.is_transit_link()).count(), 3);
    let counts = graph.annotations().counts_by_category();
    assert_eq!(counts.get(&AnnotationCategory::StopUnlinked), Some(&1));
    assert_eq!(counts.len(), 1);

    let loaded = Graph::load(&graph_file, LoadLevel::Full).unwrap();
    assert_eq!(loaded.vertex_count(), graph.vertex_count());
    assert_eq!(loaded.edge_count(), graph.edge_count());
    assert_eq!(loaded.annotations().len(), graph.annotations().len());
    assert_eq!(
        loaded.snapshot_vertices(VertexClass::Split),
        graph.snapshot_vertices(VertexClass::Split)
    );
    loaded.check_invariants().unwrap();
}

#[test]
fn rebuild_disabled_skips_existing_graph() {
    let dir = TempDir::new().unwrap();
    city_config(&dir).into_builder().unwrap().run().unwrap();
    let graph_file = dir.path().join("graph").join(GRAPH_FILE_NAME);
    let saved = std::fs::read(&graph_file).unwrap();

    // an input that would fail its check proves no module is consulted
    let config = BuildConfig {
        always_rebuild: false,
        inputs: vec![dir.path().join("missing.json")],
        ..city_config(&dir)
    };
    let mut builder = config.into_builder().unwrap();
    let outcome = builder.run().unwrap();

    assert!(matches!(outcome, BuildOutcome::Skipped { .. }));
    assert_eq!(builder.graph().vertex_count(), 0);
    assert_eq!(std::fs::read(&graph_file).unwrap(), saved);
}

#[test]
fn failed_input_check_leaves_graph_empty() {
    let dir = TempDir::new().unwrap();
    let good = write_network(dir.path(), "good.json", CITY);
    let mut builder = GraphBuilder::new();
    builder.set_serialize_graph(false);
    builder.add_module(Box::new(NetworkInputModule::new(good)));
    builder.add_module(Box::new(NetworkInputModule::new(dir.path().join("absent.json"))));
    builder.add_module(Box::new(TransitToStreetModule::default()));

    let err = builder.run().unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InputCheck { source: ModuleError::MissingInput(_), .. }
    ));
    assert_eq!(builder.graph().vertex_count(), 0);
    assert_eq!(builder.graph().edge_count(), 0);
}

#[test]
fn base_graph_is_extended_not_replaced() {
    let dir = TempDir::new().unwrap();
    let streets_only = write_network(
        dir.path(),
        "streets.json",
        r#"{ "nodes": [{ "id": "a", "x": 0, "y": 0 }, { "id": "b", "x": 50, "y": 0 }],
             "streets": [{ "from": "a", "to": "b" }] }"#,
    );
    let base = BuildConfig {
        graph_dir: Some(dir.path().join("base")),
        inputs: vec![streets_only],
        ..BuildConfig::default()
    };
    base.into_builder().unwrap().run().unwrap();

    let stops = write_network(
        dir.path(),
        "stops.json",
        r#"{ "stops": [{ "id": "s", "x": 20, "y": 4 }] }"#,
    );
    let extended = BuildConfig {
        graph_dir: Some(dir.path().join("full")),
        base_graph: Some(dir.path().join("base").join(GRAPH_FILE_NAME)),
        inputs: vec![stops],
        ..BuildConfig::default()
    };
    let mut builder = extended.into_builder().unwrap();
    builder.run().unwrap();

    let graph = builder.graph();
    assert!(graph.has_streets && graph.has_transit);
    // two street twins split into four halves plus the connector
    assert_eq!(graph.edge_count(), 5);
    graph.check_invariants().unwrap();
}

#[test]
fn missing_base_graph_is_config_error() {
    let dir = TempDir::new().unwrap();
    let config = BuildConfig {
        graph_dir: Some(dir.path().to_path_buf()),
        base_graph: Some(dir.path().join("nope").join(GRAPH_FILE_NAME)),
        ..BuildConfig::default()
    };
    assert!(matches!(config.into_builder(), Err(PipelineError::Config(_))));
}

/// Puts a directory where the graph is staged before being renamed into
/// place, so the final save fails after a successful build
struct BlockStaging {
    graph_file: PathBuf,
}

impl BlockStaging {
    fn staging(&self) -> PathBuf {
        let mut name = self.graph_file.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl GraphBuilderModule for BlockStaging {
    fn name(&self) -> &str {
        "block staging"
    }

    fn check_inputs(&self) -> Result<(), ModuleError> {
        Ok(())
    }

    fn build_graph(&mut self, _graph: &mut Graph, _scratch: &mut Scratch) -> Result<(), ModuleError> {
        std::fs::create_dir(self.staging()).unwrap();
        Ok(())
    }
}

#[test]
fn save_failure_is_reported_as_persist_error() {
    let dir = TempDir::new().unwrap();
    let mut builder = GraphBuilder::new();
    builder.set_path(dir.path());
    builder.add_module(Box::new(BlockStaging {
        graph_file: dir.path().join(GRAPH_FILE_NAME),
    }));

    let err = builder.run().unwrap_err();
    assert!(matches!(err, PipelineError::Persist { .. }));
    // the build itself completed
    assert!(builder.graph().built_at().is_some());
}

#[test]
fn failed_save_is_not_skipped_by_next_run() {
    let dir = TempDir::new().unwrap();
    let graph_file = dir.path().join(GRAPH_FILE_NAME);
    let blocker = BlockStaging {
        graph_file: graph_file.clone(),
    };
    let staging = blocker.staging();

    let mut builder = GraphBuilder::new();
    builder.set_path(dir.path());
    builder.add_module(Box::new(blocker));
    assert!(matches!(builder.run(), Err(PipelineError::Persist { .. })));
    assert!(!graph_file.exists());

    std::fs::remove_dir(&staging).unwrap();
    let mut retry = GraphBuilder::new();
    retry.set_path(dir.path());
    retry.set_always_rebuild(false);
    let outcome = retry.run().unwrap();
    assert!(matches!(outcome, BuildOutcome::Built { saved_to: Some(ref p), .. } if *p == graph_file));
    Graph::load(&graph_file, LoadLevel::Full).unwrap();
}

#[test]
fn unwritable_output_fails_before_modules_run() {
    let dir = TempDir::new().unwrap();
    // a regular file where the graph directory should be
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();

    let mut builder = GraphBuilder::new();
    builder.set_path(&blocker);
    builder.add_module(Box::new(NetworkInputModule::new(dir.path().join("absent.json"))));

    assert!(matches!(builder.run(), Err(PipelineError::OutputFile { .. })));
}
