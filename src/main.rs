//! # Streetlink CLI
//!
//! Builds a linked multimodal graph from network files, or inspects a saved one.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use streetlink::{BuildConfig, BuildOutcome, Graph, LoadLevel};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "streetlink")]
#[command(about = "Build multimodal routing graphs and link facilities to streets", long_about = None)]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the build pipeline
    Build {
        /// JSON build configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory (graph is written to Graph.obj inside it)
        #[arg(long)]
        graph_dir: Option<PathBuf>,

        /// Network file to load; may be repeated
        #[arg(short, long = "input")]
        inputs: Vec<PathBuf>,

        /// Skip the build if the graph file already exists
        #[arg(long)]
        no_rebuild: bool,

        /// Build in memory only
        #[arg(long)]
        no_serialize: bool,

        /// Start from a previously saved graph
        #[arg(long)]
        base_graph: Option<PathBuf>,

        /// Linking search radius
        #[arg(long)]
        max_distance: Option<f64>,
    },
    /// Load a saved graph and report its contents
    Inspect {
        /// Graph file
        graph: PathBuf,

        /// Skip the annotation log
        #[arg(long)]
        basic: bool,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Commands::Build {
            config,
            graph_dir,
            inputs,
            no_rebuild,
            no_serialize,
            base_graph,
            max_distance,
        } => {
            let mut build_config = match &config {
                Some(path) => BuildConfig::from_file(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => BuildConfig::default(),
            };
            if graph_dir.is_some() {
                build_config.graph_dir = graph_dir;
            }
            build_config.inputs.extend(inputs);
            if no_rebuild {
                build_config.always_rebuild = false;
            }
            if no_serialize {
                build_config.serialize_graph = false;
            }
            if base_graph.is_some() {
                build_config.base_graph = base_graph;
            }
            if let Some(max_distance) = max_distance {
                build_config.linker.max_distance = max_distance;
            }

            let mut builder = build_config
                .into_builder()
                .context("Failed to configure graph builder")?;
            match builder.run().context("Graph build failed")? {
                BuildOutcome::Skipped { graph_file } => {
                    println!("Graph {} already exists, nothing to do", graph_file.display());
                }
                BuildOutcome::Built { elapsed, saved_to } => {
                    let graph = builder.graph();
                    println!(
                        "Built graph: {} vertices, {} edges, {} annotations in {:.2}s",
                        graph.vertex_count(),
                        graph.edge_count(),
                        graph.annotations().len(),
                        elapsed.as_secs_f64()
                    );
                    if let Some(path) = saved_to {
                        println!("Saved to {}", path.display());
                    }
                }
            }
        }
        Commands::Inspect { graph, basic } => {
            let level = if basic { LoadLevel::Basic } else { LoadLevel::Full };
            let loaded = Graph::load(&graph, level)
                .with_context(|| format!("Failed to load graph {}", graph.display()))?;

            println!("Graph: {}", graph.display());
            if let Some(built_at) = loaded.built_at() {
                println!("  built at:    {}", built_at.to_rfc3339());
            }
            println!("  vertices:    {}", loaded.vertex_count());
            println!("  edges:       {}", loaded.edge_count());
            println!("  streets:     {}", loaded.street_edges().count());
            println!("  has streets: {}", loaded.has_streets);
            println!("  has transit: {}", loaded.has_transit);
            println!("  annotations: {}", loaded.annotations().len());
            for (category, count) in loaded.annotations().counts_by_category() {
                println!("    {category}: {count}");
            }

            loaded
                .check_invariants()
                .context("Graph failed its consistency check")?;
            println!("✓ graph is consistent");
        }
    }

    Ok(())
}
