//! Links transit stops, bike rental stations and bike parks to the streets

use tracing::{debug, info, warn};

use crate::builder::{ArtifactKind, GraphBuilderModule, Scratch};
use crate::error::{GraphError, ModuleError};
use crate::graph::{Annotation, Graph, VertexClass, VertexId};
use crate::linker::{CommitStats, LinkOutcome, LinkerConfig, NetworkLinker, StreetIndex};

/// Per-run linking counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkSummary {
    pub stops_linked: usize,
    pub stops_unlinked: usize,
    pub stops_skipped: usize,
    pub bike_rental_linked: usize,
    pub bike_rental_unlinked: usize,
    pub bike_park_linked: usize,
    pub bike_park_unlinked: usize,
    pub splits: usize,
    pub commit: CommitStats,
}

pub struct TransitToStreetModule {
    config: LinkerConfig,
    last_summary: Option<LinkSummary>,
}

impl TransitToStreetModule {
    pub fn new(config: LinkerConfig) -> Self {
        Self {
            config,
            last_summary: None,
        }
    }

    /// Counts from the most recent build, if linking ran
    pub fn last_summary(&self) -> Option<&LinkSummary> {
        self.last_summary.as_ref()
    }
}

impl Default for TransitToStreetModule {
    fn default() -> Self {
        Self::new(LinkerConfig::default())
    }
}

impl GraphBuilderModule for TransitToStreetModule {
    fn name(&self) -> &str {
        "transit to street"
    }

    fn provides(&self) -> &[&'static str] {
        &["street to transit", "linking"]
    }

    fn prerequisites(&self) -> &[&'static str] {
        &["streets"]
    }

    fn check_inputs(&self) -> Result<(), ModuleError> {
        if !(self.config.max_distance.is_finite() && self.config.max_distance >= 0.0) {
            return Err(ModuleError::InvalidInput(format!(
                "linker max_distance must be a non-negative number, got {}",
                self.config.max_distance
            )));
        }
        if !(self.config.endpoint_tolerance.is_finite() && self.config.endpoint_tolerance >= 0.0) {
            return Err(ModuleError::InvalidInput(format!(
                "linker endpoint_tolerance must be a non-negative number, got {}",
                self.config.endpoint_tolerance
            )));
        }
        Ok(())
    }

    fn build_graph(&mut self, graph: &mut Graph, scratch: &mut Scratch) -> Result<(), ModuleError> {
        info!("Linking transit stops to streets...");
        if !(graph.has_streets && graph.has_transit) {
            info!(
                has_streets = graph.has_streets,
                has_transit = graph.has_transit,
                "nothing to link"
            );
            return Ok(());
        }

        // A scratch index from before an earlier commit misses the split halves
        let stale = scratch
            .get::<StreetIndex>()
            .is_some_and(|index| !index.is_current(&*graph));
        let rebuilt;
        let index = if stale {
            debug!("street index in scratch predates earlier splits, rebuilding");
            rebuilt = StreetIndex::build(graph);
            &rebuilt
        } else {
            if scratch.contains(ArtifactKind::StreetIndex) {
                debug!("reusing street index from scratch");
            } else {
                debug!("no street index in scratch, building one");
            }
            scratch.get_or_insert_with(|| StreetIndex::build(&*graph))
        };

        let summary = link_all(graph, index, self.config)?;
        info!(
            stops_linked = summary.stops_linked,
            stops_unlinked = summary.stops_unlinked,
            stops_skipped = summary.stops_skipped,
            bike_rental_linked = summary.bike_rental_linked,
            bike_rental_unlinked = summary.bike_rental_unlinked,
            bike_park_linked = summary.bike_park_linked,
            bike_park_unlinked = summary.bike_park_unlinked,
            splits = summary.splits,
            "linking finished"
        );
        self.last_summary = Some(summary);
        Ok(())
    }
}

/// Run the three linking passes and commit the batched street replacements
pub fn link_all(graph: &mut Graph, index: &StreetIndex, config: LinkerConfig) -> Result<LinkSummary, GraphError> {
    let mut linker = NetworkLinker::new(index, config);
    let mut summary = LinkSummary::default();

    link_transit(graph, &mut linker, &mut summary)?;
    link_bike_rental_stations(graph, &mut linker, &mut summary)?;
    link_bike_parks(graph, &mut linker, &mut summary)?;

    summary.splits = linker.split_count();
    summary.commit = clean_graph(graph, linker)?;
    Ok(summary)
}

fn link_transit(graph: &mut Graph, linker: &mut NetworkLinker<'_>, summary: &mut LinkSummary) -> Result<(), GraphError> {
    for stop in graph.snapshot_vertices(VertexClass::TransitStop) {
        if graph.has_outgoing_transit_link(stop) {
            summary.stops_skipped += 1;
            continue;
        }
        let vertex = graph.vertex(stop).ok_or(GraphError::UnknownVertex(stop))?;
        // Stations with explicit entrances are reached through those entrances
        if !(vertex.is_entrance() || !vertex.has_entrances()) {
            summary.stops_skipped += 1;
            continue;
        }
        let wheelchair = vertex.has_wheelchair_entrance();
        let label = vertex.label.clone();

        if linker.connect_vertex_to_streets(graph, stop, wheelchair)?.is_linked() {
            summary.stops_linked += 1;
        } else {
            let message = graph.add_annotation(Annotation::StopUnlinked { vertex: stop, label });
            debug!("{message}");
            summary.stops_unlinked += 1;
        }
    }
    if summary.stops_unlinked > 0 {
        warn!(
            "{} transit stops were not close enough to the street network to be connected to it.",
            summary.stops_unlinked
        );
    }
    Ok(())
}

fn link_bike_rental_stations(
    graph: &mut Graph,
    linker: &mut NetworkLinker<'_>,
    summary: &mut LinkSummary,
) -> Result<(), GraphError> {
    debug!("Linking bike rental stations...");
    for station in graph.snapshot_vertices(VertexClass::BikeRentalStation) {
        match link_facility(graph, linker, station)? {
            Some(true) => summary.bike_rental_linked += 1,
            Some(false) => {
                let label = label_of(graph, station)?;
                let message = graph.add_annotation(Annotation::BikeRentalStationUnlinked { vertex: station, label });
                warn!("{message}");
                summary.bike_rental_unlinked += 1;
            }
            None => {}
        }
    }
    Ok(())
}

fn link_bike_parks(graph: &mut Graph, linker: &mut NetworkLinker<'_>, summary: &mut LinkSummary) -> Result<(), GraphError> {
    debug!("Linking bike P+R stations...");
    for park in graph.snapshot_vertices(VertexClass::BikePark) {
        match link_facility(graph, linker, park)? {
            Some(true) => summary.bike_park_linked += 1,
            Some(false) => {
                let label = label_of(graph, park)?;
                let message = graph.add_annotation(Annotation::BikeParkUnlinked { vertex: park, label });
                warn!("{message}");
                summary.bike_park_unlinked += 1;
            }
            None => {}
        }
    }
    Ok(())
}

/// `None` when the facility was already linked by an earlier run
fn link_facility(graph: &mut Graph, linker: &mut NetworkLinker<'_>, vertex: VertexId) -> Result<Option<bool>, GraphError> {
    if graph.has_outgoing_transit_link(vertex) {
        return Ok(None);
    }
    let outcome: LinkOutcome = linker.connect_vertex_to_streets(graph, vertex, false)?;
    Ok(Some(outcome.is_linked()))
}

fn label_of(graph: &Graph, vertex: VertexId) -> Result<String, GraphError> {
    graph
        .vertex(vertex)
        .map(|v| v.label.clone())
        .ok_or(GraphError::UnknownVertex(vertex))
}

/// Commit phase: detach every replaced street, then attach the surviving
/// split segments in one pass.
fn clean_graph(graph: &mut Graph, linker: NetworkLinker<'_>) -> Result<CommitStats, GraphError> {
    let replacements = linker.into_replacements();
    if replacements.is_empty() {
        return Ok(CommitStats::default());
    }
    let streets = replacements.len();
    let stats = replacements.commit(graph)?;
    info!(
        streets,
        removed = stats.removed,
        added = stats.added,
        suppressed = stats.suppressed,
        "committed street replacements"
    );
    Ok(stats)
}
