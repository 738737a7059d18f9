//! JSON network input stage
//!
//! Loads street nodes, streets and point facilities from a network file:
//!
//! ```json
//! {
//!   "nodes":   [{ "id": "a", "x": 0.0, "y": 0.0 }],
//!   "streets": [{ "from": "a", "to": "b", "name": "Main St",
//!                 "points": [[5.0, 1.0]], "oneway": false,
//!                 "permission": ["walk", "bike"], "wheelchair": true }],
//!   "stops":   [{ "id": "s1", "name": "Central", "x": 5.0, "y": 5.0,
//!                 "parent": null, "entrance": false, "wheelchair": true }],
//!   "bike_rental_stations": [{ "id": "r1", "name": "Dock", "x": 1.0, "y": 1.0 }],
//!   "bike_parks":           [{ "id": "p1", "name": "Racks", "x": 2.0, "y": 2.0 }]
//! }
//! ```

use geo::{Coord, LineString};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::builder::{GraphBuilderModule, Scratch};
use crate::error::ModuleError;
use crate::graph::{
    EdgeKind, Graph, Permission, StreetEdge, TransitStop, VertexId, VertexKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Walk,
    Bike,
    Car,
}

impl Mode {
    fn permission(self) -> Permission {
        match self {
            Mode::Walk => Permission::WALK,
            Mode::Bike => Permission::BIKE,
            Mode::Car => Permission::CAR,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

fn all_modes() -> Vec<Mode> {
    vec![Mode::Walk, Mode::Bike, Mode::Car]
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreetRecord {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Intermediate shape points between the two nodes
    #[serde(default)]
    pub points: Vec<[f64; 2]>,
    #[serde(default)]
    pub oneway: bool,
    #[serde(default = "all_modes")]
    pub permission: Vec<Mode>,
    #[serde(default = "yes")]
    pub wheelchair: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub x: f64,
    pub y: f64,
    /// Station this stop is an entrance of
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub entrance: bool,
    #[serde(default)]
    pub wheelchair: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FacilityRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkFile {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub streets: Vec<StreetRecord>,
    #[serde(default)]
    pub stops: Vec<StopRecord>,
    #[serde(default)]
    pub bike_rental_stations: Vec<FacilityRecord>,
    #[serde(default)]
    pub bike_parks: Vec<FacilityRecord>,
}

impl NetworkFile {
    pub fn read(path: &Path) -> Result<Self, ModuleError> {
        let text = std::fs::read_to_string(path).map_err(|source| ModuleError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ModuleError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Counts of what one network file contributed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputStats {
    pub nodes: usize,
    pub street_edges: usize,
    pub stops: usize,
    pub bike_rental_stations: usize,
    pub bike_parks: usize,
}

impl InputStats {
    fn facilities(&self) -> usize {
        self.stops + self.bike_rental_stations + self.bike_parks
    }
}

pub struct NetworkInputModule {
    path: PathBuf,
}

impl NetworkInputModule {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl GraphBuilderModule for NetworkInputModule {
    fn name(&self) -> &str {
        "network input"
    }

    fn provides(&self) -> &[&'static str] {
        &["streets", "transit"]
    }

    fn check_inputs(&self) -> Result<(), ModuleError> {
        if !self.path.is_file() {
            return Err(ModuleError::MissingInput(self.path.clone()));
        }
        std::fs::File::open(&self.path).map_err(|source| ModuleError::Read {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    fn build_graph(&mut self, graph: &mut Graph, _scratch: &mut Scratch) -> Result<(), ModuleError> {
        let network = NetworkFile::read(&self.path)?;
        let stats = load_network(graph, &network)?;
        info!(
            path = %self.path.display(),
            nodes = stats.nodes,
            street_edges = stats.street_edges,
            stops = stats.stops,
            bike_rental_stations = stats.bike_rental_stations,
            bike_parks = stats.bike_parks,
            "loaded network"
        );
        Ok(())
    }
}

/// Add the contents of a network file to the graph and raise the
/// capability flags for what was added.
pub fn load_network(graph: &mut Graph, network: &NetworkFile) -> Result<InputStats, ModuleError> {
    let mut stats = InputStats::default();

    let mut nodes: FxHashMap<&str, VertexId> = FxHashMap::default();
    for node in &network.nodes {
        let id = graph.add_vertex(node.id.clone(), Coord { x: node.x, y: node.y }, VertexKind::Street);
        if nodes.insert(node.id.as_str(), id).is_some() {
            return Err(ModuleError::InvalidInput(format!("duplicate node id {}", node.id)));
        }
        stats.nodes += 1;
    }

    for street in &network.streets {
        let lookup = |id: &str| {
            nodes.get(id).copied().ok_or_else(|| {
                ModuleError::InvalidInput(format!("street references unknown node {id}"))
            })
        };
        let from = lookup(&street.from)?;
        let to = lookup(&street.to)?;

        let start = graph.vertex(from).map(|v| v.coord).ok_or_else(|| {
            ModuleError::InvalidInput(format!("node {} vanished", street.from))
        })?;
        let end = graph.vertex(to).map(|v| v.coord).ok_or_else(|| {
            ModuleError::InvalidInput(format!("node {} vanished", street.to))
        })?;
        let mut coords = Vec::with_capacity(street.points.len() + 2);
        coords.push(start);
        coords.extend(street.points.iter().map(|&[x, y]| Coord { x, y }));
        coords.push(end);

        let permission = street
            .permission
            .iter()
            .fold(Permission::NONE, |acc, mode| acc | mode.permission());
        let name = street
            .name
            .clone()
            .unwrap_or_else(|| format!("{}-{}", street.from, street.to));
        let mut forward = StreetEdge::new(name, LineString::new(coords), permission);
        forward.wheelchair_accessible = street.wheelchair;

        if !street.oneway {
            let backward = forward.reversed();
            graph.add_edge(from, to, EdgeKind::Street(forward))?;
            graph.add_edge(to, from, EdgeKind::Street(backward))?;
            stats.street_edges += 2;
        } else {
            graph.add_edge(from, to, EdgeKind::Street(forward))?;
            stats.street_edges += 1;
        }
    }

    let mut stops: FxHashMap<&str, VertexId> = FxHashMap::default();
    for stop in &network.stops {
        let name = stop.name.clone().unwrap_or_else(|| stop.id.clone());
        let payload = if stop.entrance {
            TransitStop::entrance(stop.id.clone(), name)
        } else {
            TransitStop::new(stop.id.clone(), name)
        }
        .with_wheelchair_entrance(stop.wheelchair);
        let id = graph.add_vertex(
            format!("stop {}", stop.id),
            Coord { x: stop.x, y: stop.y },
            VertexKind::TransitStop(payload),
        );
        if stops.insert(stop.id.as_str(), id).is_some() {
            return Err(ModuleError::InvalidInput(format!("duplicate stop id {}", stop.id)));
        }
        stats.stops += 1;
    }

    // Entrances are registered on their station once every stop exists
    for stop in &network.stops {
        let Some(parent) = &stop.parent else {
            continue;
        };
        let parent_id = stops.get(parent.as_str()).copied().ok_or_else(|| {
            ModuleError::InvalidInput(format!("stop {} has unknown parent {parent}", stop.id))
        })?;
        let Some(&entrance_id) = stops.get(stop.id.as_str()) else {
            continue;
        };
        let Some(VertexKind::TransitStop(station)) = graph.vertex_mut(parent_id).map(|v| &mut v.kind) else {
            continue;
        };
        station.entrances.push(entrance_id);
        if stop.wheelchair {
            station.wheelchair_entrance = true;
        }
        debug!(station = %parent, entrance = %stop.id, "registered entrance");
    }

    for station in &network.bike_rental_stations {
        graph.add_vertex(
            format!("bike rental {}", station.id),
            Coord { x: station.x, y: station.y },
            VertexKind::BikeRentalStation {
                station_id: station.id.clone(),
                name: station.name.clone().unwrap_or_else(|| station.id.clone()),
            },
        );
        stats.bike_rental_stations += 1;
    }

    for park in &network.bike_parks {
        graph.add_vertex(
            format!("bike park {}", park.id),
            Coord { x: park.x, y: park.y },
            VertexKind::BikePark {
                park_id: park.id.clone(),
                name: park.name.clone().unwrap_or_else(|| park.id.clone()),
            },
        );
        stats.bike_parks += 1;
    }

    if stats.street_edges > 0 {
        graph.has_streets = true;
    }
    if stats.facilities() > 0 {
        graph.has_transit = true;
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::VertexClass;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const NETWORK: &str = r#"{
        "nodes": [
            { "id": "a", "x": 0.0, "y": 0.0 },
            { "id": "b", "x": 10.0, "y": 0.0 },
            { "id": "c", "x": 10.0, "y": 10.0 }
        ],
        "streets": [
            { "from": "a", "to": "b", "name": "Main St" },
            { "from": "b", "to": "c", "oneway": true, "permission": ["car"] }
        ],
        "stops": [
            { "id": "station", "name": "Central", "x": 5.0, "y": 5.0 },
            { "id": "door", "x": 5.0, "y": 1.0, "parent": "station", "entrance": true, "wheelchair": true }
        ],
        "bike_rental_stations": [{ "id": "r1", "x": 1.0, "y": 1.0 }],
        "bike_parks": []
    }"#;

    fn network_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_loads_streets_and_facilities() {
        let file = network_file(NETWORK);
        let mut module = NetworkInputModule::new(file.path());
        module.check_inputs().unwrap();

        let mut graph = Graph::new();
        module.build_graph(&mut graph, &mut Scratch::new()).unwrap();

        assert!(graph.has_streets);
        assert!(graph.has_transit);
        // twin pair plus one oneway street
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.snapshot_vertices(VertexClass::TransitStop).len(), 2);
        assert_eq!(graph.snapshot_vertices(VertexClass::BikeRentalStation).len(), 1);

        let main = graph.street_edges().find(|e| e.street().unwrap().name == "Main St").unwrap();
        assert!(graph.find_twin(main.id).is_some());

        let car_only = graph.street_edges().find(|e| e.street().unwrap().name == "b-c").unwrap();
        assert!(!car_only.street().unwrap().permission.allows_walk_or_bike());
        graph.check_invariants().unwrap();
    }

    #[test]
    fn test_entrances_attach_to_station() {
        let network: NetworkFile = serde_json::from_str(NETWORK).unwrap();
        let mut graph = Graph::new();
        load_network(&mut graph, &network).unwrap();

        let station = graph.vertices().find(|v| v.label == "stop station").unwrap();
        let door = graph.vertices().find(|v| v.label == "stop door").unwrap();
        assert!(station.has_entrances());
        assert!(station.has_wheelchair_entrance());
        assert!(!station.is_entrance());
        assert!(door.is_entrance());
        assert_eq!(station.transit_stop().unwrap().entrances, vec![door.id]);
    }

    #[test]
    fn test_missing_file_fails_check() {
        let module = NetworkInputModule::new("/definitely/not/here.json");
        assert!(matches!(module.check_inputs(), Err(ModuleError::MissingInput(_))));
    }

    #[test]
    fn test_unknown_node_is_invalid_input() {
        let network: NetworkFile = serde_json::from_str(
            r#"{ "nodes": [{ "id": "a", "x": 0, "y": 0 }], "streets": [{ "from": "a", "to": "zz" }] }"#,
        )
        .unwrap();
        let mut graph = Graph::new();
        assert!(matches!(
            load_network(&mut graph, &network),
            Err(ModuleError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let file = network_file("{ not json");
        let mut module = NetworkInputModule::new(file.path());
        let err = module.build_graph(&mut Graph::new(), &mut Scratch::new()).unwrap_err();
        assert!(matches!(err, ModuleError::Parse { .. }));
    }

    #[test]
    fn test_streets_only_leaves_transit_flag_down() {
        let network: NetworkFile = serde_json::from_str(
            r#"{ "nodes": [{ "id": "a", "x": 0, "y": 0 }, { "id": "b", "x": 1, "y": 0 }],
                 "streets": [{ "from": "a", "to": "b" }] }"#,
        )
        .unwrap();
        let mut graph = Graph::new();
        let stats = load_network(&mut graph, &network).unwrap();
        assert_eq!(stats.street_edges, 2);
        assert!(graph.has_streets);
        assert!(!graph.has_transit);
    }
}
