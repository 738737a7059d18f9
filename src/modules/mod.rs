//! Concrete build stages

pub mod network_input;
pub mod street_index;
pub mod transit_to_street;

pub use network_input::{load_network, InputStats, NetworkFile, NetworkInputModule};
pub use street_index::StreetIndexModule;
pub use transit_to_street::{link_all, LinkSummary, TransitToStreetModule};
