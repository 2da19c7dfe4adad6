//! Graph synchronization engine: mirrors query results from a property-graph
//! database into keyed node/edge collections and writes edits back.

mod engine;
mod error;
pub mod executor;
pub mod mutation;
pub mod neo4j_http;
pub mod notify;
pub mod overlay;
pub mod parser;
pub mod reconcile;
pub mod store;
pub mod styles;
#[cfg(test)]
mod testing;
mod types;

pub use engine::{GraphSync, LoadOutcome, SyncConfig};
pub use error::{GraphError, Result};
pub use executor::Credentials;
pub use mutation::{NewConnectedNode, PropertyUpdate};
pub use notify::{Notice, Notifier, Severity};
pub use store::EntityStore;
pub use types::{
	Direction, EdgeId, GHOST_ID, GraphEdge, GraphNode, NodeId, NodeRenderer, Position, Properties,
	PropertyValue,
};
