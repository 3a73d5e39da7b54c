//! Follow graph store implementations and edge-list bootstrap.

mod bootstrap;
mod memory;
mod projection;

#[cfg(feature = "neo4j")]
mod neo4j;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use bootstrap::{load_edge_list, load_edge_list_file, BootstrapError, BootstrapReport};
pub use memory::InMemoryGraphStore;
pub use projection::ProjectionGuard;
pub use social_types::{
    FollowEdge, GraphAnalytics, GraphSnapshot, GraphStore, GraphStoreError, WeightChange,
};

#[cfg(feature = "neo4j")]
pub use neo4j::{Neo4jConfig, Neo4jGraphStore, NATIVE_PAGE_RANK_TAG, PROJECTION_NAME};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteGraphStore;
