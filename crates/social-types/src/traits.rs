//! Traits for graph storage backends.

use crate::{FollowEdge, GraphSnapshot, Recommendation, WeightChange};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// Weight transform applied inside an atomic read-modify-write.
pub type WeightFn<'a> = &'a (dyn Fn(f64) -> f64 + Send + Sync);

/// Directed weighted follow graph.
///
/// Unknown users are never an error: lookups return empty sets or `0.0`.
/// Backend failures surface as [`GraphStoreError`] rather than empty results.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Short backend identifier (`memory`, `sqlite`, `neo4j`).
    fn backend_name(&self) -> &'static str;

    /// Create the vertex if absent.
    async fn add_user(&self, id: &str) -> Result<(), GraphStoreError>;

    /// Ensure both vertices exist, then create the edge or overwrite its weight.
    async fn add_or_update_edge(&self, from: &str, to: &str, weight: f64)
        -> Result<(), GraphStoreError>;

    async fn get_following(&self, user: &str) -> Result<HashSet<String>, GraphStoreError>;

    async fn get_followers(&self, user: &str) -> Result<HashSet<String>, GraphStoreError>;

    /// `0.0` when the edge or either vertex is absent.
    async fn get_connection_weight(&self, from: &str, to: &str) -> Result<f64, GraphStoreError>;

    /// Same as `add_or_update_edge`; creates the edge when missing.
    async fn update_connection_weight(
        &self,
        from: &str,
        to: &str,
        weight: f64,
    ) -> Result<(), GraphStoreError> {
        self.add_or_update_edge(from, to, weight).await
    }

    /// Atomically replace the weight of `from -> to` with `f(current)`.
    /// A missing edge reads as `0.0` and is created.
    async fn modify_connection_weight(
        &self,
        from: &str,
        to: &str,
        f: WeightFn<'_>,
    ) -> Result<WeightChange, GraphStoreError>;

    /// Multiply every existing edge weight by `factor`. Never adds or removes vertices or edges.
    /// Returns the number of edges touched.
    async fn scale_all_weights(&self, factor: f64) -> Result<usize, GraphStoreError>;

    /// Outgoing adjacency, one entry per vertex (sinks map to an empty set).
    async fn get_all_connections(&self) -> Result<HashMap<String, HashSet<String>>, GraphStoreError> {
        Ok(self.snapshot().await?.to_connections())
    }

    /// Consistent weighted snapshot of the whole graph.
    async fn snapshot(&self) -> Result<GraphSnapshot, GraphStoreError>;

    /// Snapshot covering at least [`GraphSnapshot::neighborhood`] of `user`. Backends where a full
    /// snapshot is a remote scan override this with a bounded read.
    async fn neighborhood(&self, user: &str) -> Result<GraphSnapshot, GraphStoreError> {
        Ok(self.snapshot().await?.neighborhood(user))
    }

    async fn is_empty(&self) -> Result<bool, GraphStoreError>;

    async fn clear(&self) -> Result<(), GraphStoreError>;

    /// All edges sorted by (from, to); diagnostics and visualization only.
    async fn export_edges(&self) -> Result<Vec<FollowEdge>, GraphStoreError>;
}

/// Capability of external analytics backends: a named projection plus a native ranking primitive.
#[async_trait]
pub trait GraphAnalytics: GraphStore {
    /// Create the projection if it does not exist. Fails when the backend cannot materialize it.
    async fn ensure_projection(&self) -> Result<(), GraphStoreError>;

    /// Drop and recreate the projection so it reflects current weights.
    async fn refresh_projection(&self) -> Result<(), GraphStoreError>;

    /// Weighted PageRank personalized to `source`, excluding `source` and its following,
    /// ordered by score desc then id asc, truncated to `limit`.
    async fn personalized_page_rank(
        &self,
        source: &str,
        damping: f64,
        limit: usize,
    ) -> Result<Vec<Recommendation>, GraphStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GraphStoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("graph query failed: {0}")]
    Query(String),
    #[error("concurrent update conflict: {0}")]
    Conflict(String),
    #[error("graph store error: {0}")]
    Other(String),
}

impl GraphStoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, GraphStoreError::Unavailable(_))
    }
}
