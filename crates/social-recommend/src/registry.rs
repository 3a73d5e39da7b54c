//! Fixed mapping from algorithm to a strategy bound to the active backend. Built once at startup.

use crate::{AdamicAdar, CommonNeighbors, Jaccard, NativePageRank, PageRank, Recommender};
use social_types::{Algorithm, GraphAnalytics, GraphStore, GraphStoreError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid algorithm: {0}")]
    InvalidAlgorithm(String),
    #[error("algorithm {algorithm} is not supported by the {backend} backend")]
    Unsupported { algorithm: Algorithm, backend: String },
    #[error(transparent)]
    Store(#[from] GraphStoreError),
}

pub struct RecommenderRegistry {
    backend: String,
    strategies: BTreeMap<Algorithm, Arc<dyn Recommender>>,
}

impl RecommenderRegistry {
    /// All four strategies computed in-process over store snapshots.
    pub fn in_process(store: Arc<dyn GraphStore>) -> Self {
        let backend = store.backend_name();
        let strategies: Vec<Arc<dyn Recommender>> = vec![
            Arc::new(CommonNeighbors::new(Arc::clone(&store))),
            Arc::new(Jaccard::new(Arc::clone(&store))),
            Arc::new(AdamicAdar::new(Arc::clone(&store))),
            Arc::new(PageRank::new(store)),
        ];
        Self::from_strategies(backend, strategies)
    }

    /// Neighborhood strategies in-process, PageRank native to the backend.
    /// Fails when the backend cannot materialize its projection.
    pub async fn with_analytics<S>(store: Arc<S>) -> Result<Self, RegistryError>
    where
        S: GraphAnalytics + 'static,
    {
        store.ensure_projection().await?;
        let backend = store.backend_name();
        let dyn_store: Arc<dyn GraphStore> = store.clone();
        let strategies: Vec<Arc<dyn Recommender>> = vec![
            Arc::new(CommonNeighbors::new(Arc::clone(&dyn_store))),
            Arc::new(Jaccard::new(Arc::clone(&dyn_store))),
            Arc::new(AdamicAdar::new(dyn_store)),
            Arc::new(NativePageRank::new(store)),
        ];
        Ok(Self::from_strategies(backend, strategies))
    }

    /// Explicit binding list. A later strategy for the same algorithm replaces an earlier one.
    pub fn from_strategies<I>(backend: impl Into<String>, strategies: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Recommender>>,
    {
        let strategies: BTreeMap<Algorithm, Arc<dyn Recommender>> = strategies
            .into_iter()
            .map(|s| (s.algorithm(), s))
            .collect();
        let registry = Self {
            backend: backend.into(),
            strategies,
        };
        info!(
            backend = %registry.backend,
            algorithms = ?registry.algorithms(),
            "recommender registry ready"
        );
        registry
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn get_recommender(&self, algorithm: Algorithm) -> Result<Arc<dyn Recommender>, RegistryError> {
        self.strategies
            .get(&algorithm)
            .cloned()
            .ok_or_else(|| RegistryError::Unsupported {
                algorithm,
                backend: self.backend.clone(),
            })
    }

    /// Parse an identifier and look it up.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Recommender>, RegistryError> {
        let algorithm = name
            .parse::<Algorithm>()
            .map_err(|e| RegistryError::InvalidAlgorithm(e.0))?;
        self.get_recommender(algorithm)
    }

    /// Startup check that the configured default is bound.
    pub fn validate(&self, default_algorithm: Algorithm) -> Result<(), RegistryError> {
        self.get_recommender(default_algorithm).map(|_| ())
    }

    /// Bound algorithms in enum order.
    pub fn algorithms(&self) -> Vec<Algorithm> {
        self.strategies.keys().copied().collect()
    }
}
