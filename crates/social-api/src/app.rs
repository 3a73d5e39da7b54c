//! Startup wiring: open the configured backend, bootstrap it, bind the registry, start the decay worker.

use crate::config::{GraphBackend, ServiceConfig};
use crate::server::AppState;
use social_graph::{load_edge_list_file, BootstrapError, InMemoryGraphStore};
use social_recommend::{RecommenderRegistry, RegistryError};
use social_types::{GraphStore, GraphStoreError};
use social_weights::{InMemoryDecayScheduler, WeightModel};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("{0} backend is not compiled into this binary")]
    BackendNotCompiled(&'static str),
    #[error(transparent)]
    Store(#[from] GraphStoreError),
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

enum Backend {
    InProcess(Arc<dyn GraphStore>),
    #[cfg(feature = "neo4j")]
    Analytics(Arc<social_graph::Neo4jGraphStore>),
}

impl Backend {
    fn store(&self) -> Arc<dyn GraphStore> {
        match self {
            Backend::InProcess(store) => Arc::clone(store),
            #[cfg(feature = "neo4j")]
            Backend::Analytics(store) => store.clone(),
        }
    }
}

async fn open_backend(config: &ServiceConfig) -> Result<Backend, StartupError> {
    match config.backend {
        GraphBackend::Memory => Ok(Backend::InProcess(Arc::new(InMemoryGraphStore::new()))),
        #[cfg(feature = "sqlite")]
        GraphBackend::Sqlite => {
            info!(path = %config.sqlite_path.display(), "opening SQLite graph store");
            let store = social_graph::SqliteGraphStore::new(&config.sqlite_path)?;
            Ok(Backend::InProcess(Arc::new(store)))
        }
        #[cfg(feature = "neo4j")]
        GraphBackend::Neo4j => {
            let settings = &config.neo4j;
            let store = social_graph::Neo4jGraphStore::connect(social_graph::Neo4jConfig {
                uri: settings.uri.clone(),
                username: settings.username.clone(),
                password: settings.password.clone(),
                database: settings.database.clone(),
                ..Default::default()
            })
            .await?;
            Ok(Backend::Analytics(Arc::new(store)))
        }
        #[allow(unreachable_patterns)]
        other => Err(StartupError::BackendNotCompiled(other.as_str())),
    }
}

/// Build the shared state for the router. Must run inside a tokio runtime.
///
/// Bootstrap runs before the registry so an analytics backend projects the loaded graph.
pub async fn build_state(config: &ServiceConfig) -> Result<Arc<AppState>, StartupError> {
    let backend = open_backend(config).await?;
    let store = backend.store();
    info!(backend = store.backend_name(), "graph store ready");

    load_edge_list_file(store.as_ref(), &config.bootstrap_csv).await?;

    let registry = match backend {
        Backend::InProcess(store) => RecommenderRegistry::in_process(store),
        #[cfg(feature = "neo4j")]
        Backend::Analytics(store) => RecommenderRegistry::with_analytics(store).await?,
    };
    registry.validate(config.default_algorithm)?;

    let weights = Arc::new(WeightModel::new(Arc::clone(&store)));
    let scheduler = Arc::new(InMemoryDecayScheduler::new(
        Arc::clone(&weights),
        config.decay_interval,
    ));
    info!(
        interval_secs = config.decay_interval.map(|d| d.as_secs()),
        "decay scheduler started"
    );

    Ok(Arc::new(AppState {
        store,
        registry: Arc::new(registry),
        weights,
        scheduler,
        default_algorithm: config.default_algorithm,
    }))
}
