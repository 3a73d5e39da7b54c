//! Service configuration read from `SOCIAL_*` environment variables.

use social_types::Algorithm;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8001";
pub const DEFAULT_BOOTSTRAP_CSV: &str = "graph.csv";
pub const DEFAULT_SQLITE_PATH: &str = "social-graph.db";
pub const DEFAULT_DECAY_INTERVAL_SECS: u64 = 600;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Which graph store the process runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphBackend {
    Memory,
    Sqlite,
    Neo4j,
}

impl GraphBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            GraphBackend::Memory => "memory",
            GraphBackend::Sqlite => "sqlite",
            GraphBackend::Neo4j => "neo4j",
        }
    }
}

impl FromStr for GraphBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => Ok(GraphBackend::Memory),
            "sqlite" => Ok(GraphBackend::Sqlite),
            "neo4j" => Ok(GraphBackend::Neo4j),
            _ => Err(()),
        }
    }
}

/// Connection settings for the Neo4j backend.
#[derive(Debug, Clone)]
pub struct Neo4jSettings {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub listen: SocketAddr,
    pub backend: GraphBackend,
    pub sqlite_path: PathBuf,
    pub neo4j: Neo4jSettings,
    /// Missing file means the graph starts empty.
    pub bootstrap_csv: PathBuf,
    /// `None` disables periodic decay; on-demand sweeps still work.
    pub decay_interval: Option<Duration>,
    pub default_algorithm: Algorithm,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let listen_raw = get("SOCIAL_LISTEN").unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen = listen_raw
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidValue {
                key: "SOCIAL_LISTEN",
                value: listen_raw.clone(),
            })?;

        let backend = match get("SOCIAL_GRAPH_BACKEND") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "SOCIAL_GRAPH_BACKEND",
                value: raw,
            })?,
            None => GraphBackend::Memory,
        };

        let decay_secs = match get("SOCIAL_DECAY_INTERVAL_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: "SOCIAL_DECAY_INTERVAL_SECS",
                value: raw,
            })?,
            None => DEFAULT_DECAY_INTERVAL_SECS,
        };

        let default_algorithm = match get("SOCIAL_DEFAULT_ALGORITHM") {
            Some(raw) => raw.parse::<Algorithm>().map_err(|_| ConfigError::InvalidValue {
                key: "SOCIAL_DEFAULT_ALGORITHM",
                value: raw,
            })?,
            None => Algorithm::CommonNeighbors,
        };

        Ok(Self {
            listen,
            backend,
            sqlite_path: get("SOCIAL_SQLITE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SQLITE_PATH)),
            neo4j: Neo4jSettings {
                uri: get("SOCIAL_NEO4J_URI").unwrap_or_else(|| "neo4j://localhost:7687".to_string()),
                username: get("SOCIAL_NEO4J_USER").unwrap_or_else(|| "neo4j".to_string()),
                password: get("SOCIAL_NEO4J_PASSWORD").unwrap_or_default(),
                database: get("SOCIAL_NEO4J_DATABASE"),
            },
            bootstrap_csv: get("SOCIAL_BOOTSTRAP_CSV")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BOOTSTRAP_CSV)),
            decay_interval: (decay_secs > 0).then(|| Duration::from_secs(decay_secs)),
            default_algorithm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = from_map(&[]).unwrap();
        assert_eq!(config.listen, DEFAULT_LISTEN.parse::<SocketAddr>().unwrap());
        assert_eq!(config.backend, GraphBackend::Memory);
        assert_eq!(config.bootstrap_csv, PathBuf::from("graph.csv"));
        assert_eq!(config.decay_interval, Some(Duration::from_secs(600)));
        assert_eq!(config.default_algorithm, Algorithm::CommonNeighbors);
        assert!(config.neo4j.database.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = from_map(&[
            ("SOCIAL_LISTEN", "127.0.0.1:9000"),
            ("SOCIAL_GRAPH_BACKEND", "SQLite"),
            ("SOCIAL_SQLITE_PATH", "/tmp/g.db"),
            ("SOCIAL_DECAY_INTERVAL_SECS", "0"),
            ("SOCIAL_DEFAULT_ALGORITHM", "pagerank"),
            ("SOCIAL_NEO4J_DATABASE", "social"),
        ])
        .unwrap();
        assert_eq!(config.listen.port(), 9000);
        assert_eq!(config.backend, GraphBackend::Sqlite);
        assert_eq!(config.sqlite_path, PathBuf::from("/tmp/g.db"));
        assert_eq!(config.decay_interval, None);
        assert_eq!(config.default_algorithm, Algorithm::PageRank);
        assert_eq!(config.neo4j.database.as_deref(), Some("social"));
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = from_map(&[("SOCIAL_DEFAULT_ALGORITHM", "gnn")]).unwrap_err();
        assert!(err.to_string().contains("SOCIAL_DEFAULT_ALGORITHM"));
        assert!(from_map(&[("SOCIAL_GRAPH_BACKEND", "redis")]).is_err());
        assert!(from_map(&[("SOCIAL_DECAY_INTERVAL_SECS", "-1")]).is_err());
        assert!(from_map(&[("SOCIAL_LISTEN", "nowhere")]).is_err());
    }
}
