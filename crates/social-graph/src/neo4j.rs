//! Neo4j-backed follow graph with a Graph Data Science projection for native PageRank.

use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, Query};
use crate::projection::ProjectionGuard;
use social_types::{
    FollowEdge, GraphAnalytics, GraphSnapshot, GraphStore, GraphStoreError, Recommendation,
    WeightChange, WeightFn,
};
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name of the GDS in-memory projection used for ranking.
pub const PROJECTION_NAME: &str = "social-graph";

pub use social_types::NATIVE_PAGE_RANK_TAG;

const CAS_ATTEMPTS: usize = 8;

/// Configuration for the Neo4j connection.
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: Option<String>,
    pub pool_size: usize,
    pub query_timeout: Duration,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "neo4j://localhost:7687".to_string(),
            username: "neo4j".to_string(),
            password: "password".to_string(),
            database: None,
            pool_size: 10,
            query_timeout: Duration::from_secs(30),
        }
    }
}

fn map_err(e: neo4rs::Error) -> GraphStoreError {
    match e {
        neo4rs::Error::IOError { .. } | neo4rs::Error::ConnectionError => {
            GraphStoreError::Unavailable(e.to_string())
        }
        other => GraphStoreError::Query(other.to_string()),
    }
}

fn row_err(e: impl std::fmt::Display) -> GraphStoreError {
    GraphStoreError::Query(format!("unexpected row shape: {}", e))
}

/// Graph store over Neo4j. Every call is one synchronous round trip bounded by `query_timeout`.
pub struct Neo4jGraphStore {
    graph: Graph,
    config: Neo4jConfig,
    /// Stale after any weight or structure change; rebuilt before the next ranking.
    projection: ProjectionGuard,
}

impl Neo4jGraphStore {
    /// Connect and verify the connection with a trivial query.
    pub async fn connect(config: Neo4jConfig) -> Result<Self, GraphStoreError> {
        let mut builder = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.username.as_str())
            .password(config.password.as_str())
            .max_connections(config.pool_size);
        if let Some(db) = &config.database {
            builder = builder.db(db.as_str());
        }
        let neo4j_config = builder
            .build()
            .map_err(|e| GraphStoreError::Unavailable(format!("invalid Neo4j config: {}", e)))?;
        let graph = Graph::connect(neo4j_config)
            .await
            .map_err(|e| GraphStoreError::Unavailable(e.to_string()))?;

        let store = Self {
            graph,
            config,
            projection: ProjectionGuard::new(true),
        };
        store.run(Query::new("RETURN 1 AS ok".to_string())).await?;
        info!(uri = %store.config.uri, "connected to Neo4j");
        Ok(store)
    }

    async fn timed<T, F>(&self, fut: F) -> Result<T, GraphStoreError>
    where
        F: Future<Output = Result<T, GraphStoreError>>,
    {
        tokio::time::timeout(self.config.query_timeout, fut)
            .await
            .map_err(|_| {
                GraphStoreError::Unavailable(format!(
                    "Neo4j call timed out after {:?}",
                    self.config.query_timeout
                ))
            })?
    }

    async fn run(&self, query: Query) -> Result<(), GraphStoreError> {
        self.timed(async { self.graph.run(query).await.map_err(map_err) })
            .await
    }

    async fn fetch(&self, query: Query) -> Result<Vec<neo4rs::Row>, GraphStoreError> {
        self.timed(async {
            let mut stream = self.graph.execute(query).await.map_err(map_err)?;
            let mut rows = Vec::new();
            while let Some(row) = stream.next().await.map_err(map_err)? {
                rows.push(row);
            }
            Ok(rows)
        })
        .await
    }

    async fn fetch_ids(&self, query: Query) -> Result<HashSet<String>, GraphStoreError> {
        self.fetch(query)
            .await?
            .into_iter()
            .map(|row| row.get::<String>("id").map_err(row_err))
            .collect()
    }

    fn mark_stale(&self) {
        self.projection.mark_stale();
    }

    async fn has_follows(&self) -> Result<bool, GraphStoreError> {
        let rows = self
            .fetch(Query::new("MATCH ()-[r:FOLLOWS]->() RETURN count(r) AS count".to_string()))
            .await?;
        match rows.first() {
            Some(row) => Ok(row.get::<i64>("count").map_err(row_err)? > 0),
            None => Ok(false),
        }
    }

    async fn projection_exists(&self) -> Result<bool, GraphStoreError> {
        let rows = self
            .fetch(Query::new("RETURN gds.graph.exists($name) AS exists".to_string()).param("name", PROJECTION_NAME))
            .await?;
        match rows.first() {
            Some(row) => row.get::<bool>("exists").map_err(row_err),
            None => Ok(false),
        }
    }

    async fn create_projection(&self) -> Result<(), GraphStoreError> {
        info!(projection = PROJECTION_NAME, "creating GDS projection");
        self.run(
            Query::new(
                "CALL gds.graph.project($name, 'User', \
                 {FOLLOWS: {type: 'FOLLOWS', orientation: 'NATURAL', properties: 'weight'}})"
                    .to_string(),
            )
            .param("name", PROJECTION_NAME),
        )
        .await
    }

    /// Drop and recreate. Callers hold the projection write guard.
    async fn rebuild_projection(&self) -> Result<(), GraphStoreError> {
        self.run(
            Query::new("CALL gds.graph.drop($name, false)".to_string())
                .param("name", PROJECTION_NAME),
        )
        .await?;
        self.create_projection().await
    }
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    fn backend_name(&self) -> &'static str {
        "neo4j"
    }

    async fn add_user(&self, id: &str) -> Result<(), GraphStoreError> {
        self.run(Query::new("MERGE (:User {id: $id})".to_string()).param("id", id))
            .await?;
        self.mark_stale();
        Ok(())
    }

    async fn add_or_update_edge(
        &self,
        from: &str,
        to: &str,
        weight: f64,
    ) -> Result<(), GraphStoreError> {
        self.run(
            Query::new(
                "MERGE (a:User {id: $from}) MERGE (b:User {id: $to}) \
                 MERGE (a)-[r:FOLLOWS]->(b) SET r.weight = $weight"
                    .to_string(),
            )
            .param("from", from)
            .param("to", to)
            .param("weight", weight),
        )
        .await?;
        self.mark_stale();
        Ok(())
    }

    async fn get_following(&self, user: &str) -> Result<HashSet<String>, GraphStoreError> {
        self.fetch_ids(
            Query::new("MATCH (:User {id: $id})-[:FOLLOWS]->(f:User) RETURN f.id AS id".to_string())
                .param("id", user),
        )
        .await
    }

    async fn get_followers(&self, user: &str) -> Result<HashSet<String>, GraphStoreError> {
        self.fetch_ids(
            Query::new("MATCH (f:User)-[:FOLLOWS]->(:User {id: $id}) RETURN f.id AS id".to_string())
                .param("id", user),
        )
        .await
    }

    async fn get_connection_weight(&self, from: &str, to: &str) -> Result<f64, GraphStoreError> {
        let rows = self
            .fetch(
                Query::new(
                    "MATCH (:User {id: $from})-[r:FOLLOWS]->(:User {id: $to}) RETURN r.weight AS weight"
                        .to_string(),
                )
                .param("from", from)
                .param("to", to),
            )
            .await?;
        match rows.first() {
            Some(row) => row.get::<f64>("weight").map_err(row_err),
            None => Ok(0.0),
        }
    }

    async fn modify_connection_weight(
        &self,
        from: &str,
        to: &str,
        f: WeightFn<'_>,
    ) -> Result<WeightChange, GraphStoreError> {
        // Compare-and-swap on r.weight; a missing edge is created at 0.0 and then swapped.
        for attempt in 1..=CAS_ATTEMPTS {
            let previous = self.get_connection_weight(from, to).await?;
            let current = f(previous);
            let rows = self
                .fetch(
                    Query::new(
                        "MERGE (a:User {id: $from}) MERGE (b:User {id: $to}) \
                         MERGE (a)-[r:FOLLOWS]->(b) ON CREATE SET r.weight = 0.0 \
                         WITH r WHERE r.weight = $expected \
                         SET r.weight = $next RETURN count(r) AS applied"
                            .to_string(),
                    )
                    .param("from", from)
                    .param("to", to)
                    .param("expected", previous)
                    .param("next", current),
                )
                .await?;
            let applied = match rows.first() {
                Some(row) => row.get::<i64>("applied").map_err(row_err)?,
                None => 0,
            };
            if applied > 0 {
                self.mark_stale();
                return Ok(WeightChange { previous, current });
            }
            debug!(from, to, attempt, "weight changed concurrently, retrying");
        }
        Err(GraphStoreError::Conflict(format!(
            "{} -> {} kept changing after {} attempts",
            from, to, CAS_ATTEMPTS
        )))
    }

    async fn scale_all_weights(&self, factor: f64) -> Result<usize, GraphStoreError> {
        let rows = self
            .fetch(
                Query::new(
                    "MATCH (:User)-[r:FOLLOWS]->(:User) SET r.weight = r.weight * $factor \
                     RETURN count(r) AS touched"
                        .to_string(),
                )
                .param("factor", factor),
            )
            .await?;
        self.mark_stale();
        let touched = match rows.first() {
            Some(row) => row.get::<i64>("touched").map_err(row_err)?,
            None => 0,
        };
        Ok(usize::try_from(touched).unwrap_or(0))
    }

    async fn snapshot(&self) -> Result<GraphSnapshot, GraphStoreError> {
        // One statement, so the read is consistent.
        let rows = self
            .fetch(Query::new(
                "MATCH (u:User) OPTIONAL MATCH (u)-[r:FOLLOWS]->(v:User) \
                 RETURN u.id AS from, v IS NOT NULL AS linked, \
                 coalesce(v.id, '') AS to, coalesce(r.weight, 0.0) AS weight"
                    .to_string(),
            ))
            .await?;
        let mut outgoing: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        for row in rows {
            let from: String = row.get("from").map_err(row_err)?;
            let targets = outgoing.entry(from).or_default();
            if row.get::<bool>("linked").map_err(row_err)? {
                let to: String = row.get("to").map_err(row_err)?;
                let weight: f64 = row.get("weight").map_err(row_err)?;
                targets.insert(to, weight);
            }
        }
        Ok(GraphSnapshot::new(outgoing))
    }

    async fn neighborhood(&self, user: &str) -> Result<GraphSnapshot, GraphStoreError> {
        // Out-edges of the user and of its followees, plus in-edges of second-hop vertices.
        let rows = self
            .fetch(
                Query::new(
                    "MATCH (u:User {id: $user})-[r:FOLLOWS]->(f:User) \
                     RETURN u.id AS from, f.id AS to, r.weight AS weight \
                     UNION \
                     MATCH (:User {id: $user})-[:FOLLOWS]->(f:User)-[r:FOLLOWS]->(c:User) \
                     RETURN f.id AS from, c.id AS to, r.weight AS weight \
                     UNION \
                     MATCH (:User {id: $user})-[:FOLLOWS]->(:User)-[:FOLLOWS]->(c:User)<-[r:FOLLOWS]-(x:User) \
                     RETURN x.id AS from, c.id AS to, r.weight AS weight"
                        .to_string(),
                )
                .param("user", user),
            )
            .await?;
        let edges = rows
            .into_iter()
            .map(|row| {
                Ok(FollowEdge {
                    from: row.get("from").map_err(row_err)?,
                    to: row.get("to").map_err(row_err)?,
                    weight: row.get("weight").map_err(row_err)?,
                })
            })
            .collect::<Result<Vec<_>, GraphStoreError>>()?;
        debug!(user, edges = edges.len(), "neighborhood read");
        Ok(GraphSnapshot::from_parts([user.to_string()], edges))
    }

    async fn is_empty(&self) -> Result<bool, GraphStoreError> {
        let rows = self
            .fetch(Query::new("MATCH (n:User) RETURN count(n) AS count".to_string()))
            .await?;
        match rows.first() {
            Some(row) => Ok(row.get::<i64>("count").map_err(row_err)? == 0),
            None => Ok(true),
        }
    }

    async fn clear(&self) -> Result<(), GraphStoreError> {
        self.run(Query::new("MATCH (n:User) DETACH DELETE n".to_string()))
            .await?;
        self.mark_stale();
        Ok(())
    }

    async fn export_edges(&self) -> Result<Vec<FollowEdge>, GraphStoreError> {
        let rows = self
            .fetch(Query::new(
                "MATCH (a:User)-[r:FOLLOWS]->(b:User) \
                 RETURN a.id AS from, b.id AS to, r.weight AS weight ORDER BY from, to"
                    .to_string(),
            ))
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(FollowEdge {
                    from: row.get("from").map_err(row_err)?,
                    to: row.get("to").map_err(row_err)?,
                    weight: row.get("weight").map_err(row_err)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl GraphAnalytics for Neo4jGraphStore {
    async fn ensure_projection(&self) -> Result<(), GraphStoreError> {
        // Fails here when the GDS plugin is missing.
        let rows = self
            .fetch(Query::new("RETURN gds.version() AS version".to_string()))
            .await?;
        if let Some(row) = rows.first() {
            let version: String = row.get("version").map_err(row_err)?;
            info!(gds_version = %version, "Graph Data Science available");
        }
        // GDS rejects projecting a relationship type with no relationships.
        if !self.has_follows().await? {
            warn!("no follow edges yet, projection deferred until first ranking");
            self.mark_stale();
            return Ok(());
        }
        // A projection left by an earlier process may not match the graph.
        self.refresh_projection().await
    }

    async fn refresh_projection(&self) -> Result<(), GraphStoreError> {
        self.projection.rebuild(|| self.rebuild_projection()).await
    }

    async fn personalized_page_rank(
        &self,
        source: &str,
        damping: f64,
        limit: usize,
    ) -> Result<Vec<Recommendation>, GraphStoreError> {
        if limit == 0 || !self.has_follows().await? {
            return Ok(Vec::new());
        }
        if !self.projection_exists().await? {
            self.mark_stale();
        }
        let _read = self.projection.fresh(|| self.rebuild_projection()).await?;
        let rows = self
            .fetch(
                Query::new(
                    "MATCH (source:User {id: $source}) \
                     CALL gds.pageRank.stream($name, {relationshipWeightProperty: 'weight', \
                       dampingFactor: $damping, sourceNodes: [source]}) \
                     YIELD nodeId, score \
                     WITH source, gds.util.asNode(nodeId) AS node, score \
                     WHERE node <> source AND score > 0 AND NOT (source)-[:FOLLOWS]->(node) \
                     RETURN node.id AS user, score ORDER BY score DESC, user ASC LIMIT $limit"
                        .to_string(),
                )
                .param("source", source)
                .param("name", PROJECTION_NAME)
                .param("damping", damping)
                .param("limit", i64::try_from(limit).unwrap_or(i64::MAX)),
            )
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(Recommendation::new(
                    row.get::<String>("user").map_err(row_err)?,
                    row.get::<f64>("score").map_err(row_err)?,
                    NATIVE_PAGE_RANK_TAG,
                ))
            })
            .collect()
    }
}
