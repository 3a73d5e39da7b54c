//! In-memory follow graph behind a single read-write lock.

use social_types::{
    FollowEdge, GraphSnapshot, GraphStore, GraphStoreError, WeightChange, WeightFn,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

type OutIndex = HashMap<String, HashMap<String, f64>>;
type InIndex = HashMap<String, HashSet<String>>;

#[derive(Default)]
struct Adjacency {
    /// from -> (to -> weight). Every vertex has an entry.
    out_index: OutIndex,
    /// to -> from. Every vertex has an entry.
    in_index: InIndex,
}

impl Adjacency {
    fn ensure_vertex(&mut self, id: &str) {
        if !self.out_index.contains_key(id) {
            self.out_index.insert(id.to_string(), HashMap::new());
        }
        if !self.in_index.contains_key(id) {
            self.in_index.insert(id.to_string(), HashSet::new());
        }
    }

    fn upsert_edge(&mut self, from: &str, to: &str, weight: f64) {
        self.ensure_vertex(from);
        self.ensure_vertex(to);
        if let Some(targets) = self.out_index.get_mut(from) {
            targets.insert(to.to_string(), weight);
        }
        if let Some(sources) = self.in_index.get_mut(to) {
            sources.insert(from.to_string());
        }
    }

    fn weight(&self, from: &str, to: &str) -> f64 {
        self.out_index
            .get(from)
            .and_then(|targets| targets.get(to))
            .copied()
            .unwrap_or(0.0)
    }
}

/// In-memory implementation of GraphStore.
/// One lock guards both indexes so every operation observes a whole graph, never a half-written edge.
pub struct InMemoryGraphStore {
    graph: Arc<RwLock<Adjacency>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self {
            graph: Arc::new(RwLock::new(Adjacency::default())),
        }
    }

    /// Build a store from an edge list (test fixtures, bootstrap).
    pub async fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = FollowEdge>,
    {
        let store = Self::new();
        {
            let mut guard = store.graph.write().await;
            for edge in edges {
                guard.upsert_edge(&edge.from, &edge.to, edge.weight);
            }
        }
        store
    }
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl GraphStore for InMemoryGraphStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn add_user(&self, id: &str) -> Result<(), GraphStoreError> {
        let mut guard = self.graph.write().await;
        guard.ensure_vertex(id);
        Ok(())
    }

    async fn add_or_update_edge(
        &self,
        from: &str,
        to: &str,
        weight: f64,
    ) -> Result<(), GraphStoreError> {
        let mut guard = self.graph.write().await;
        guard.upsert_edge(from, to, weight);
        Ok(())
    }

    async fn get_following(&self, user: &str) -> Result<HashSet<String>, GraphStoreError> {
        let guard = self.graph.read().await;
        Ok(guard
            .out_index
            .get(user)
            .map(|targets| targets.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_followers(&self, user: &str) -> Result<HashSet<String>, GraphStoreError> {
        let guard = self.graph.read().await;
        Ok(guard.in_index.get(user).cloned().unwrap_or_default())
    }

    async fn get_connection_weight(&self, from: &str, to: &str) -> Result<f64, GraphStoreError> {
        let guard = self.graph.read().await;
        Ok(guard.weight(from, to))
    }

    async fn modify_connection_weight(
        &self,
        from: &str,
        to: &str,
        f: WeightFn<'_>,
    ) -> Result<WeightChange, GraphStoreError> {
        let mut guard = self.graph.write().await;
        let previous = guard.weight(from, to);
        let current = f(previous);
        guard.upsert_edge(from, to, current);
        Ok(WeightChange { previous, current })
    }

    async fn scale_all_weights(&self, factor: f64) -> Result<usize, GraphStoreError> {
        let mut guard = self.graph.write().await;
        let mut touched = 0usize;
        for targets in guard.out_index.values_mut() {
            for weight in targets.values_mut() {
                *weight *= factor;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn get_all_connections(
        &self,
    ) -> Result<HashMap<String, HashSet<String>>, GraphStoreError> {
        let guard = self.graph.read().await;
        Ok(guard
            .out_index
            .iter()
            .map(|(from, targets)| (from.clone(), targets.keys().cloned().collect()))
            .collect())
    }

    async fn snapshot(&self) -> Result<GraphSnapshot, GraphStoreError> {
        let outgoing: BTreeMap<String, BTreeMap<String, f64>> = {
            let guard = self.graph.read().await;
            guard
                .out_index
                .iter()
                .map(|(from, targets)| {
                    (
                        from.clone(),
                        targets.iter().map(|(to, w)| (to.clone(), *w)).collect(),
                    )
                })
                .collect()
        };
        Ok(GraphSnapshot::new(outgoing))
    }

    async fn is_empty(&self) -> Result<bool, GraphStoreError> {
        let guard = self.graph.read().await;
        Ok(guard.out_index.is_empty())
    }

    async fn clear(&self) -> Result<(), GraphStoreError> {
        let mut guard = self.graph.write().await;
        guard.out_index.clear();
        guard.in_index.clear();
        Ok(())
    }

    async fn export_edges(&self) -> Result<Vec<FollowEdge>, GraphStoreError> {
        let guard = self.graph.read().await;
        let mut edges: Vec<FollowEdge> = guard
            .out_index
            .iter()
            .flat_map(|(from, targets)| {
                targets
                    .iter()
                    .map(move |(to, w)| FollowEdge::new(from.clone(), to.clone(), *w))
            })
            .collect();
        // Keep export deterministic across hash-map ordering.
        edges.sort_by(|a, b| a.from.cmp(&b.from).then_with(|| a.to.cmp(&b.to)));
        Ok(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_users_read_as_empty() {
        let store = InMemoryGraphStore::new();
        assert!(store.is_empty().await.unwrap());
        assert!(store.get_following("ghost").await.unwrap().is_empty());
        assert!(store.get_followers("ghost").await.unwrap().is_empty());
        assert_eq!(store.get_connection_weight("ghost", "x").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn add_or_update_edge_is_idempotent() {
        let store = InMemoryGraphStore::new();
        store.add_or_update_edge("a", "b", 2.5).await.unwrap();
        store.add_or_update_edge("a", "b", 2.5).await.unwrap();

        assert_eq!(store.get_connection_weight("a", "b").await.unwrap(), 2.5);
        let following = store.get_following("a").await.unwrap();
        assert_eq!(following.len(), 1);
        assert!(following.contains("b"));
        assert_eq!(store.export_edges().await.unwrap().len(), 1);

        store.add_or_update_edge("a", "b", 4.0).await.unwrap();
        assert_eq!(store.get_connection_weight("a", "b").await.unwrap(), 4.0);
        assert_eq!(store.export_edges().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn add_user_is_idempotent_and_keeps_edges() {
        let store = InMemoryGraphStore::new();
        store.add_or_update_edge("a", "b", 1.0).await.unwrap();
        store.add_user("a").await.unwrap();
        store.add_user("z").await.unwrap();
        store.add_user("z").await.unwrap();

        let conns = store.get_all_connections().await.unwrap();
        assert_eq!(conns.len(), 3);
        assert!(conns["z"].is_empty());
        assert!(conns["b"].is_empty());
        assert!(conns["a"].contains("b"));
    }

    #[tokio::test]
    async fn self_loop_is_accepted() {
        let store = InMemoryGraphStore::new();
        store.add_or_update_edge("a", "a", 1.0).await.unwrap();
        assert!(store.get_following("a").await.unwrap().contains("a"));
        assert!(store.get_followers("a").await.unwrap().contains("a"));
    }

    #[tokio::test]
    async fn followers_track_incoming_edges() {
        let store = InMemoryGraphStore::new();
        store.add_or_update_edge("a", "c", 1.0).await.unwrap();
        store.add_or_update_edge("b", "c", 1.0).await.unwrap();
        let followers = store.get_followers("c").await.unwrap();
        assert_eq!(followers.len(), 2);
        assert!(followers.contains("a") && followers.contains("b"));
    }

    #[tokio::test]
    async fn update_connection_weight_creates_missing_edge() {
        let store = InMemoryGraphStore::new();
        store.update_connection_weight("x", "y", 3.0).await.unwrap();
        assert_eq!(store.get_connection_weight("x", "y").await.unwrap(), 3.0);
        assert!(store.get_followers("y").await.unwrap().contains("x"));
    }

    #[tokio::test]
    async fn concurrent_modifications_do_not_lose_updates() {
        let store = Arc::new(InMemoryGraphStore::new());
        let mut handles = Vec::new();
        for _ in 0..64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .modify_connection_weight("a", "b", &|w: f64| w + 1.0)
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.get_connection_weight("a", "b").await.unwrap(), 64.0);
    }

    #[tokio::test]
    async fn scale_all_weights_keeps_structure() {
        let store = InMemoryGraphStore::from_edges(vec![
            FollowEdge::new("a", "b", 2.0),
            FollowEdge::new("b", "c", 4.0),
        ])
        .await;
        store.add_user("d").await.unwrap();

        let touched = store.scale_all_weights(0.5).await.unwrap();
        assert_eq!(touched, 2);
        assert_eq!(
            store.export_edges().await.unwrap(),
            vec![FollowEdge::new("a", "b", 1.0), FollowEdge::new("b", "c", 2.0)]
        );
        assert_eq!(store.get_all_connections().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let store = InMemoryGraphStore::from_edges(vec![FollowEdge::new("a", "b", 1.0)]).await;
        assert!(!store.is_empty().await.unwrap());
        store.clear().await.unwrap();
        assert!(store.is_empty().await.unwrap());
        assert!(store.export_edges().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn snapshot_matches_store() {
        let store = InMemoryGraphStore::from_edges(vec![
            FollowEdge::new("a", "b", 1.0),
            FollowEdge::new("b", "c", 0.5),
        ])
        .await;
        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.vertex_count(), 3);
        assert_eq!(snapshot.weight("b", "c"), 0.5);
        assert_eq!(snapshot.edges().collect::<Vec<_>>(), store.export_edges().await.unwrap());
    }
}
