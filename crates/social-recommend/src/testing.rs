//! Analytics-capable store for tests: in-memory graph, a guarded projection, call counters.

use crate::page_rank::PageRank;
use crate::strategy::rank;
use async_trait::async_trait;
use social_graph::{InMemoryGraphStore, ProjectionGuard};
use social_types::{
    FollowEdge, GraphAnalytics, GraphSnapshot, GraphStore, GraphStoreError, Recommendation,
    WeightChange, WeightFn, NATIVE_PAGE_RANK_TAG,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) struct FakeAnalytics {
    inner: InMemoryGraphStore,
    projection_fails: bool,
    projection: ProjectionGuard,
    projections: AtomicUsize,
    ranks: AtomicUsize,
    neighborhoods: AtomicUsize,
}

impl FakeAnalytics {
    pub(crate) async fn from_edges(edges: Vec<FollowEdge>) -> Self {
        Self {
            inner: InMemoryGraphStore::from_edges(edges).await,
            projection_fails: false,
            projection: ProjectionGuard::new(true),
            projections: AtomicUsize::new(0),
            ranks: AtomicUsize::new(0),
            neighborhoods: AtomicUsize::new(0),
        }
    }

    pub(crate) fn without_projection() -> Self {
        Self {
            inner: InMemoryGraphStore::new(),
            projection_fails: true,
            projection: ProjectionGuard::new(true),
            projections: AtomicUsize::new(0),
            ranks: AtomicUsize::new(0),
            neighborhoods: AtomicUsize::new(0),
        }
    }

    pub(crate) fn projection_calls(&self) -> usize {
        self.projections.load(Ordering::SeqCst)
    }

    pub(crate) fn rank_calls(&self) -> usize {
        self.ranks.load(Ordering::SeqCst)
    }

    pub(crate) fn neighborhood_calls(&self) -> usize {
        self.neighborhoods.load(Ordering::SeqCst)
    }

    async fn build_projection(&self) -> Result<(), GraphStoreError> {
        self.projections.fetch_add(1, Ordering::SeqCst);
        if self.projection_fails {
            return Err(GraphStoreError::Unavailable("projection procedures missing".to_string()));
        }
        tokio::task::yield_now().await;
        Ok(())
    }
}

#[async_trait]
impl GraphStore for FakeAnalytics {
    fn backend_name(&self) -> &'static str {
        "fake-analytics"
    }

    async fn add_user(&self, id: &str) -> Result<(), GraphStoreError> {
        self.inner.add_user(id).await?;
        self.projection.mark_stale();
        Ok(())
    }

    async fn add_or_update_edge(&self, from: &str, to: &str, weight: f64) -> Result<(), GraphStoreError> {
        self.inner.add_or_update_edge(from, to, weight).await?;
        self.projection.mark_stale();
        Ok(())
    }

    async fn get_following(&self, user: &str) -> Result<HashSet<String>, GraphStoreError> {
        self.inner.get_following(user).await
    }

    async fn get_followers(&self, user: &str) -> Result<HashSet<String>, GraphStoreError> {
        self.inner.get_followers(user).await
    }

    async fn get_connection_weight(&self, from: &str, to: &str) -> Result<f64, GraphStoreError> {
        self.inner.get_connection_weight(from, to).await
    }

    async fn modify_connection_weight(
        &self,
        from: &str,
        to: &str,
        f: WeightFn<'_>,
    ) -> Result<WeightChange, GraphStoreError> {
        let change = self.inner.modify_connection_weight(from, to, f).await?;
        self.projection.mark_stale();
        Ok(change)
    }

    async fn scale_all_weights(&self, factor: f64) -> Result<usize, GraphStoreError> {
        let touched = self.inner.scale_all_weights(factor).await?;
        self.projection.mark_stale();
        Ok(touched)
    }

    async fn snapshot(&self) -> Result<GraphSnapshot, GraphStoreError> {
        self.inner.snapshot().await
    }

    async fn neighborhood(&self, user: &str) -> Result<GraphSnapshot, GraphStoreError> {
        self.neighborhoods.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.snapshot().await?.neighborhood(user))
    }

    async fn is_empty(&self) -> Result<bool, GraphStoreError> {
        self.inner.is_empty().await
    }

    async fn clear(&self) -> Result<(), GraphStoreError> {
        self.inner.clear().await?;
        self.projection.mark_stale();
        Ok(())
    }

    async fn export_edges(&self) -> Result<Vec<FollowEdge>, GraphStoreError> {
        self.inner.export_edges().await
    }
}

#[async_trait]
impl GraphAnalytics for FakeAnalytics {
    async fn ensure_projection(&self) -> Result<(), GraphStoreError> {
        self.refresh_projection().await
    }

    async fn refresh_projection(&self) -> Result<(), GraphStoreError> {
        self.projection.rebuild(|| self.build_projection()).await
    }

    async fn personalized_page_rank(
        &self,
        source: &str,
        _damping: f64,
        limit: usize,
    ) -> Result<Vec<Recommendation>, GraphStoreError> {
        self.ranks.fetch_add(1, Ordering::SeqCst);
        let _read = self.projection.fresh(|| self.build_projection()).await?;
        let snapshot = self.inner.snapshot().await?;
        Ok(rank(PageRank::scores(&snapshot, source), limit, NATIVE_PAGE_RANK_TAG))
    }
}
