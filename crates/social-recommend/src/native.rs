//! PageRank delegated to an analytics backend's native ranking primitive.

use crate::page_rank::DAMPING;
use crate::strategy::{RecommendError, Recommender};
use async_trait::async_trait;
use social_types::{Algorithm, GraphAnalytics, Recommendation, NATIVE_PAGE_RANK_TAG};
use std::sync::Arc;

pub struct NativePageRank<S> {
    store: Arc<S>,
}

impl<S: GraphAnalytics> NativePageRank<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S> Recommender for NativePageRank<S>
where
    S: GraphAnalytics + 'static,
{
    fn algorithm(&self) -> Algorithm {
        Algorithm::PageRank
    }

    fn tag(&self) -> &'static str {
        NATIVE_PAGE_RANK_TAG
    }

    async fn recommend(&self, user: &str, limit: usize) -> Result<Vec<Recommendation>, RecommendError> {
        if limit == 0 || self.store.get_following(user).await?.is_empty() {
            return Ok(Vec::new());
        }
        let ranked = self
            .store
            .personalized_page_rank(user, DAMPING, limit)
            .await?;
        tracing::debug!(user, backend = self.store.backend_name(), results = ranked.len(), "native pagerank done");
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeAnalytics;
    use social_types::{FollowEdge, GraphStore};

    #[tokio::test]
    async fn delegates_to_backend_and_keeps_contract() {
        let store = Arc::new(
            FakeAnalytics::from_edges(vec![
                FollowEdge::new("A", "B", 1.0),
                FollowEdge::new("B", "C", 1.0),
                FollowEdge::new("B", "D", 1.0),
            ])
            .await,
        );
        let rec = NativePageRank::new(Arc::clone(&store));
        let out = rec.recommend("A", 1).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target_user, "C");
        assert_eq!(out[0].algorithm, NATIVE_PAGE_RANK_TAG);
        assert_eq!(store.rank_calls(), 1);

        assert!(rec.recommend("D", 10).await.unwrap().is_empty());
        assert!(rec.recommend("A", 0).await.unwrap().is_empty());
        assert_eq!(store.rank_calls(), 1);
        assert_eq!(store.backend_name(), "fake-analytics");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_rankings_share_one_rebuild_after_mutation() {
        let store = Arc::new(
            FakeAnalytics::from_edges(vec![
                FollowEdge::new("A", "B", 1.0),
                FollowEdge::new("B", "C", 1.0),
                FollowEdge::new("B", "D", 1.0),
            ])
            .await,
        );
        let rec = Arc::new(NativePageRank::new(Arc::clone(&store)));

        for round in 1..=2 {
            let mut handles = Vec::new();
            for _ in 0..16 {
                let rec = Arc::clone(&rec);
                handles.push(tokio::spawn(async move { rec.recommend("A", 5).await }));
            }
            for h in handles {
                let out = h.await.unwrap().unwrap();
                assert!(out.iter().any(|r| r.target_user == "C"));
            }
            assert_eq!(store.projection_calls(), round);
            store.add_or_update_edge("D", "E", 1.0).await.unwrap();
        }
        assert_eq!(store.rank_calls(), 32);
    }
}
