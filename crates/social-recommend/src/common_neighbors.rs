//! Common neighbors: how many of the user's followees also follow the candidate.

use crate::strategy::{recommend_from_snapshot, two_hop_candidates, RecommendError, Recommender};
use async_trait::async_trait;
use social_types::{Algorithm, GraphSnapshot, GraphStore, Recommendation};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct CommonNeighbors {
    store: Arc<dyn GraphStore>,
}

impl CommonNeighbors {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// `|following(user) ∩ followers(candidate)|` for every two-hop candidate. Unweighted.
    pub fn scores(snapshot: &GraphSnapshot, user: &str) -> BTreeMap<String, f64> {
        let Some(following) = snapshot.following(user) else {
            return BTreeMap::new();
        };
        two_hop_candidates(snapshot, user)
            .into_iter()
            .map(|candidate| {
                let shared = snapshot
                    .followers(candidate)
                    .map_or(0, |followers| {
                        followers.iter().filter(|f| following.contains_key(*f)).count()
                    });
                (candidate.to_string(), shared as f64)
            })
            .collect()
    }
}

#[async_trait]
impl Recommender for CommonNeighbors {
    fn algorithm(&self) -> Algorithm {
        Algorithm::CommonNeighbors
    }

    async fn recommend(&self, user: &str, limit: usize) -> Result<Vec<Recommendation>, RecommendError> {
        recommend_from_snapshot(self.store.as_ref(), user, limit, self.tag(), Self::scores).await
    }
}
