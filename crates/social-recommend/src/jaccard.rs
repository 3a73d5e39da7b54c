//! Jaccard similarity between the user's followees and the candidate's followers.

use crate::strategy::{recommend_from_snapshot, two_hop_candidates, RecommendError, Recommender};
use async_trait::async_trait;
use social_types::{Algorithm, GraphSnapshot, GraphStore, Recommendation};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct Jaccard {
    store: Arc<dyn GraphStore>,
}

impl Jaccard {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// `|F ∩ P| / |F ∪ P|` with F = following(user), P = followers(candidate); 0 on an empty union.
    pub fn scores(snapshot: &GraphSnapshot, user: &str) -> BTreeMap<String, f64> {
        let Some(following) = snapshot.following(user) else {
            return BTreeMap::new();
        };
        two_hop_candidates(snapshot, user)
            .into_iter()
            .map(|candidate| {
                let (intersection, followers) = snapshot.followers(candidate).map_or((0, 0), |p| {
                    (p.iter().filter(|f| following.contains_key(*f)).count(), p.len())
                });
                let union = following.len() + followers - intersection;
                let score = if union == 0 {
                    0.0
                } else {
                    intersection as f64 / union as f64
                };
                (candidate.to_string(), score)
            })
            .collect()
    }
}

#[async_trait]
impl Recommender for Jaccard {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Jaccard
    }

    async fn recommend(&self, user: &str, limit: usize) -> Result<Vec<Recommendation>, RecommendError> {
        recommend_from_snapshot(self.store.as_ref(), user, limit, self.tag(), Self::scores).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use social_graph::InMemoryGraphStore;
    use social_types::FollowEdge;

    #[tokio::test]
    async fn half_overlap_scores_one_half() {
        // following(A) = {B}, followers(C) = followers(D) = {B, E}
        let store: Arc<dyn GraphStore> = Arc::new(
            InMemoryGraphStore::from_edges(vec![
                FollowEdge::new("A", "B", 1.0),
                FollowEdge::new("B", "C", 1.0),
                FollowEdge::new("B", "D", 1.0),
                FollowEdge::new("E", "C", 1.0),
                FollowEdge::new("E", "D", 1.0),
            ])
            .await,
        );
        let out = Jaccard::new(store).recommend("A", 10).await.unwrap();
        assert_eq!(
            out,
            vec![
                Recommendation::new("C", 0.5, "jaccard"),
                Recommendation::new("D", 0.5, "jaccard"),
            ]
        );
    }

    #[test]
    fn single_shared_followee_is_full_overlap() {
        let snapshot = GraphSnapshot::from_parts(
            Vec::new(),
            vec![
                FollowEdge::new("A", "B", 1.0),
                FollowEdge::new("B", "C", 1.0),
                FollowEdge::new("B", "D", 1.0),
            ],
        );
        let scores = Jaccard::scores(&snapshot, "A");
        assert_eq!(scores.get("C"), Some(&1.0));
        assert_eq!(scores.get("D"), Some(&1.0));
    }

    #[test]
    fn scores_stay_in_unit_interval() {
        let snapshot = GraphSnapshot::from_parts(
            Vec::new(),
            vec![
                FollowEdge::new("u", "a", 1.0),
                FollowEdge::new("u", "b", 1.0),
                FollowEdge::new("a", "x", 1.0),
                FollowEdge::new("b", "x", 1.0),
                FollowEdge::new("a", "y", 1.0),
                FollowEdge::new("z", "y", 1.0),
                FollowEdge::new("w", "y", 1.0),
            ],
        );
        let scores = Jaccard::scores(&snapshot, "u");
        assert_eq!(scores.len(), 2);
        assert!(scores.values().all(|s| (0.0..=1.0).contains(s)));
        assert_eq!(scores["x"], 1.0);
        assert_eq!(scores["y"], 0.25);
    }
}
