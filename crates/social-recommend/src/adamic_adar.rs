//! Adamic-Adar: shared followees weighted by `1 / ln(out_degree)`, so hubs count less.

use crate::strategy::{recommend_from_snapshot, two_hop_candidates, RecommendError, Recommender};
use async_trait::async_trait;
use social_types::{Algorithm, GraphSnapshot, GraphStore, Recommendation};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct AdamicAdar {
    store: Arc<dyn GraphStore>,
}

impl AdamicAdar {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Every two-hop candidate starts at 0; each followee `f` with `d = out_degree(f) > 1`
    /// adds `1/ln(d)` to every candidate it follows.
    pub fn scores(snapshot: &GraphSnapshot, user: &str) -> BTreeMap<String, f64> {
        let Some(following) = snapshot.following(user) else {
            return BTreeMap::new();
        };
        let mut scores: BTreeMap<String, f64> = two_hop_candidates(snapshot, user)
            .into_iter()
            .map(|c| (c.to_string(), 0.0))
            .collect();
        for friend in following.keys() {
            let Some(targets) = snapshot.following(friend) else {
                continue;
            };
            let degree = targets.len();
            if degree <= 1 {
                continue;
            }
            let contribution = 1.0 / (degree as f64).ln();
            for candidate in targets.keys() {
                if let Some(score) = scores.get_mut(candidate) {
                    *score += contribution;
                }
            }
        }
        scores
    }
}

#[async_trait]
impl Recommender for AdamicAdar {
    fn algorithm(&self) -> Algorithm {
        Algorithm::AdamicAdar
    }

    async fn recommend(&self, user: &str, limit: usize) -> Result<Vec<Recommendation>, RecommendError> {
        recommend_from_snapshot(self.store.as_ref(), user, limit, self.tag(), Self::scores).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use social_types::FollowEdge;

    #[test]
    fn low_degree_intermediaries_weigh_more() {
        // c1 is reached through x (degree 2), c3 through the hub h (degree 4).
        let snapshot = GraphSnapshot::from_parts(
            Vec::new(),
            vec![
                FollowEdge::new("u", "x", 1.0),
                FollowEdge::new("u", "h", 1.0),
                FollowEdge::new("x", "c1", 1.0),
                FollowEdge::new("x", "c2", 1.0),
                FollowEdge::new("h", "c3", 1.0),
                FollowEdge::new("h", "c4", 1.0),
                FollowEdge::new("h", "c5", 1.0),
                FollowEdge::new("h", "c2", 1.0),
            ],
        );
        let scores = AdamicAdar::scores(&snapshot, "u");
        let ln2 = 2f64.ln();
        let ln4 = 4f64.ln();
        assert!((scores["c1"] - 1.0 / ln2).abs() < 1e-12);
        assert!((scores["c3"] - 1.0 / ln4).abs() < 1e-12);
        assert!((scores["c2"] - (1.0 / ln2 + 1.0 / ln4)).abs() < 1e-12);
        assert!(scores["c1"] > scores["c3"]);
    }

    #[test]
    fn degree_one_followees_contribute_nothing() {
        let snapshot = GraphSnapshot::from_parts(
            Vec::new(),
            vec![FollowEdge::new("u", "x", 1.0), FollowEdge::new("x", "c", 1.0)],
        );
        let scores = AdamicAdar::scores(&snapshot, "u");
        assert_eq!(scores.get("c"), Some(&0.0));
        assert!(scores.values().all(|s| *s >= 0.0));
    }

    #[tokio::test]
    async fn excludes_user_and_following() {
        let store: Arc<dyn GraphStore> = Arc::new(
            social_graph::InMemoryGraphStore::from_edges(vec![
                FollowEdge::new("u", "x", 1.0),
                FollowEdge::new("u", "y", 1.0),
                FollowEdge::new("x", "u", 1.0),
                FollowEdge::new("x", "y", 1.0),
                FollowEdge::new("x", "z", 1.0),
            ])
            .await,
        );
        let out = AdamicAdar::new(store).recommend("u", 10).await.unwrap();
        let ids: Vec<&str> = out.iter().map(|r| r.target_user.as_str()).collect();
        assert_eq!(ids, vec!["z"]);
        assert_eq!(out[0].algorithm, "adamic-adar");
    }
}
