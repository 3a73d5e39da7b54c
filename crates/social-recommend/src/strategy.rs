//! Recommender trait and the ranking helpers shared by every in-process strategy.

use async_trait::async_trait;
use social_types::{Algorithm, GraphSnapshot, GraphStore, GraphStoreError, Recommendation};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error(transparent)]
    Store(#[from] GraphStoreError),
}

/// One link-prediction strategy bound to a graph backend.
///
/// Contract: results are ordered by score desc then candidate id asc, hold at most `limit`
/// entries, and never contain `user` or anyone `user` already follows. Unknown users and users
/// with no outgoing edges get an empty list.
#[async_trait]
pub trait Recommender: Send + Sync {
    fn algorithm(&self) -> Algorithm;

    /// Tag written into every produced `Recommendation`.
    fn tag(&self) -> &'static str {
        self.algorithm().as_str()
    }

    async fn recommend(&self, user: &str, limit: usize) -> Result<Vec<Recommendation>, RecommendError>;
}

/// Following-of-following of `user`, minus `user` and everyone `user` already follows.
pub fn two_hop_candidates<'a>(snapshot: &'a GraphSnapshot, user: &str) -> BTreeSet<&'a str> {
    let Some(following) = snapshot.following(user) else {
        return BTreeSet::new();
    };
    following
        .keys()
        .filter_map(|friend| snapshot.following(friend))
        .flat_map(|targets| targets.keys())
        .map(String::as_str)
        .filter(|c| *c != user && !following.contains_key(*c))
        .collect()
}

/// Sort by score desc, ties by id asc, keep the first `limit`.
pub fn rank(scores: BTreeMap<String, f64>, limit: usize, tag: &str) -> Vec<Recommendation> {
    if limit == 0 {
        return Vec::new();
    }
    let mut ranked: Vec<(String, f64)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
        .into_iter()
        .map(|(user, score)| Recommendation::new(user, score, tag))
        .collect()
}

/// Read the neighborhood of `user`, score it, rank. No store lock is held while scoring.
pub(crate) async fn recommend_from_snapshot<F>(
    store: &dyn GraphStore,
    user: &str,
    limit: usize,
    tag: &str,
    score: F,
) -> Result<Vec<Recommendation>, RecommendError>
where
    F: FnOnce(&GraphSnapshot, &str) -> BTreeMap<String, f64>,
{
    if limit == 0 {
        return Ok(Vec::new());
    }
    let snapshot = store.neighborhood(user).await?;
    if snapshot.out_degree(user) == 0 {
        return Ok(Vec::new());
    }
    let scores = score(&snapshot, user);
    tracing::debug!(user, algorithm = tag, candidates = scores.len(), "scored candidates");
    Ok(rank(scores, limit, tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use social_types::FollowEdge;

    #[test]
    fn rank_breaks_ties_by_id_and_truncates() {
        let scores: BTreeMap<String, f64> = [("d", 1.0), ("c", 1.0), ("e", 2.0), ("f", 0.5)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let ranked = rank(scores, 3, "x");
        let ids: Vec<&str> = ranked.iter().map(|r| r.target_user.as_str()).collect();
        assert_eq!(ids, vec!["e", "c", "d"]);
        assert!(ranked.iter().all(|r| r.algorithm == "x"));
    }

    #[test]
    fn rank_with_zero_limit_is_empty() {
        let scores: BTreeMap<String, f64> = [("a".to_string(), 1.0)].into_iter().collect();
        assert!(rank(scores, 0, "x").is_empty());
    }

    #[test]
    fn candidates_skip_user_and_following() {
        let snapshot = GraphSnapshot::from_parts(
            Vec::new(),
            vec![
                FollowEdge::new("a", "b", 1.0),
                FollowEdge::new("a", "c", 1.0),
                FollowEdge::new("b", "a", 1.0),
                FollowEdge::new("b", "c", 1.0),
                FollowEdge::new("b", "d", 1.0),
                FollowEdge::new("c", "e", 1.0),
            ],
        );
        let candidates: Vec<&str> = two_hop_candidates(&snapshot, "a").into_iter().collect();
        assert_eq!(candidates, vec!["d", "e"]);
        assert!(two_hop_candidates(&snapshot, "ghost").is_empty());
    }
}
