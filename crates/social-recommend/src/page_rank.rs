//! Personalized PageRank computed in-process by power iteration over a snapshot.

use crate::strategy::{rank, RecommendError, Recommender};
use async_trait::async_trait;
use social_types::{Algorithm, GraphSnapshot, GraphStore, Recommendation};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub const DAMPING: f64 = 0.85;
pub const MAX_ITERATIONS: usize = 100;
/// L1 distance between successive iterates below which iteration stops.
pub const TOLERANCE: f64 = 1e-9;

/// Stationary visit probability of every vertex for a walk that restarts at `source`.
///
/// Transitions follow edge weights proportionally; a vertex whose out-weights sum to 0 splits
/// uniformly. Teleport and dangling mass both return to `source`. Unknown `source` gives an
/// empty map.
pub fn personalized_page_rank(
    snapshot: &GraphSnapshot,
    source: &str,
    damping: f64,
) -> BTreeMap<String, f64> {
    let vertices: Vec<&str> = snapshot.vertices().collect();
    let index: HashMap<&str, usize> = vertices.iter().enumerate().map(|(i, v)| (*v, i)).collect();
    let Some(&src) = index.get(source) else {
        return BTreeMap::new();
    };

    let transitions: Vec<Vec<(usize, f64)>> = vertices
        .iter()
        .map(|v| {
            let Some(targets) = snapshot.following(v) else {
                return Vec::new();
            };
            let total: f64 = targets.values().map(|w| w.max(0.0)).sum();
            let uniform = 1.0 / targets.len().max(1) as f64;
            targets
                .iter()
                .filter_map(|(to, w)| {
                    let p = if total > 0.0 { w.max(0.0) / total } else { uniform };
                    index.get(to.as_str()).map(|&j| (j, p))
                })
                .collect()
        })
        .collect();

    let n = vertices.len();
    let mut scores = vec![0.0; n];
    scores[src] = 1.0;
    let mut next = vec![0.0; n];

    for _ in 0..MAX_ITERATIONS {
        next.iter_mut().for_each(|s| *s = 0.0);
        let mut dangling = 0.0;
        for (u, edges) in transitions.iter().enumerate() {
            if edges.is_empty() {
                dangling += scores[u];
                continue;
            }
            for &(v, p) in edges {
                next[v] += damping * scores[u] * p;
            }
        }
        next[src] += (1.0 - damping) + damping * dangling;

        let delta: f64 = scores.iter().zip(&next).map(|(a, b)| (a - b).abs()).sum();
        std::mem::swap(&mut scores, &mut next);
        if delta < TOLERANCE {
            break;
        }
    }

    vertices
        .into_iter()
        .zip(scores)
        .map(|(v, s)| (v.to_string(), s))
        .collect()
}

/// In-process personalized PageRank recommender (memory and sqlite backends).
pub struct PageRank {
    store: Arc<dyn GraphStore>,
}

impl PageRank {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Positive-score vertices other than `user` and its following.
    pub fn scores(snapshot: &GraphSnapshot, user: &str) -> BTreeMap<String, f64> {
        let following = snapshot.following(user);
        personalized_page_rank(snapshot, user, DAMPING)
            .into_iter()
            .filter(|(v, s)| {
                *s > 0.0 && v != user && !following.is_some_and(|f| f.contains_key(v))
            })
            .collect()
    }
}

#[async_trait]
impl Recommender for PageRank {
    fn algorithm(&self) -> Algorithm {
        Algorithm::PageRank
    }

    async fn recommend(&self, user: &str, limit: usize) -> Result<Vec<Recommendation>, RecommendError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let snapshot = self.store.snapshot().await?;
        if snapshot.out_degree(user) == 0 {
            return Ok(Vec::new());
        }
        let scores = Self::scores(&snapshot, user);
        tracing::debug!(
            user,
            vertices = snapshot.vertex_count(),
            candidates = scores.len(),
            "personalized pagerank done"
        );
        Ok(rank(scores, limit, self.tag()))
    }
}
