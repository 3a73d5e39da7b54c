//! Immutable weighted adjacency captured for the duration of one computation.

use crate::FollowEdge;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

type Adjacency = BTreeMap<String, BTreeMap<String, f64>>;

/// Outgoing adjacency (with weights) plus a derived inbound index.
/// Every vertex has an entry in `outgoing`, sinks map to an empty map.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    outgoing: Adjacency,
    incoming: BTreeMap<String, BTreeSet<String>>,
}

impl GraphSnapshot {
    pub fn new(outgoing: Adjacency) -> Self {
        let mut outgoing = outgoing;
        let targets: Vec<String> = outgoing
            .values()
            .flat_map(|targets| targets.keys().cloned())
            .collect();
        for to in targets {
            outgoing.entry(to).or_default();
        }
        let mut incoming: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (from, targets) in &outgoing {
            for to in targets.keys() {
                incoming.entry(to.clone()).or_default().insert(from.clone());
            }
        }
        Self { outgoing, incoming }
    }

    /// Build from a vertex list and an edge list (vertices may be isolated).
    pub fn from_parts<I, E>(vertices: I, edges: E) -> Self
    where
        I: IntoIterator<Item = String>,
        E: IntoIterator<Item = FollowEdge>,
    {
        let mut outgoing: Adjacency = BTreeMap::new();
        for v in vertices {
            outgoing.entry(v).or_default();
        }
        for edge in edges {
            outgoing
                .entry(edge.from)
                .or_default()
                .insert(edge.to, edge.weight);
        }
        Self::new(outgoing)
    }

    pub fn contains(&self, user: &str) -> bool {
        self.outgoing.contains_key(user)
    }

    pub fn vertex_count(&self) -> usize {
        self.outgoing.len()
    }

    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.outgoing.is_empty()
    }

    /// Vertices in ascending id order.
    pub fn vertices(&self) -> impl Iterator<Item = &str> {
        self.outgoing.keys().map(String::as_str)
    }

    /// Outgoing neighbors with weights; `None` for an unknown user.
    pub fn following(&self, user: &str) -> Option<&BTreeMap<String, f64>> {
        self.outgoing.get(user)
    }

    pub fn out_degree(&self, user: &str) -> usize {
        self.outgoing.get(user).map_or(0, BTreeMap::len)
    }

    pub fn followers(&self, user: &str) -> Option<&BTreeSet<String>> {
        self.incoming.get(user)
    }

    pub fn follows(&self, from: &str, to: &str) -> bool {
        self.outgoing
            .get(from)
            .is_some_and(|targets| targets.contains_key(to))
    }

    pub fn weight(&self, from: &str, to: &str) -> f64 {
        self.outgoing
            .get(from)
            .and_then(|targets| targets.get(to))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn edges(&self) -> impl Iterator<Item = FollowEdge> + '_ {
        self.outgoing.iter().flat_map(|(from, targets)| {
            targets
                .iter()
                .map(move |(to, weight)| FollowEdge::new(from.clone(), to.clone(), *weight))
        })
    }

    /// Sub-snapshot holding what neighborhood scoring reads for `user`: `user`'s out-edges,
    /// the out-edges of everyone `user` follows, and every in-edge of those second-hop vertices.
    pub fn neighborhood(&self, user: &str) -> GraphSnapshot {
        let Some(following) = self.outgoing.get(user) else {
            return GraphSnapshot::default();
        };
        let mut edges: Vec<FollowEdge> = Vec::new();
        let mut second_hop: BTreeSet<&str> = BTreeSet::new();
        for (friend, weight) in following {
            edges.push(FollowEdge::new(user, friend.clone(), *weight));
            for (candidate, weight) in self.outgoing.get(friend).into_iter().flatten() {
                edges.push(FollowEdge::new(friend.clone(), candidate.clone(), *weight));
                second_hop.insert(candidate.as_str());
            }
        }
        for candidate in second_hop {
            for follower in self.incoming.get(candidate).into_iter().flatten() {
                edges.push(FollowEdge::new(
                    follower.clone(),
                    candidate,
                    self.weight(follower, candidate),
                ));
            }
        }
        GraphSnapshot::from_parts([user.to_string()], edges)
    }

    /// Unweighted outgoing adjacency, one entry per vertex.
    pub fn to_connections(&self) -> HashMap<String, HashSet<String>> {
        self.outgoing
            .iter()
            .map(|(from, targets)| (from.clone(), targets.keys().cloned().collect()))
            .collect()
    }
}
