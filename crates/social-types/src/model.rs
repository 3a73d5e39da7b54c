//! Domain model: follow edges, interactions, algorithms, recommendations.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Upper bound of an edge weight.
pub const MAX_WEIGHT: f64 = 10.0;
/// Lower bound of an edge weight.
pub const MIN_WEIGHT: f64 = 0.0;

/// Clamp a weight into `[MIN_WEIGHT, MAX_WEIGHT]`.
pub fn clamp_weight(weight: f64) -> f64 {
    weight.clamp(MIN_WEIGHT, MAX_WEIGHT)
}

/// Directed weighted "follows" relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowEdge {
    pub from: String,
    pub to: String,
    pub weight: f64,
}

impl FollowEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, weight: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            weight,
        }
    }
}

/// Observed interaction between two users; each kind reinforces the edge by a fixed increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionKind {
    Like,
    Comment,
    Share,
    DirectMessage,
    VideoCall,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 5] = [
        InteractionKind::Like,
        InteractionKind::Comment,
        InteractionKind::Share,
        InteractionKind::DirectMessage,
        InteractionKind::VideoCall,
    ];

    pub fn increment(self) -> f64 {
        match self {
            InteractionKind::Like => 0.1,
            InteractionKind::Comment => 0.5,
            InteractionKind::Share => 1.0,
            InteractionKind::DirectMessage => 2.0,
            InteractionKind::VideoCall => 5.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InteractionKind::Like => "LIKE",
            InteractionKind::Comment => "COMMENT",
            InteractionKind::Share => "SHARE",
            InteractionKind::DirectMessage => "DIRECT_MESSAGE",
            InteractionKind::VideoCall => "VIDEO_CALL",
        }
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; accepts `DIRECT_MESSAGE`, `direct-message`, `directmessage`.
impl FromStr for InteractionKind {
    type Err = InvalidInteraction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "LIKE" => Ok(InteractionKind::Like),
            "COMMENT" => Ok(InteractionKind::Comment),
            "SHARE" => Ok(InteractionKind::Share),
            "DIRECT_MESSAGE" | "DIRECTMESSAGE" => Ok(InteractionKind::DirectMessage),
            "VIDEO_CALL" | "VIDEOCALL" => Ok(InteractionKind::VideoCall),
            _ => Err(InvalidInteraction(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid interaction type: {0}")]
pub struct InvalidInteraction(pub String);

/// Transient interaction event consumed by the weight model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionEvent {
    pub from: String,
    pub to: String,
    pub kind: InteractionKind,
}

impl InteractionEvent {
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: InteractionKind) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
        }
    }
}

/// Link-prediction algorithm identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    CommonNeighbors,
    Jaccard,
    AdamicAdar,
    #[serde(rename = "pagerank")]
    PageRank,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::CommonNeighbors,
        Algorithm::Jaccard,
        Algorithm::AdamicAdar,
        Algorithm::PageRank,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::CommonNeighbors => "common-neighbors",
            Algorithm::Jaccard => "jaccard",
            Algorithm::AdamicAdar => "adamic-adar",
            Algorithm::PageRank => "pagerank",
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = InvalidAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "common-neighbors" => Ok(Algorithm::CommonNeighbors),
            "jaccard" => Ok(Algorithm::Jaccard),
            "adamic-adar" => Ok(Algorithm::AdamicAdar),
            "pagerank" | "page-rank" => Ok(Algorithm::PageRank),
            _ => Err(InvalidAlgorithm(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid algorithm: {0}")]
pub struct InvalidAlgorithm(pub String);

/// Tag of recommendations ranked natively by an analytics backend.
pub const NATIVE_PAGE_RANK_TAG: &str = "pagerank-neo4j";

/// Scored candidate produced by a recommender. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub target_user: String,
    pub score: f64,
    pub algorithm: String,
}

impl Recommendation {
    pub fn new(target_user: impl Into<String>, score: f64, algorithm: impl Into<String>) -> Self {
        Self {
            target_user: target_user.into(),
            score,
            algorithm: algorithm.into(),
        }
    }
}

/// Outcome of an atomic read-modify-write on one edge weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightChange {
    pub previous: f64,
    pub current: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interaction_kind_parses_loosely() {
        assert_eq!("like".parse::<InteractionKind>(), Ok(InteractionKind::Like));
        assert_eq!(
            "direct-message".parse::<InteractionKind>(),
            Ok(InteractionKind::DirectMessage)
        );
        assert_eq!(
            "VIDEO_CALL".parse::<InteractionKind>(),
            Ok(InteractionKind::VideoCall)
        );
        assert!("poke".parse::<InteractionKind>().is_err());
    }

    #[test]
    fn interaction_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&InteractionKind::DirectMessage).unwrap();
        assert_eq!(json, "\"DIRECT_MESSAGE\"");
        let kind: InteractionKind = serde_json::from_str("\"VIDEO_CALL\"").unwrap();
        assert_eq!(kind, InteractionKind::VideoCall);
    }

    #[test]
    fn algorithm_identifiers_round_trip_through_display() {
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.as_str().parse::<Algorithm>(), Ok(algorithm));
        }
        assert_eq!(
            "gnn".parse::<Algorithm>(),
            Err(InvalidAlgorithm("gnn".to_string()))
        );
        let json = serde_json::to_string(&Algorithm::PageRank).unwrap();
        assert_eq!(json, "\"pagerank\"");
    }

    #[test]
    fn clamp_weight_bounds() {
        assert_eq!(clamp_weight(12.5), MAX_WEIGHT);
        assert_eq!(clamp_weight(-1.0), MIN_WEIGHT);
        assert_eq!(clamp_weight(3.25), 3.25);
    }
}
