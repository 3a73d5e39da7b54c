//! Follow recommendations: link-prediction strategies and the registry that binds them to a backend.

mod adamic_adar;
mod common_neighbors;
mod jaccard;
mod native;
mod page_rank;
mod registry;
mod strategy;

#[cfg(test)]
mod testing;

pub use adamic_adar::AdamicAdar;
pub use common_neighbors::CommonNeighbors;
pub use jaccard::Jaccard;
pub use native::NativePageRank;
pub use page_rank::{personalized_page_rank, PageRank, DAMPING, MAX_ITERATIONS, TOLERANCE};
pub use registry::{RecommenderRegistry, RegistryError};
pub use strategy::{rank, two_hop_candidates, RecommendError, Recommender};
