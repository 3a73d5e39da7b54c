//! Core types and traits for the follow-graph recommender.
//!
//! Request/response DTOs mirror the JSON envelope used by the HTTP surface.

mod dto;
mod model;
mod snapshot;
mod traits;

pub use dto::*;
pub use model::*;
pub use snapshot::GraphSnapshot;
pub use traits::*;
