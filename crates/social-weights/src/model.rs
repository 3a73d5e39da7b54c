//! Interaction-driven reinforcement and global decay of edge weights.

use social_types::{
    clamp_weight, GraphStore, GraphStoreError, InteractionEvent, InteractionKind, WeightChange,
};
use std::sync::Arc;

/// Share of the current weight kept before an interaction's increment is added.
pub const INTERACTION_RETENTION: f64 = 0.95;
/// Multiplier applied to every edge by one global decay sweep.
pub const GLOBAL_DECAY_FACTOR: f64 = 0.99;

#[derive(Debug, thiserror::Error)]
pub enum WeightError {
    #[error("invalid weight: {0}")]
    InvalidWeight(f64),
    #[error("graph: {0}")]
    Store(#[from] GraphStoreError),
}

/// Decay-then-reinforce rule, clamped to the weight range.
pub fn reinforced_weight(current: f64, kind: InteractionKind) -> f64 {
    clamp_weight(current * INTERACTION_RETENTION + kind.increment())
}

/// Reads and writes edge weights through the configured graph store.
pub struct WeightModel {
    store: Arc<dyn GraphStore>,
}

impl WeightModel {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Apply one interaction to `from -> to`, creating the edge if needed.
    /// The store performs the read-modify-write atomically, so concurrent events never lose updates.
    pub async fn update_weight_based_on_interaction(
        &self,
        event: &InteractionEvent,
    ) -> Result<WeightChange, WeightError> {
        let kind = event.kind;
        let change = self
            .store
            .modify_connection_weight(&event.from, &event.to, &move |w| {
                reinforced_weight(w, kind)
            })
            .await?;
        tracing::debug!(
            from = %event.from,
            to = %event.to,
            kind = %kind,
            previous = change.previous,
            current = change.current,
            "interaction applied"
        );
        Ok(change)
    }

    /// Set an edge weight directly, clamped to the weight range.
    pub async fn set_weight(&self, from: &str, to: &str, weight: f64) -> Result<f64, WeightError> {
        if !weight.is_finite() {
            return Err(WeightError::InvalidWeight(weight));
        }
        let clamped = clamp_weight(weight);
        self.store.add_or_update_edge(from, to, clamped).await?;
        Ok(clamped)
    }

    /// Decay every edge by 1%. Never adds or removes vertices or edges.
    pub async fn apply_global_decay(&self) -> Result<usize, WeightError> {
        let touched = self.store.scale_all_weights(GLOBAL_DECAY_FACTOR).await?;
        tracing::info!(edges = touched, "global decay applied");
        Ok(touched)
    }
}
