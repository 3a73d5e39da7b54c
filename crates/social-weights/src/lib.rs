//! Dynamic edge weights: interaction reinforcement, global decay, and the decay sweep scheduler.

mod memory;
mod model;
mod trait_;

pub use memory::InMemoryDecayScheduler;
pub use model::{
    reinforced_weight, WeightError, WeightModel, GLOBAL_DECAY_FACTOR, INTERACTION_RETENTION,
};
pub use trait_::{DecayScheduler, SchedulerError};
