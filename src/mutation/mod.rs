//! Optimistic mutation of the change graph

mod engine;
mod intent;

pub use engine::{MutationEngine, MutationError, MutationResult, Outcome};
pub use intent::{Intent, Inverse};
