#![warn(clippy::unwrap_used)]

//! Storage collaborators for the ranking core: candidate catalog, preference
//! store, interaction log and the per-investor bandit state repository.

pub mod memory;
pub mod redis_state;
pub mod seed;
pub mod traits;

pub use memory::{
    InMemoryCatalog, InMemoryInteractionLog, InMemoryPreferences, InMemoryStateRepository,
};
pub use redis_state::RedisStateRepository;
pub use traits::{BanditStateRepository, CandidateCatalog, InteractionLog, PreferenceStore};
