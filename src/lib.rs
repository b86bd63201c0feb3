//! Pocketpet: a small virtual-pet simulation.
//!
//! The library is the simulation core (timers, stat store, decay and reward,
//! evolution, the secret ritual). The `pocketpet` binary is a terminal
//! frontend that renders `PetEngine::snapshot` and forwards key presses.

pub mod clock;
pub mod config;
pub mod engine;
pub mod evolution;
pub mod model;
pub mod secret;
pub mod sim;
pub mod storage;
pub mod store;

pub use engine::{PetEngine, Snapshot};
pub use model::{ActionKind, AnimationCue, AvatarId, Mood, Notice, PetStats, Rules};
pub use storage::{FileStore, KeyValueStore, MemoryStore, PetStorage};
