//! progtrack-store: in-memory unit-of-work store with optional JSON snapshot persistence

pub mod memory;
pub mod snapshot;

pub use memory::{FailPoint, MemoryStore, MemoryTx};
pub use snapshot::Snapshot;
