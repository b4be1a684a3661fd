//! Indexed event memory for Flotilla.
//!
//! A bounded, in-process store of historical events (task outcomes, agent
//! activity) that agents and the coordinator consult for context. Entries are
//! tag-indexed for cheap filtered retrieval and evicted oldest-first past a
//! configurable cap.
//!
//! The store shares the workspace's locking discipline: one `RwLock` guards
//! the history and its indexes, and every caller treats store failures as
//! non-fatal (log and continue).

pub mod store;
pub mod types;

pub use store::MemoryStore;
pub use types::{MemoryConfig, MemoryEntry, MemoryQuery};
