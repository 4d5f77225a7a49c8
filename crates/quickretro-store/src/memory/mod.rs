//! In-process backends. Used when no Redis URL is configured and by tests.

mod bridge;
mod store;

pub use bridge::{MemoryBridge, MemoryBus};
pub use store::MemoryStore;
