//! Storage and pub/sub collaborators of the board hub.
//!
//! Both concerns are expressed as traits so the hub never knows whether it
//! runs alone against the in-memory backends or as one of several processes
//! sharing a Redis instance.

pub mod bridge;
pub mod error;
pub mod keys;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use bridge::{Bridge, Delivery, Publication};
pub use error::{StoreError, StoreResult};
pub use store::BoardStore;
