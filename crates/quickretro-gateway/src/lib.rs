//! Realtime side of the board service: the hub that owns every live
//! connection of this process, the per-socket connection actor, and the
//! board event catalog.

pub mod connection;
pub mod events;
pub mod hub;

pub use hub::{Client, Hub, HubSettings, Peer};
