//! Redis backends, shared by every server process of a deployment.

mod bridge;
mod codec;
mod store;

pub use bridge::RedisBridge;
pub use store::RedisStore;
