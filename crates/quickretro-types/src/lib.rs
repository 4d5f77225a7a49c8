pub mod api;
pub mod envelope;
pub mod events;
pub mod limits;
pub mod models;
pub mod responses;
