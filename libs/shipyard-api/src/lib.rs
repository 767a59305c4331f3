//! Shipyard API models
//!
//! Request/response bodies of the HTTP surface and the envelope of the
//! job log tail protocol. Shared by the server and by log-following clients.

pub mod models;

pub use models::*;
