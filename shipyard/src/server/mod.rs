//! HTTP server

pub mod auth;
pub mod channels;
pub mod handlers;
pub mod jobs;
pub mod logs;
pub mod mappings;
pub mod serve;
pub mod state;
pub mod webhooks;

pub use serve::{router, serve};
pub use state::ServerState;
