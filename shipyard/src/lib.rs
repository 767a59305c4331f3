//! Shipyard Library
//!
//! Core modules for the Shipyard build distribution service: the job queue,
//! the channel registry, intake from the API and CI webhooks, and live job
//! logs.

pub mod app;
pub mod authn;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod intake;
pub mod logs;
pub mod models;
pub mod queue;
pub mod registry;
pub mod server;
pub mod storage;
pub mod store;
pub mod streams;
pub mod utils;
pub mod webhooks;
