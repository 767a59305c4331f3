//! Client side of the HTTP API

pub mod client;
pub mod sse;
pub mod tail;

pub use client::HttpClient;
pub use tail::TailClient;
