//! HTTP API module.
//!
//! Provides the REST control surface for the scheduling engine.

pub mod error;
pub mod models;
pub mod openapi;
pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
