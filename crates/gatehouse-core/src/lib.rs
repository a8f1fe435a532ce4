//! Configuration and shared error types for Gatehouse.
//!
//! This crate holds the pieces every other Gatehouse crate agrees on: the
//! request authentication configuration that selects a driver, the gateway
//! configuration used by the server binary, and the core error type.

mod config;
mod error;

pub use config::{AuthConfig, DEFAULT_DRIVER, GatewayConfig, REQUEST_AUTH_DRIVER};
pub use error::{GatehouseError, GatehouseResult};
