//! Wasit Core Library
//!
//! Shared types, error taxonomy, and configuration for the Wasit
//! directory-proxy decision core.

pub mod config;
pub mod error;
pub mod types;

pub use config::ProxyConfig;
pub use error::{Error, Result};

/// Wasit version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default proxy listen port
pub const DEFAULT_PORT: u16 = 10389;

/// Default proxy bind address
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
