//! Wasit Proxy decision core
//!
//! The per-session authorization state machine, the ordered multi-backend
//! bind protocol, the fan-out/aggregate search, and the static read-only
//! policy of the Wasit directory proxy. Message framing, codec, and the
//! accept loop live in the embedding transport; this crate only decides.

pub mod engine;
pub mod metrics;
mod search;
pub mod session;

pub use crate::metrics::{Action, BackendAction, ProxyMetrics};
pub use engine::ProxyEngine;
pub use session::Session;
