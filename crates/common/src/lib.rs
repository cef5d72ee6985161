//! MatrixPool common library
//!
//! This crate contains shared code used by the coordinator, the workers and
//! the client: error type, configuration, metrics and the RPC plumbing.

pub mod config;
pub mod error;
pub mod metrics;
pub mod rpc;

// Re-export commonly used types
pub use config::PoolConfig;
pub use error::{PoolError, Result};
pub use metrics::{MetricsRegistry, METRICS};
pub use rpc::{call, RpcServer};
