//! MatrixPool Worker
//!
//! Stateless compute process. Executes one matrix operation per call and
//! returns the result; holds no state between calls.

pub mod compute;
pub mod server;

pub use compute::execute;
pub use server::WorkerServer;
