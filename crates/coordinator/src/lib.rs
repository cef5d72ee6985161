//! MatrixPool Coordinator
//!
//! Accepts matrix operations from clients and dispatches each one to the first
//! free worker in a static pool.

pub mod client;
pub mod dispatcher;
pub mod registry;
pub mod server;
pub mod shutdown;
pub mod worker_client;

pub use client::CoordinatorClient;
pub use dispatcher::Dispatcher;
pub use registry::{WorkerEntry, WorkerRegistry};
pub use server::CoordinatorServer;
pub use shutdown::ShutdownCoordinator;
pub use worker_client::{TcpWorkerConnector, WorkerConnector};
