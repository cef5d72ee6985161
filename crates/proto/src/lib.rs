//! MatrixPool wire protocol
//!
//! Shared request/result records, the RPC envelope that carries them, and the
//! length-prefixed frame codec used on every TCP connection.

pub mod codec;
pub mod operation;
pub mod rpc;

pub use codec::{
    read_message, read_message_with_limit, write_message, write_message_with_limit, FrameError, MAX_FRAME_SIZE,
};
pub use operation::{Matrix, Operation, OperationError, OperationKind, OperationResult};
pub use rpc::{RpcRequest, RpcResponse};

/// Remote method names
pub mod methods {
    /// Coordinator-hosted entry point called by clients
    pub const PROCESS_REQUEST: &str = "Coordinator.ProcessRequest";

    /// Coordinator-hosted administrative shutdown
    pub const SHUTDOWN: &str = "Coordinator.Shutdown";

    /// Worker-hosted compute entry point, called only by the coordinator
    pub const COMPUTE: &str = "Worker.Compute";
}
