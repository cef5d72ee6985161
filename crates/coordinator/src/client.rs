//! Client for the coordinator
//!
//! Validates operation shapes before anything is sent. The workers assume
//! shapes are valid, so a request that fails here must never be dispatched.

use matrixpool_common::{rpc, PoolError, Result};
use matrixpool_proto::{methods, Matrix, Operation, OperationKind, OperationResult};
use tracing::debug;

/// Default coordinator address
pub const DEFAULT_COORDINATOR: &str = "localhost:8080";

/// Coordinator client
#[derive(Debug, Clone)]
pub struct CoordinatorClient {
    address: String,
}

impl CoordinatorClient {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Validate `op` and submit it to the coordinator
    pub async fn submit(&self, op: &Operation) -> Result<OperationResult> {
        validate(op)?;
        debug!("Submitting {} to coordinator at {}", op.kind, self.address);
        rpc::call(&self.address, methods::PROCESS_REQUEST, op).await
    }

    /// Ask the coordinator to shut down; returns its acknowledgement
    pub async fn shutdown(&self) -> Result<String> {
        rpc::call(&self.address, methods::SHUTDOWN, &String::new()).await
    }
}

/// (rows, columns) of a non-empty rectangular matrix
pub fn dimensions(matrix: &Matrix, name: &str) -> Result<(usize, usize)> {
    let rows = matrix.len();
    let cols = matrix.first().map_or(0, Vec::len);

    if rows == 0 || cols == 0 {
        return Err(PoolError::invalid_input(format!("{} must not be empty", name)));
    }

    if let Some(row) = matrix.iter().position(|r| r.len() != cols) {
        return Err(PoolError::invalid_input(format!(
            "{} row {} has {} columns, expected {}",
            name,
            row + 1,
            matrix[row].len(),
            cols
        )));
    }

    Ok((rows, cols))
}

/// Check shape invariants for `op`
pub fn validate(op: &Operation) -> Result<()> {
    let (rows_a, cols_a) = dimensions(&op.matrix_a, "Matrix A")?;

    let second = || {
        op.matrix_b
            .as_ref()
            .ok_or_else(|| PoolError::invalid_input(format!("{} requires a second matrix", op.kind)))
            .and_then(|b| dimensions(b, "Matrix B"))
    };

    match op.kind {
        OperationKind::Transpose => Ok(()),
        OperationKind::Add => {
            let (rows_b, cols_b) = second()?;
            if (rows_a, cols_a) != (rows_b, cols_b) {
                return Err(PoolError::invalid_input(format!(
                    "Matrix dimensions are not compatible for addition: {}x{} + {}x{}",
                    rows_a, cols_a, rows_b, cols_b
                )));
            }
            Ok(())
        }
        OperationKind::Multiply => {
            let (rows_b, cols_b) = second()?;
            if cols_a != rows_b {
                return Err(PoolError::invalid_input(format!(
                    "Matrix dimensions are not compatible for multiplication: {}x{} * {}x{}",
                    rows_a, cols_a, rows_b, cols_b
                )));
            }
            Ok(())
        }
        OperationKind::Unknown(ref other) => {
            Err(PoolError::invalid_input(format!("Unsupported operation: {}", other)))
        }
    }
}
