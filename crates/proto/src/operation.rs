//! Operation and result records
//!
//! These are pure data definitions. Shape validation belongs to the submitting
//! side; nothing here checks that matrices are rectangular or compatible.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Row-major integer matrix (rows of columns)
pub type Matrix = Vec<Vec<i64>>;

/// Requested computation kind
///
/// Travels as a lowercase string. Anything unrecognised decodes into
/// `Unknown` so the worker can answer with an error result instead of the
/// call failing to decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationKind {
    Add,
    Transpose,
    Multiply,
    Unknown(String),
}

impl OperationKind {
    pub fn as_str(&self) -> &str {
        match self {
            OperationKind::Add => "add",
            OperationKind::Transpose => "transpose",
            OperationKind::Multiply => "multiply",
            OperationKind::Unknown(other) => other,
        }
    }

    /// Whether this kind consumes a second operand
    pub fn is_binary(&self) -> bool {
        matches!(self, OperationKind::Add | OperationKind::Multiply)
    }
}

impl From<String> for OperationKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "add" => OperationKind::Add,
            "transpose" => OperationKind::Transpose,
            "multiply" => OperationKind::Multiply,
            _ => OperationKind::Unknown(value),
        }
    }
}

impl From<OperationKind> for String {
    fn from(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Unknown(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requested computation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,

    pub matrix_a: Matrix,

    /// Second operand; only meaningful for add and multiply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix_b: Option<Matrix>,
}

impl Operation {
    pub fn add(a: Matrix, b: Matrix) -> Self {
        Self {
            kind: OperationKind::Add,
            matrix_a: a,
            matrix_b: Some(b),
        }
    }

    pub fn multiply(a: Matrix, b: Matrix) -> Self {
        Self {
            kind: OperationKind::Multiply,
            matrix_a: a,
            matrix_b: Some(b),
        }
    }

    pub fn transpose(a: Matrix) -> Self {
        Self {
            kind: OperationKind::Transpose,
            matrix_a: a,
            matrix_b: None,
        }
    }
}

/// Domain failures surfaced to the caller inside an [`OperationResult`]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    #[error("No available workers")]
    NoAvailableWorkers,

    #[error("Worker connection failed")]
    WorkerConnectionFailed,

    #[error("Worker computation failed")]
    WorkerComputationFailed,

    #[error("Invalid operation")]
    InvalidOperation,
}

/// Outcome of one operation
///
/// Built fresh per request. `matrix` is set on success, `error` on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Matrix>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationResult {
    pub fn success(matrix: Matrix) -> Self {
        Self {
            matrix: Some(matrix),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            matrix: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Collapse into a std `Result`, treating a missing matrix as an empty one
    pub fn into_result(self) -> std::result::Result<Matrix, String> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.matrix.unwrap_or_default()),
        }
    }
}

impl From<OperationError> for OperationResult {
    fn from(err: OperationError) -> Self {
        OperationResult::failure(err.to_string())
    }
}
