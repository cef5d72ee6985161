//! Matrix kernels and the worker compute entry point
//!
//! Kernels assume shapes were validated by the submitting side. Integer
//! arithmetic wraps on overflow.

use matrixpool_common::metrics::LatencyTimer;
use matrixpool_common::METRICS;
use matrixpool_proto::{Matrix, Operation, OperationError, OperationKind, OperationResult};
use rayon::prelude::*;
use tracing::{debug, warn};

/// Execute one operation
///
/// Never fails at the call level; an unrecognised kind, or a binary kind with
/// no second operand, comes back as an "Invalid operation" result.
pub fn execute(op: &Operation) -> OperationResult {
    let matrix = match (&op.kind, op.matrix_b.as_ref()) {
        (OperationKind::Add, Some(b)) => timed(&op.kind, || add(&op.matrix_a, b)),
        (OperationKind::Multiply, Some(b)) => timed(&op.kind, || multiply(&op.matrix_a, b)),
        (OperationKind::Transpose, _) => timed(&op.kind, || transpose(&op.matrix_a)),
        (kind, _) => {
            warn!("Rejecting invalid operation {:?}", kind);
            if METRICS.is_enabled() {
                METRICS.worker.invalid_operations.inc();
            }
            return OperationError::InvalidOperation.into();
        }
    };

    debug!(
        "Computed {} -> {}x{}",
        op.kind,
        matrix.len(),
        matrix.first().map_or(0, Vec::len)
    );

    OperationResult::success(matrix)
}

fn timed<F>(kind: &OperationKind, f: F) -> Matrix
where
    F: FnOnce() -> Matrix,
{
    if !METRICS.is_enabled() {
        return f();
    }
    METRICS
        .worker
        .computations_total
        .with_label_values(&[kind.as_str()])
        .inc();
    METRICS.worker.compute_duration.time(f)
}

/// Elementwise sum; `a` and `b` must have the same shape
pub fn add(a: &Matrix, b: &Matrix) -> Matrix {
    a.iter()
        .zip(b)
        .map(|(row_a, row_b)| {
            row_a
                .iter()
                .zip(row_b)
                .map(|(&x, &y)| x.wrapping_add(y))
                .collect()
        })
        .collect()
}

/// Matrix product; columns of `a` must equal rows of `b`
///
/// Output rows are computed in parallel.
pub fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    let cols = b.first().map_or(0, Vec::len);

    a.par_iter()
        .map(|row| {
            (0..cols)
                .map(|j| {
                    row.iter()
                        .zip(b)
                        .fold(0i64, |sum, (&x, b_row)| sum.wrapping_add(x.wrapping_mul(b_row[j])))
                })
                .collect()
        })
        .collect()
}

/// Transpose; `result[j][i] == a[i][j]`
pub fn transpose(a: &Matrix) -> Matrix {
    let cols = a.first().map_or(0, Vec::len);

    (0..cols)
        .map(|j| a.iter().map(|row| row[j]).collect())
        .collect()
}
