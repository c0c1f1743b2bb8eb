//! Dense linear system solver
//!
//! Gauss-Jordan elimination with partial pivoting. The homography system is
//! built from camera-derived coordinates that can be nearly degenerate (very
//! thin quads), so the pivot is always the largest magnitude in its column.

use thiserror::Error;

/// Pivots at or below this magnitude are treated as zero
pub const PIVOT_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SolveError {
    #[error("singular system: no usable pivot in column {column}")]
    Singular { column: usize },
}

/// Solve `a * x = b` for an `N`x`N` system.
///
/// Inputs are taken by value, so the caller's arrays are never touched.
pub fn solve<const N: usize>(
    mut a: [[f64; N]; N],
    mut b: [f64; N],
) -> Result<[f64; N], SolveError> {
    for col in 0..N {
        // Find pivot
        let mut pivot_row = col;
        let mut pivot_abs = a[col][col].abs();
        for row in (col + 1)..N {
            let candidate = a[row][col].abs();
            if candidate > pivot_abs {
                pivot_abs = candidate;
                pivot_row = row;
            }
        }

        if !(pivot_abs > PIVOT_TOLERANCE) {
            return Err(SolveError::Singular { column: col });
        }

        if pivot_row != col {
            a.swap(col, pivot_row);
            b.swap(col, pivot_row);
        }

        // Normalize the pivot row
        let pivot = a[col][col];
        for j in col..N {
            a[col][j] /= pivot;
        }
        b[col] /= pivot;

        // Eliminate the column from every other row
        for row in 0..N {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in col..N {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }

    Ok(b)
}
