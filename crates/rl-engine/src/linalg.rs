//! Dense linear algebra over `ndarray` buffers: Gauss-Jordan inversion with
//! partial pivoting, linear solve, and outer-product accumulation.

use ndarray::{Array1, Array2};
use thiserror::Error;
use venture_core::RecommenderError;

/// Pivots smaller than this are treated as zero.
const PIVOT_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinalgError {
    #[error("matrix is not square ({rows}x{cols})")]
    NotSquare { rows: usize, cols: usize },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("matrix is singular (no usable pivot in column {column})")]
    Singular { column: usize },

    #[error("result contains non-finite entries")]
    NonFinite,
}

impl From<LinalgError> for RecommenderError {
    fn from(err: LinalgError) -> Self {
        match err {
            LinalgError::DimensionMismatch { expected, actual } => {
                RecommenderError::DimensionMismatch { expected, actual }
            }
            other => RecommenderError::Internal(anyhow::Error::new(other)),
        }
    }
}

/// `lambda * I` of size `d`.
pub fn scaled_identity(d: usize, lambda: f64) -> Array2<f64> {
    Array2::<f64>::eye(d) * lambda
}

/// Invert a square matrix by Gauss-Jordan elimination, choosing the
/// largest-magnitude pivot in each column.
pub fn invert(matrix: &Array2<f64>) -> Result<Array2<f64>, LinalgError> {
    let n = square_dim(matrix)?;
    let mut work = matrix.clone();
    let mut inverse = Array2::<f64>::eye(n);

    for col in 0..n {
        let pivot_row = select_pivot(&work, col)?;
        if pivot_row != col {
            for j in 0..n {
                work.swap([pivot_row, j], [col, j]);
                inverse.swap([pivot_row, j], [col, j]);
            }
        }

        let pivot = work[[col, col]];
        for j in 0..n {
            work[[col, j]] /= pivot;
            inverse[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = work[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                let w = factor * work[[col, j]];
                let v = factor * inverse[[col, j]];
                work[[row, j]] -= w;
                inverse[[row, j]] -= v;
            }
        }
    }

    if inverse.iter().any(|v| !v.is_finite()) {
        return Err(LinalgError::NonFinite);
    }
    Ok(inverse)
}

/// Solve `A x = rhs` by Gaussian elimination with partial pivoting, without
/// forming the inverse.
pub fn solve(matrix: &Array2<f64>, rhs: &Array1<f64>) -> Result<Array1<f64>, LinalgError> {
    let n = square_dim(matrix)?;
    check_len(rhs, n)?;

    let mut work = matrix.clone();
    let mut x = rhs.clone();

    for col in 0..n {
        let pivot_row = select_pivot(&work, col)?;
        if pivot_row != col {
            for j in 0..n {
                work.swap([pivot_row, j], [col, j]);
            }
            x.swap(pivot_row, col);
        }

        let pivot = work[[col, col]];
        for row in (col + 1)..n {
            let factor = work[[row, col]] / pivot;
            if factor == 0.0 {
                continue;
            }
            for j in col..n {
                let w = factor * work[[col, j]];
                work[[row, j]] -= w;
            }
            let v = factor * x[col];
            x[row] -= v;
        }
    }

    // Back substitution.
    for row in (0..n).rev() {
        let mut acc = x[row];
        for j in (row + 1)..n {
            acc -= work[[row, j]] * x[j];
        }
        x[row] = acc / work[[row, row]];
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(LinalgError::NonFinite);
    }
    Ok(x)
}

/// `matrix · vector`.
pub fn mat_vec(matrix: &Array2<f64>, vector: &Array1<f64>) -> Result<Array1<f64>, LinalgError> {
    if matrix.ncols() != vector.len() {
        return Err(LinalgError::DimensionMismatch {
            expected: matrix.ncols(),
            actual: vector.len(),
        });
    }
    Ok(matrix.dot(vector))
}

pub fn dot(a: &Array1<f64>, b: &Array1<f64>) -> Result<f64, LinalgError> {
    check_len(b, a.len())?;
    Ok(a.dot(b))
}

/// `xᵗ · M · x`.
pub fn quadratic_form(matrix: &Array2<f64>, x: &Array1<f64>) -> Result<f64, LinalgError> {
    let mx = mat_vec(matrix, x)?;
    dot(&mx, x)
}

/// `A ← A + x·xᵗ`.
pub fn add_outer_product(matrix: &mut Array2<f64>, x: &Array1<f64>) -> Result<(), LinalgError> {
    let n = square_dim(matrix)?;
    check_len(x, n)?;
    for i in 0..n {
        if x[i] == 0.0 {
            continue;
        }
        for j in 0..n {
            matrix[[i, j]] += x[i] * x[j];
        }
    }
    Ok(())
}

/// `v ← v + scale * x`.
pub fn add_scaled(
    vector: &mut Array1<f64>,
    x: &Array1<f64>,
    scale: f64,
) -> Result<(), LinalgError> {
    check_len(x, vector.len())?;
    vector.scaled_add(scale, x);
    Ok(())
}

/// True when the matrix is square and `|a_ij - a_ji| <= tolerance` for all entries.
pub fn is_symmetric(matrix: &Array2<f64>, tolerance: f64) -> bool {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return false;
    }
    (0..rows).all(|i| (i + 1..cols).all(|j| (matrix[[i, j]] - matrix[[j, i]]).abs() <= tolerance))
}

fn square_dim(matrix: &Array2<f64>) -> Result<usize, LinalgError> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(LinalgError::NotSquare { rows, cols });
    }
    Ok(rows)
}

fn check_len(vector: &Array1<f64>, expected: usize) -> Result<(), LinalgError> {
    if vector.len() != expected {
        return Err(LinalgError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

fn select_pivot(work: &Array2<f64>, col: usize) -> Result<usize, LinalgError> {
    let n = work.nrows();
    let mut best = col;
    for row in (col + 1)..n {
        if work[[row, col]].abs() > work[[best, col]].abs() {
            best = row;
        }
    }
    let pivot = work[[best, col]];
    if !pivot.is_finite() || pivot.abs() < PIVOT_EPSILON {
        return Err(LinalgError::Singular { column: col });
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn assert_close(a: &Array2<f64>, b: &Array2<f64>, tol: f64) {
        assert_eq!(a.dim(), b.dim());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < tol, "{x} vs {y}");
        }
    }

    #[test]
    fn test_invert_identity() {
        let eye = scaled_identity(4, 1.0);
        assert_close(&invert(&eye).unwrap(), &eye, 1e-12);
    }

    #[test]
    fn test_invert_scaled_identity() {
        let a = scaled_identity(3, 4.0);
        let inv = invert(&a).unwrap();
        assert_close(&inv, &scaled_identity(3, 0.25), 1e-12);
    }

    #[test]
    fn test_invert_requires_pivoting() {
        // Zero in the leading position forces a row swap.
        let a = array![[0.0, 2.0, 1.0], [1.0, 1.0, 0.0], [3.0, 0.0, 1.0]];
        let inv = invert(&a).unwrap();
        assert_close(&a.dot(&inv), &Array2::eye(3), 1e-10);
    }

    #[test]
    fn test_invert_spd_after_outer_products() {
        let mut a = scaled_identity(3, 1.0);
        add_outer_product(&mut a, &array![1.0, 0.5, 0.0]).unwrap();
        add_outer_product(&mut a, &array![0.2, 1.0, 0.7]).unwrap();
        assert!(is_symmetric(&a, 0.0));
        let inv = invert(&a).unwrap();
        assert_close(&a.dot(&inv), &Array2::eye(3), 1e-10);
    }

    #[test]
    fn test_invert_singular() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(matches!(invert(&a), Err(LinalgError::Singular { .. })));
    }

    #[test]
    fn test_invert_non_square() {
        let a = Array2::<f64>::zeros((2, 3));
        assert_eq!(
            invert(&a).unwrap_err(),
            LinalgError::NotSquare { rows: 2, cols: 3 }
        );
    }

    #[test]
    fn test_invert_rejects_nan() {
        let a = array![[f64::NAN, 0.0], [0.0, 1.0]];
        assert!(invert(&a).is_err());
    }

    #[test]
    fn test_solve_matches_inverse() {
        let a = array![[4.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 2.0]];
        let b = array![1.0, 2.0, 3.0];
        let via_solve = solve(&a, &b).unwrap();
        let via_inverse = invert(&a).unwrap().dot(&b);
        for (x, y) in via_solve.iter().zip(via_inverse.iter()) {
            assert!((x - y).abs() < 1e-10);
        }
    }

    #[test]
    fn test_add_outer_product_diagonal() {
        let mut a = scaled_identity(3, 1.0);
        add_outer_product(&mut a, &array![1.0, 0.0, 0.5]).unwrap();
        assert_eq!(a[[0, 0]], 2.0);
        assert_eq!(a[[1, 1]], 1.0);
        assert_eq!(a[[2, 2]], 1.25);
        assert_eq!(a[[0, 2]], 0.5);
        assert_eq!(a[[2, 0]], 0.5);
    }

    #[test]
    fn test_dimension_checks() {
        let mut a = scaled_identity(2, 1.0);
        assert!(add_outer_product(&mut a, &array![1.0, 2.0, 3.0]).is_err());
        assert!(dot(&array![1.0], &array![1.0, 2.0]).is_err());
        assert!(mat_vec(&a, &array![1.0]).is_err());
    }

    #[test]
    fn test_quadratic_form() {
        let a = array![[2.0, 0.0], [0.0, 3.0]];
        let x = array![1.0, 2.0];
        assert_eq!(quadratic_form(&a, &x).unwrap(), 14.0);
    }

    #[test]
    fn test_error_conversion_keeps_dimension_mismatch() {
        let err: RecommenderError = LinalgError::DimensionMismatch {
            expected: 18,
            actual: 17,
        }
        .into();
        assert_eq!(err.kind(), "dimension_mismatch");

        let err: RecommenderError = LinalgError::Singular { column: 2 }.into();
        assert_eq!(err.kind(), "internal");
    }
}
