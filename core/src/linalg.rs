//! Fixed-dimension dense linear algebra for the pose filter.
//!
//! Public API:
//!     pub fn multiply(a, b, out)
//!     pub fn add(a, b, out)
//!     pub fn subtract(a, b, out)
//!     pub fn transpose(a, out)
//!     pub fn copy(src, dst)
//!     pub fn gauss_jordan_inverse(matrix) -> Option<SMatrix>
//!     pub fn symmetrize(matrix) -> SMatrix
//!     pub fn trace(matrix) -> f64
//!     pub fn max_asymmetry(matrix) -> f64
//!
//! Every operation acts on compile-time sized `SMatrix` buffers, which live on the stack. Nothing
//! in this module allocates, and the run time of each routine depends only on the dimensions.
//! Dimension conformance is enforced by the type system rather than checked at run time.

use nalgebra::SMatrix;

/// Pivot magnitude below which a matrix is declared singular.
pub const SINGULARITY_THRESHOLD: f64 = 1e-10;

/// Matrix product `out = a * b`.
#[inline]
pub fn multiply<const R: usize, const K: usize, const C: usize>(
    a: &SMatrix<f64, R, K>,
    b: &SMatrix<f64, K, C>,
    out: &mut SMatrix<f64, R, C>,
) {
    a.mul_to(b, out);
}

/// Element-wise sum `out = a + b`.
#[inline]
pub fn add<const R: usize, const C: usize>(
    a: &SMatrix<f64, R, C>,
    b: &SMatrix<f64, R, C>,
    out: &mut SMatrix<f64, R, C>,
) {
    a.add_to(b, out);
}

/// Element-wise difference `out = a - b`.
#[inline]
pub fn subtract<const R: usize, const C: usize>(
    a: &SMatrix<f64, R, C>,
    b: &SMatrix<f64, R, C>,
    out: &mut SMatrix<f64, R, C>,
) {
    a.sub_to(b, out);
}

/// Transpose `out = aᵀ`.
#[inline]
pub fn transpose<const R: usize, const C: usize>(
    a: &SMatrix<f64, R, C>,
    out: &mut SMatrix<f64, C, R>,
) {
    a.transpose_to(out);
}

/// Copy every entry of `src` into `dst`.
#[inline]
pub fn copy<const R: usize, const C: usize>(src: &SMatrix<f64, R, C>, dst: &mut SMatrix<f64, R, C>) {
    dst.copy_from(src);
}

/// Invert a square matrix by Gauss-Jordan elimination with partial pivoting.
///
/// The elimination runs over the augmented system `[A | I]`, kept here as two `N x N` halves
/// that receive identical row operations. At each column the row with the largest magnitude
/// entry among the rows not yet used as pivots is swapped into place, normalized, and
/// eliminated from every other row. When the elimination finishes the right half holds `A⁻¹`.
///
/// # Arguments
/// * `matrix` - The square matrix to invert.
///
/// # Returns
/// * `Some(inverse)` on success.
/// * `None` if any pivot magnitude falls below [`SINGULARITY_THRESHOLD`] (or is NaN). No partial
///   result is exposed in that case.
///
/// # Example
/// ```rust
/// use nalgebra::Matrix2;
/// use posekf::linalg::gauss_jordan_inverse;
///
/// let a = Matrix2::new(2.0, 0.0, 0.0, 4.0);
/// let inv = gauss_jordan_inverse(&a).unwrap();
/// assert!((inv[(0, 0)] - 0.5).abs() < 1e-12);
/// assert!((inv[(1, 1)] - 0.25).abs() < 1e-12);
/// assert!(gauss_jordan_inverse(&nalgebra::Matrix2::<f64>::zeros()).is_none());
/// ```
pub fn gauss_jordan_inverse<const N: usize>(
    matrix: &SMatrix<f64, N, N>,
) -> Option<SMatrix<f64, N, N>> {
    let mut left = *matrix;
    let mut right = SMatrix::<f64, N, N>::identity();

    for col in 0..N {
        let mut pivot_row = col;
        for row in (col + 1)..N {
            if left[(row, col)].abs() > left[(pivot_row, col)].abs() {
                pivot_row = row;
            }
        }
        // Written as a negated comparison so a NaN pivot is also rejected.
        if !(left[(pivot_row, col)].abs() >= SINGULARITY_THRESHOLD) {
            return None;
        }
        if pivot_row != col {
            left.swap_rows(col, pivot_row);
            right.swap_rows(col, pivot_row);
        }

        let pivot = left[(col, col)];
        for j in 0..N {
            left[(col, j)] /= pivot;
            right[(col, j)] /= pivot;
        }

        for row in 0..N {
            if row == col {
                continue;
            }
            let factor = left[(row, col)];
            if factor == 0.0 {
                continue;
            }
            for j in 0..N {
                left[(row, j)] -= factor * left[(col, j)];
                right[(row, j)] -= factor * right[(col, j)];
            }
        }
    }
    Some(right)
}

/// Symmetrize a matrix: P ← 0.5 (P + Pᵀ)
///
/// Removes the round-off asymmetry that the simplified covariance update accumulates.
#[inline]
pub fn symmetrize<const N: usize>(m: &SMatrix<f64, N, N>) -> SMatrix<f64, N, N> {
    0.5 * (m + m.transpose())
}

/// Sum of the diagonal entries.
#[inline]
pub fn trace<const N: usize>(m: &SMatrix<f64, N, N>) -> f64 {
    (0..N).map(|i| m[(i, i)]).sum()
}

/// Largest absolute difference between mirrored off-diagonal entries, `max |Mᵢⱼ - Mⱼᵢ|`.
pub fn max_asymmetry<const N: usize>(m: &SMatrix<f64, N, N>) -> f64 {
    let mut worst = 0.0f64;
    for i in 0..N {
        for j in (i + 1)..N {
            worst = worst.max((m[(i, j)] - m[(j, i)]).abs());
        }
    }
    worst
}

/* =============================== Tests ==================================== */
