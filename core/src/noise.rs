//! Noise configuration utilities
//!
//! Process and measurement noise are specified per axis as standard deviations and stored by the
//! filter as diagonal covariance matrices whose entries are the squared deviations. The defaults
//! below are tuned for a GNSS-plus-AHRS class platform.

use nalgebra::SMatrix;

use crate::{MEAS_SIZE, STATE_SIZE};

/// Default initial pose: the origin with level attitude.
pub const DEFAULT_INITIAL_STATE: [f64; STATE_SIZE] = [0.0; STATE_SIZE];

/// Default process noise standard deviations, `[x, y, z, yaw, pitch, roll]`.
pub const DEFAULT_PROCESS_NOISE_STD: [f64; STATE_SIZE] = [
    0.1, // x
    0.1, // y
    0.1, // z
    0.5, // yaw (deg)
    0.5, // pitch (deg)
    0.5, // roll (deg)
];

/// Default measurement noise standard deviations, `[x, y, z, yaw, pitch, roll]`.
pub const DEFAULT_MEASUREMENT_NOISE_STD: [f64; MEAS_SIZE] = [
    0.3, // x
    0.3, // y
    0.2, // z
    2.0, // yaw (deg)
    1.0, // pitch (deg)
    1.0, // roll (deg)
];

/// Build a diagonal covariance matrix from per-axis standard deviations.
///
/// Entry `(i, i)` is `std_devs[i]²`; all off-diagonal entries are zero. The sign of a deviation
/// is irrelevant since it is squared.
///
/// # Example
/// ```rust
/// use posekf::noise::diagonal_covariance;
///
/// let q = diagonal_covariance(&[0.1, 0.1, 0.1, 0.5, 0.5, 0.5]);
/// assert!((q[(3, 3)] - 0.25).abs() < 1e-15);
/// assert_eq!(q[(0, 1)], 0.0);
/// ```
pub fn diagonal_covariance<const N: usize>(std_devs: &[f64; N]) -> SMatrix<f64, N, N> {
    let mut covariance = SMatrix::<f64, N, N>::zeros();
    for (i, sigma) in std_devs.iter().enumerate() {
        covariance[(i, i)] = sigma * sigma;
    }
    covariance
}

/// Recover per-axis standard deviations from the diagonal of a covariance matrix.
///
/// Negative diagonal entries, which can only arise from numerical error, map to zero.
pub fn diagonal_std_devs<const N: usize>(covariance: &SMatrix<f64, N, N>) -> [f64; N] {
    let mut std_devs = [0.0; N];
    for (i, sigma) in std_devs.iter_mut().enumerate() {
        *sigma = covariance[(i, i)].max(0.0).sqrt();
    }
    std_devs
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn default_process_covariance_diagonal() {
        let q = diagonal_covariance(&DEFAULT_PROCESS_NOISE_STD);
        for i in 0..3 {
            assert_approx_eq!(q[(i, i)], 0.01, 1e-15);
        }
        for i in 3..6 {
            assert_approx_eq!(q[(i, i)], 0.25, 1e-15);
        }
        for i in 0..6 {
            for j in 0..6 {
                if i != j {
                    assert_eq!(q[(i, j)], 0.0);
                }
            }
        }
    }

    #[test]
    fn default_measurement_covariance_diagonal() {
        let r = diagonal_covariance(&DEFAULT_MEASUREMENT_NOISE_STD);
        let expected = [0.09, 0.09, 0.04, 4.0, 1.0, 1.0];
        for (i, value) in expected.iter().enumerate() {
            assert_approx_eq!(r[(i, i)], *value, 1e-15);
        }
    }

    #[test]
    fn negative_deviation_is_squared() {
        let r = diagonal_covariance(&[-2.0, 3.0]);
        assert_eq!(r[(0, 0)], 4.0);
        assert_eq!(r[(1, 1)], 9.0);
    }

    #[test]
    fn std_devs_recovered_from_diagonal() {
        let q = diagonal_covariance(&DEFAULT_MEASUREMENT_NOISE_STD);
        let back = diagonal_std_devs(&q);
        for (a, b) in back.iter().zip(DEFAULT_MEASUREMENT_NOISE_STD.iter()) {
            assert_approx_eq!(*a, *b, 1e-12);
        }
    }
}
