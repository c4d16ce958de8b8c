//! Six degree of freedom pose estimation toolbox
//!
//! This crate provides a discrete-time linear Kalman filter that fuses noisy position and orientation
//! measurements into a smoothed pose estimate for a mobile platform. It does not decode sensors, ship
//! telemetry, or decide when the filter runs. Those are the job of the surrounding application, which
//! calls [`kalman::PoseKalmanFilter::predict`] once per control cycle and
//! [`kalman::PoseKalmanFilter::update`] whenever a new measurement arrives.
//!
//! Primarily built off of [`nalgebra`](https://crates.io/crates/nalgebra), using only its compile-time
//! sized matrix types. Every matrix the filter touches is a stack allocated `6 x 6` buffer, so after
//! construction nothing allocates and the worst case execution time of a cycle is constant. This is
//! what makes the filter suitable for a hard or soft real-time control loop.
//!
//! ## Crate overview
//!
//! - [linalg]: Fixed-dimension matrix primitives, including Gauss-Jordan inversion.
//! - [kalman]: The filter itself: predict/update recursion, noise configuration and diagnostics.
//! - [noise]: Conversion of per-axis standard deviations into diagonal covariance matrices.
//! - [measurements]: The pose measurement type consumed by the filter.
//! - [config]: Serializable filter configuration (JSON, YAML, TOML).
//! - [sim]: CSV replay and synthetic measurement generation for testing filters offline.
//!
//! ## State definition
//!
//! $$
//! x = [x, y, z, \psi, \theta, \phi]
//! $$
//!
//! Where:
//! - $x$, $y$, and $z$ are the position in a consistent length unit.
//! - $\psi$, $\theta$, and $\phi$ are yaw, pitch and roll in degrees, kept in $[-180, 180)$.
//!
//! ## Filter equations
//!
//! The process model is a static random walk, $F = I$, and every state component is observed
//! directly, $H = I$. Prediction is
//!
//! $$
//! \bar{x} = F x, \quad \bar{P} = F P F^T + Q
//! $$
//!
//! and the measurement update is
//!
//! $$
//! y = z - H \bar{x}, \quad S = H \bar{P} H^T + R, \quad K = \bar{P} H^T S^{-1}, \quad
//! x = \bar{x} + K y, \quad P = (I - K H) \bar{P}
//! $$
//!
//! with the angular components of $y$ and $x$ wrapped back into $[-180, 180)$.

pub mod config;
pub mod kalman;
pub mod linalg;
pub mod measurements;
pub mod noise;
pub mod sim;

use nalgebra::{SMatrix, SVector};

/// Number of state components: `[x, y, z, yaw, pitch, roll]`
pub const STATE_SIZE: usize = 6;
/// Number of measurement components (every state is observed directly)
pub const MEAS_SIZE: usize = 6;
/// Index of the first angular component (yaw); pitch and roll follow
pub const ATTITUDE_START: usize = 3;

/// Pose vector in `[x, y, z, yaw, pitch, roll]` order
pub type PoseVector = SVector<f64, STATE_SIZE>;
/// State-space square matrix
pub type StateMatrix = SMatrix<f64, STATE_SIZE, STATE_SIZE>;
/// Measurement-space square matrix
pub type MeasurementMatrix = SMatrix<f64, MEAS_SIZE, MEAS_SIZE>;
/// Maps measurement space into state space (the Kalman gain shape)
pub type GainMatrix = SMatrix<f64, STATE_SIZE, MEAS_SIZE>;
/// Maps state space into measurement space (the observation matrix shape)
pub type ObservationMatrix = SMatrix<f64, MEAS_SIZE, STATE_SIZE>;

/// Wrap an angle in degrees to the half-open range [-180, 180)
///
/// The angle is first reduced modulo 360 and then shifted by whole turns, which gives the same
/// result as repeatedly adding or subtracting 360 but in bounded time for any magnitude.
/// Non-finite inputs are returned unchanged.
///
/// # Arguments
/// * `angle` - The angle to be wrapped, in degrees.
/// # Returns
/// * The wrapped angle, which will be in the range [-180, 180) degrees.
/// # Example
/// ```rust
/// use posekf::wrap_to_180;
/// assert_eq!(wrap_to_180(190.0), -170.0);
/// assert_eq!(wrap_to_180(180.0), -180.0);
/// assert_eq!(wrap_to_180(-180.0), -180.0);
/// assert_eq!(wrap_to_180(-541.0), 179.0);
/// ```
pub fn wrap_to_180(angle: f64) -> f64 {
    if !angle.is_finite() {
        return angle;
    }
    let mut wrapped = angle % 360.0;
    while wrapped >= 180.0 {
        wrapped -= 360.0;
    }
    while wrapped < -180.0 {
        wrapped += 360.0;
    }
    wrapped
}

/// Wrap the yaw, pitch and roll components of a pose vector in place.
#[inline]
pub fn wrap_attitude(pose: &mut PoseVector) {
    for i in ATTITUDE_START..STATE_SIZE {
        pose[i] = wrap_to_180(pose[i]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn wrap_to_180_inside_range_is_identity() {
        for angle in [-180.0, -90.0, -0.5, 0.0, 45.0, 179.999] {
            assert_eq!(wrap_to_180(angle), angle);
        }
    }

    #[test]
    fn wrap_to_180_upper_bound_is_exclusive() {
        assert_eq!(wrap_to_180(180.0), -180.0);
        assert_eq!(wrap_to_180(540.0), -180.0);
        assert_eq!(wrap_to_180(-540.0), -180.0);
    }

    #[test]
    fn wrap_to_180_multiple_turns() {
        assert_approx_eq!(wrap_to_180(725.0), 5.0, 1e-12);
        assert_approx_eq!(wrap_to_180(-725.0), -5.0, 1e-12);
        assert_approx_eq!(wrap_to_180(359.0), -1.0, 1e-12);
        assert_approx_eq!(wrap_to_180(-359.0), 1.0, 1e-12);
    }

    #[test]
    fn wrap_to_180_huge_values_stay_in_range() {
        for angle in [1e12, -1e12, 3.3e15, -7.7e17] {
            let wrapped = wrap_to_180(angle);
            assert!((-180.0..180.0).contains(&wrapped), "{angle} -> {wrapped}");
        }
    }

    #[test]
    fn wrap_to_180_non_finite_passthrough() {
        assert!(wrap_to_180(f64::NAN).is_nan());
        assert_eq!(wrap_to_180(f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn wrap_attitude_only_touches_angles() {
        let mut pose = PoseVector::new(400.0, -400.0, 181.0, 181.0, -181.0, 360.0);
        wrap_attitude(&mut pose);
        assert_eq!(pose[0], 400.0);
        assert_eq!(pose[1], -400.0);
        assert_eq!(pose[2], 181.0);
        assert_approx_eq!(pose[3], -179.0, 1e-12);
        assert_approx_eq!(pose[4], 179.0, 1e-12);
        assert_approx_eq!(pose[5], 0.0, 1e-12);
    }
}
