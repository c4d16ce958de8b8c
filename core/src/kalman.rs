//! Linear pose Kalman filter
//!
//! This module contains the six-state position/attitude Kalman filter. The process model is a
//! static random walk (`F = I`) and every state component is observed directly (`H = I`), so the
//! filter behaves as six coupled smoothers whose gains are set by the ratio of process noise `Q`
//! to measurement noise `R`.
//!
//! All intermediate products are written into a per-instance [`Workspace`] of fixed-size buffers.
//! Nothing is shared between instances and nothing is allocated after construction, so a cycle of
//! `predict` plus `update` runs in constant time bounded by one `6 x 6` Gauss-Jordan elimination.
//! The filter performs no synchronization; a caller sharing one instance between threads must
//! wrap it in its own lock.

use std::fmt::{self, Debug, Display};

use log::{debug, info, trace, warn};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::linalg::{
    add, copy, gauss_jordan_inverse, max_asymmetry, multiply, subtract, symmetrize, trace,
    transpose,
};
use crate::noise::{
    DEFAULT_INITIAL_STATE, DEFAULT_MEASUREMENT_NOISE_STD, DEFAULT_PROCESS_NOISE_STD,
    diagonal_covariance,
};
use crate::{
    GainMatrix, MEAS_SIZE, MeasurementMatrix, ObservationMatrix, PoseVector, STATE_SIZE,
    StateMatrix, wrap_attitude,
};

/// Selects the covariance correction applied at the end of a measurement update.
///
/// `Standard` is the default and reproduces `P = (I - K H) P` exactly. It is cheap but lets
/// round-off erode symmetry over long runs; `Symmetrized` adds `P = (P + Pᵀ) / 2` after every
/// update, and `Joseph` uses `P = (I - K H) P (I - K H)ᵀ + K R Kᵀ`. The latter two change the
/// numerical trajectory and are only ever used when selected explicitly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceUpdate {
    #[default]
    Standard,
    Symmetrized,
    Joseph,
}

/// Result of a call to [`PoseKalmanFilter::update`].
///
/// A skipped update is not an error: the previous estimate stays authoritative and the filter
/// simply waits for the next measurement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// State and covariance were corrected by the measurement.
    Applied,
    /// The innovation covariance could not be inverted; state and covariance are untouched.
    SkippedSingular,
}
impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied)
    }
}

/// Lifetime counters for health telemetry
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FilterStatistics {
    pub predictions: u64,
    pub updates_applied: u64,
    pub updates_skipped: u64,
}

/// Scratch buffers for the predict and update products. Carries no state between calls.
#[derive(Clone, Copy)]
struct Workspace {
    predicted_state: PoseVector,
    predicted_measurement: PoseVector,
    innovation: PoseVector,
    correction: PoseVector,
    transition_t: StateMatrix,
    propagated: StateMatrix,
    propagated_t: StateMatrix,
    observation_t: GainMatrix,
    cross_covariance: GainMatrix,
    projected: MeasurementMatrix,
    innovation_covariance: MeasurementMatrix,
    gain: GainMatrix,
    gain_t: ObservationMatrix,
    gain_noise: GainMatrix,
    gain_noise_gain: StateMatrix,
    gain_observation: StateMatrix,
    residual: StateMatrix,
    residual_t: StateMatrix,
    residual_covariance: StateMatrix,
    joseph_core: StateMatrix,
    updated: StateMatrix,
}
impl Workspace {
    fn new() -> Self {
        Workspace {
            predicted_state: PoseVector::zeros(),
            predicted_measurement: PoseVector::zeros(),
            innovation: PoseVector::zeros(),
            correction: PoseVector::zeros(),
            transition_t: StateMatrix::zeros(),
            propagated: StateMatrix::zeros(),
            propagated_t: StateMatrix::zeros(),
            observation_t: GainMatrix::zeros(),
            cross_covariance: GainMatrix::zeros(),
            projected: MeasurementMatrix::zeros(),
            innovation_covariance: MeasurementMatrix::zeros(),
            gain: GainMatrix::zeros(),
            gain_t: ObservationMatrix::zeros(),
            gain_noise: GainMatrix::zeros(),
            gain_noise_gain: StateMatrix::zeros(),
            gain_observation: StateMatrix::zeros(),
            residual: StateMatrix::zeros(),
            residual_t: StateMatrix::zeros(),
            residual_covariance: StateMatrix::zeros(),
            joseph_core: StateMatrix::zeros(),
            updated: StateMatrix::zeros(),
        }
    }
}

/// Six-state pose Kalman filter
///
/// The state vector is
/// ```text
/// x = [x, y, z, yaw, pitch, roll]
/// ```
/// with position in a consistent length unit and attitude in degrees.
///
/// ## Predict Step
///
/// $$
/// \bar{x} = F x, \quad \bar{P} = F P F^T + Q
/// $$
///
/// With `F = I` the mean is unchanged and the covariance grows by `Q`: absent new information the
/// pose is believed constant while confidence decays.
///
/// ## Update Step
///
/// $$
/// \begin{aligned}
/// y &= z - H \bar{x} \\\\
/// S &= H \bar{P} H^T + R \\\\
/// K &= \bar{P} H^T S^{-1} \\\\
/// x &= \bar{x} + K y \\\\
/// P &= (I - K H) \bar{P}
/// \end{aligned}
/// $$
///
/// The yaw, pitch and roll components of `y` and of the corrected `x` are wrapped to
/// `[-180, 180)` so that a measurement of `-179°` against an estimate of `179°` reads as a `2°`
/// correction rather than a `-358°` one. If `S` is singular the update is abandoned before
/// anything is modified.
///
/// # Example
///
/// ```rust
/// use posekf::kalman::PoseKalmanFilter;
///
/// let mut filter = PoseKalmanFilter::default();
/// for _ in 0..100 {
///     filter.predict(0.02);
///     filter.update([1.0, 2.0, 3.0, 10.0, 20.0, 30.0]);
/// }
/// let position = filter.get_position();
/// assert!((position[0] - 1.0).abs() < 1e-3);
/// ```
#[derive(Clone)]
pub struct PoseKalmanFilter {
    /// State estimate `[x, y, z, yaw, pitch, roll]`
    mean_state: PoseVector,
    /// State covariance `P`
    covariance: StateMatrix,
    /// State transition `F`, fixed to identity
    transition: StateMatrix,
    /// Process noise covariance `Q`
    process_noise: StateMatrix,
    /// Observation matrix `H`, fixed to identity
    observation: ObservationMatrix,
    /// Measurement noise covariance `R`
    measurement_noise: MeasurementMatrix,
    covariance_update: CovarianceUpdate,
    last_innovation: Option<PoseVector>,
    statistics: FilterStatistics,
    workspace: Workspace,
}

impl Debug for PoseKalmanFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoseKF")
            .field("mean_state", &self.mean_state)
            .field("covariance", &self.covariance)
            .field("process_noise", &self.process_noise)
            .field("measurement_noise", &self.measurement_noise)
            .field("covariance_update", &self.covariance_update)
            .field("statistics", &self.statistics)
            .finish()
    }
}

impl Display for PoseKalmanFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PoseKalmanFilter(x: {:.4}, y: {:.4}, z: {:.4}, yaw: {:.3}, pitch: {:.3}, roll: {:.3}, trace(P): {:.6})",
            self.mean_state[0],
            self.mean_state[1],
            self.mean_state[2],
            self.mean_state[3],
            self.mean_state[4],
            self.mean_state[5],
            self.get_covariance_trace()
        )
    }
}

impl Default for PoseKalmanFilter {
    fn default() -> Self {
        PoseKalmanFilter::new(None, None, None)
    }
}

impl PoseKalmanFilter {
    /// Create a new pose filter
    ///
    /// # Arguments
    ///
    /// * `initial_state` - Initial pose `[x, y, z, yaw, pitch, roll]`; the origin if `None`.
    /// * `process_noise_std` - Per-axis process noise standard deviations; see
    ///   [`DEFAULT_PROCESS_NOISE_STD`] for the fallback.
    /// * `measurement_noise_std` - Per-axis measurement noise standard deviations; see
    ///   [`DEFAULT_MEASUREMENT_NOISE_STD`] for the fallback.
    ///
    /// The covariance starts at identity and the covariance update defaults to
    /// [`CovarianceUpdate::Standard`].
    pub fn new(
        initial_state: Option<[f64; STATE_SIZE]>,
        process_noise_std: Option<[f64; STATE_SIZE]>,
        measurement_noise_std: Option<[f64; MEAS_SIZE]>,
    ) -> PoseKalmanFilter {
        let mut filter = PoseKalmanFilter {
            mean_state: PoseVector::zeros(),
            covariance: StateMatrix::identity(),
            transition: StateMatrix::identity(),
            process_noise: StateMatrix::zeros(),
            observation: ObservationMatrix::identity(),
            measurement_noise: MeasurementMatrix::zeros(),
            covariance_update: CovarianceUpdate::default(),
            last_innovation: None,
            statistics: FilterStatistics::default(),
            workspace: Workspace::new(),
        };
        filter.initialize(
            &initial_state.unwrap_or(DEFAULT_INITIAL_STATE),
            &process_noise_std.unwrap_or(DEFAULT_PROCESS_NOISE_STD),
            &measurement_noise_std.unwrap_or(DEFAULT_MEASUREMENT_NOISE_STD),
        );
        filter
    }

    /// Builder-style selection of the covariance correction.
    pub fn with_covariance_update(mut self, covariance_update: CovarianceUpdate) -> Self {
        self.covariance_update = covariance_update;
        self
    }

    fn initialize(
        &mut self,
        initial_state: &[f64; STATE_SIZE],
        process_noise_std: &[f64; STATE_SIZE],
        measurement_noise_std: &[f64; MEAS_SIZE],
    ) {
        self.mean_state = PoseVector::from(*initial_state);
        self.transition = StateMatrix::identity();
        self.observation = ObservationMatrix::identity();
        self.covariance = StateMatrix::identity();
        self.set_process_noise(process_noise_std);
        self.set_measurement_noise(measurement_noise_std);
        self.last_innovation = None;
        self.statistics = FilterStatistics::default();
    }

    /// Rebuild the filter in place as if freshly constructed.
    ///
    /// `None` arguments fall back to the same defaults as [`PoseKalmanFilter::new`]. Counters and
    /// the last innovation are cleared; the selected covariance update is kept.
    pub fn reinit(
        &mut self,
        initial_state: Option<[f64; STATE_SIZE]>,
        process_noise_std: Option<[f64; STATE_SIZE]>,
        measurement_noise_std: Option<[f64; MEAS_SIZE]>,
    ) {
        self.initialize(
            &initial_state.unwrap_or(DEFAULT_INITIAL_STATE),
            &process_noise_std.unwrap_or(DEFAULT_PROCESS_NOISE_STD),
            &measurement_noise_std.unwrap_or(DEFAULT_MEASUREMENT_NOISE_STD),
        );
        info!("Pose filter reinitialized at {}", self);
    }

    /// Predict step: propagate the state and covariance one control cycle forward.
    ///
    /// Computes $\bar{x} = F x$ and $\bar{P} = F P F^T + Q$. The transition is the identity, so
    /// `dt` does not enter either product; it is accepted so the call matches time-driven loops.
    pub fn predict(&mut self, dt: f64) {
        let ws = &mut self.workspace;

        multiply(&self.transition, &self.mean_state, &mut ws.predicted_state);
        self.mean_state = ws.predicted_state;

        multiply(&self.transition, &self.covariance, &mut ws.propagated);
        transpose(&self.transition, &mut ws.transition_t);
        multiply(&ws.propagated, &ws.transition_t, &mut ws.propagated_t);
        add(&ws.propagated_t, &self.process_noise, &mut self.covariance);

        self.statistics.predictions = self.statistics.predictions.saturating_add(1);
        trace!(
            "predict dt={:.4}s trace(P)={:.6}",
            dt,
            trace(&self.covariance)
        );
    }

    /// Update step: correct the estimate with a direct observation of all six components.
    ///
    /// The measurement is `[x, y, z, yaw, pitch, roll]` and may be given as a
    /// [`crate::measurements::PoseMeasurement`], a [`PoseVector`] or a plain `[f64; 6]`.
    ///
    /// Returns [`UpdateOutcome::SkippedSingular`] without touching the state or covariance when
    /// the innovation covariance cannot be inverted. Callers are free to ignore the outcome.
    pub fn update<M: Into<PoseVector>>(&mut self, measurement: M) -> UpdateOutcome {
        let measurement: PoseVector = measurement.into();
        let ws = &mut self.workspace;

        // Innovation y = z - H x, with angles taken the short way round
        multiply(&self.observation, &self.mean_state, &mut ws.predicted_measurement);
        subtract(&measurement, &ws.predicted_measurement, &mut ws.innovation);
        wrap_attitude(&mut ws.innovation);
        self.last_innovation = Some(ws.innovation);

        // S = H P Hᵀ + R
        transpose(&self.observation, &mut ws.observation_t);
        multiply(&self.covariance, &ws.observation_t, &mut ws.cross_covariance);
        multiply(&self.observation, &ws.cross_covariance, &mut ws.projected);
        add(&ws.projected, &self.measurement_noise, &mut ws.innovation_covariance);

        let Some(innovation_covariance_inv) = gauss_jordan_inverse(&ws.innovation_covariance)
        else {
            self.statistics.updates_skipped = self.statistics.updates_skipped.saturating_add(1);
            warn!(
                "Innovation covariance is singular, skipping update ({} skipped so far)",
                self.statistics.updates_skipped
            );
            return UpdateOutcome::SkippedSingular;
        };

        // K = P Hᵀ S⁻¹
        multiply(&ws.cross_covariance, &innovation_covariance_inv, &mut ws.gain);

        // x = x + K y
        multiply(&ws.gain, &ws.innovation, &mut ws.correction);
        self.mean_state += ws.correction;
        wrap_attitude(&mut self.mean_state);

        // I - K H
        multiply(&ws.gain, &self.observation, &mut ws.gain_observation);
        subtract(&StateMatrix::identity(), &ws.gain_observation, &mut ws.residual);

        match self.covariance_update {
            CovarianceUpdate::Standard => {
                multiply(&ws.residual, &self.covariance, &mut ws.updated);
            }
            CovarianceUpdate::Symmetrized => {
                multiply(&ws.residual, &self.covariance, &mut ws.residual_covariance);
                ws.updated = symmetrize(&ws.residual_covariance);
            }
            CovarianceUpdate::Joseph => {
                multiply(&ws.residual, &self.covariance, &mut ws.residual_covariance);
                transpose(&ws.residual, &mut ws.residual_t);
                multiply(&ws.residual_covariance, &ws.residual_t, &mut ws.joseph_core);
                multiply(&ws.gain, &self.measurement_noise, &mut ws.gain_noise);
                transpose(&ws.gain, &mut ws.gain_t);
                multiply(&ws.gain_noise, &ws.gain_t, &mut ws.gain_noise_gain);
                add(&ws.joseph_core, &ws.gain_noise_gain, &mut ws.updated);
            }
        }
        copy(&ws.updated, &mut self.covariance);

        self.statistics.updates_applied = self.statistics.updates_applied.saturating_add(1);
        debug!(
            "update applied: |y|={:.4} trace(P)={:.6}",
            ws.innovation.norm(),
            trace(&self.covariance)
        );
        UpdateOutcome::Applied
    }

    /// Replace `Q` with `diag(σ²)` built from per-axis standard deviations.
    pub fn set_process_noise(&mut self, noise_std: &[f64; STATE_SIZE]) {
        self.process_noise = diagonal_covariance(noise_std);
    }

    /// Replace `R` with `diag(σ²)` built from per-axis standard deviations.
    pub fn set_measurement_noise(&mut self, noise_std: &[f64; MEAS_SIZE]) {
        self.measurement_noise = diagonal_covariance(noise_std);
    }

    pub fn set_covariance_update(&mut self, covariance_update: CovarianceUpdate) {
        self.covariance_update = covariance_update;
    }

    /// Overwrite the state and reset the covariance to identity.
    ///
    /// Meant for large known discontinuities such as a reacquired external fix. All accumulated
    /// confidence is discarded. Noise settings and lifetime counters are kept.
    pub fn reset<S: Into<PoseVector>>(&mut self, new_state: S) {
        self.mean_state = new_state.into();
        self.covariance = StateMatrix::identity();
        self.last_innovation = None;
        info!("Pose filter reset to {}", self);
    }

    /// Copy of the full state `[x, y, z, yaw, pitch, roll]`
    pub fn get_state(&self) -> PoseVector {
        self.mean_state
    }

    /// Copy of the position `(x, y, z)`
    pub fn get_position(&self) -> Vector3<f64> {
        Vector3::new(self.mean_state[0], self.mean_state[1], self.mean_state[2])
    }

    /// Copy of the attitude `(yaw, pitch, roll)` in degrees
    pub fn get_attitude(&self) -> Vector3<f64> {
        Vector3::new(self.mean_state[3], self.mean_state[4], self.mean_state[5])
    }

    /// Copy of the state covariance `P`
    pub fn get_covariance(&self) -> StateMatrix {
        self.covariance
    }

    /// Sum of the diagonal of `P`. Higher means less confident.
    pub fn get_covariance_trace(&self) -> f64 {
        trace(&self.covariance)
    }

    /// Largest `|Pᵢⱼ - Pⱼᵢ|`, a drift indicator for the standard covariance update.
    pub fn covariance_asymmetry(&self) -> f64 {
        max_asymmetry(&self.covariance)
    }

    pub fn get_process_noise(&self) -> StateMatrix {
        self.process_noise
    }

    pub fn get_measurement_noise(&self) -> MeasurementMatrix {
        self.measurement_noise
    }

    pub fn covariance_update(&self) -> CovarianceUpdate {
        self.covariance_update
    }

    /// Innovation of the most recent update attempt, angles already wrapped.
    ///
    /// Recorded even when the update was skipped. `None` before the first update and after a
    /// reset.
    pub fn last_innovation(&self) -> Option<PoseVector> {
        self.last_innovation
    }

    pub fn statistics(&self) -> FilterStatistics {
        self.statistics
    }
}
