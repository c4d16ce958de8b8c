//! Pose measurement type
//!
//! A direct observation of all six state components, supplied by the upstream position and
//! orientation sources. Angles are in degrees and need not be pre-wrapped; the filter normalizes
//! the innovation itself.

use std::fmt::{self, Display};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::PoseVector;

/// Position and attitude measurement in `[x, y, z, yaw, pitch, roll]` order
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseMeasurement {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Yaw in degrees
    pub yaw: f64,
    /// Pitch in degrees
    pub pitch: f64,
    /// Roll in degrees
    pub roll: f64,
}

impl PoseMeasurement {
    pub fn new(x: f64, y: f64, z: f64, yaw: f64, pitch: f64, roll: f64) -> Self {
        PoseMeasurement {
            x,
            y,
            z,
            yaw,
            pitch,
            roll,
        }
    }
    /// Measurement as a pose vector
    pub fn to_vector(&self) -> PoseVector {
        PoseVector::new(self.x, self.y, self.z, self.yaw, self.pitch, self.roll)
    }
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
    /// Attitude as `(yaw, pitch, roll)` in degrees
    pub fn attitude(&self) -> Vector3<f64> {
        Vector3::new(self.yaw, self.pitch, self.roll)
    }
}

impl From<[f64; 6]> for PoseMeasurement {
    fn from(values: [f64; 6]) -> Self {
        PoseMeasurement::new(
            values[0], values[1], values[2], values[3], values[4], values[5],
        )
    }
}

impl From<PoseVector> for PoseMeasurement {
    fn from(values: PoseVector) -> Self {
        PoseMeasurement::new(
            values[0], values[1], values[2], values[3], values[4], values[5],
        )
    }
}

impl From<PoseMeasurement> for PoseVector {
    fn from(measurement: PoseMeasurement) -> Self {
        measurement.to_vector()
    }
}

impl Display for PoseMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PoseMeasurement(x: {}, y: {}, z: {}, yaw: {}, pitch: {}, roll: {})",
            self.x, self.y, self.z, self.yaw, self.pitch, self.roll
        )
    }
}
