//! Simulation utilities and CSV data loading for offline filter evaluation.
//!
//! This module provides:
//! - A struct (`MeasurementRecord`) for reading and writing timestamped pose measurements to/from CSV
//! - A struct (`EstimateRecord`) holding the filter output for each processed measurement
//! - `replay`, which drives a [`PoseKalmanFilter`] through a recorded measurement log
//! - `synthetic_measurements`, which produces seeded noisy measurements around a known pose
//!
//! Replay stands in for the control loop of a real platform: each record triggers one `predict`
//! with the elapsed time followed by one `update`.

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

use crate::kalman::PoseKalmanFilter;
use crate::{PoseVector, STATE_SIZE, wrap_to_180};

/// One timestamped pose measurement, a single CSV row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Time of the measurement in seconds
    pub time: f64,
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

impl MeasurementRecord {
    pub fn new(time: f64, pose: [f64; STATE_SIZE]) -> Self {
        MeasurementRecord {
            time,
            x: pose[0],
            y: pose[1],
            z: pose[2],
            yaw: pose[3],
            pitch: pose[4],
            roll: pose[5],
        }
    }

    /// Measurement in `[x, y, z, yaw, pitch, roll]` order
    pub fn to_vector(&self) -> PoseVector {
        PoseVector::new(self.x, self.y, self.z, self.yaw, self.pitch, self.roll)
    }

    /// Reads a CSV file and returns a vector of `MeasurementRecord` structs.
    ///
    /// The file must have a header row naming the columns `time,x,y,z,yaw,pitch,roll`.
    ///
    /// # Arguments
    /// * `path` - Path to the CSV file to read.
    ///
    /// # Returns
    /// * `Ok(Vec<MeasurementRecord>)` if successful.
    /// * `Err` if the file cannot be read or parsed.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Self>, Box<dyn std::error::Error>> {
        let mut rdr = csv::Reader::from_path(path)?;
        let mut records = Vec::new();
        for result in rdr.deserialize() {
            let record: Self = result?;
            records.push(record);
        }
        Ok(records)
    }

    /// Writes a slice of MeasurementRecord structs to a CSV file.
    ///
    /// # Arguments
    /// * `records` - Records to write
    /// * `path` - Path where the CSV file will be saved
    pub fn to_csv<P: AsRef<Path>>(records: &[Self], path: P) -> io::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Filter output after processing one measurement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EstimateRecord {
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    /// Trace of the state covariance after the cycle
    pub covariance_trace: f64,
    /// False when the update was skipped for a singular innovation covariance
    pub update_applied: bool,
}

impl EstimateRecord {
    pub fn from_filter(time: f64, filter: &PoseKalmanFilter, update_applied: bool) -> Self {
        let state = filter.get_state();
        EstimateRecord {
            time,
            x: state[0],
            y: state[1],
            z: state[2],
            yaw: state[3],
            pitch: state[4],
            roll: state[5],
            covariance_trace: filter.get_covariance_trace(),
            update_applied,
        }
    }

    pub fn to_vector(&self) -> PoseVector {
        PoseVector::new(self.x, self.y, self.z, self.yaw, self.pitch, self.roll)
    }

    /// Writes the estimates to a CSV file with a header row.
    pub fn to_csv<P: AsRef<Path>>(records: &[Self], path: P) -> io::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads estimates previously written by [`EstimateRecord::to_csv`].
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Self>, Box<dyn std::error::Error>> {
        let mut rdr = csv::Reader::from_path(path)?;
        let mut records = Vec::new();
        for result in rdr.deserialize() {
            let record: Self = result?;
            records.push(record);
        }
        Ok(records)
    }
}

/// Run a filter over a measurement log.
///
/// For every record the filter is predicted by the time elapsed since the previous record (zero
/// for the first one; out-of-order timestamps are clamped to zero) and then updated with the
/// record's measurement.
///
/// # Arguments
/// * `filter` - The filter to drive; left in its final state.
/// * `records` - Measurement log in processing order.
///
/// # Returns
/// * One [`EstimateRecord`] per input record.
pub fn replay(filter: &mut PoseKalmanFilter, records: &[MeasurementRecord]) -> Vec<EstimateRecord> {
    let mut results = Vec::with_capacity(records.len());
    let mut previous_time: Option<f64> = None;
    let mut skipped = 0usize;
    for record in records {
        let dt = match previous_time {
            Some(t) => (record.time - t).max(0.0),
            None => 0.0,
        };
        previous_time = Some(record.time);

        filter.predict(dt);
        let applied = filter.update(record.to_vector()).is_applied();
        if !applied {
            skipped += 1;
        }
        results.push(EstimateRecord::from_filter(record.time, filter, applied));
    }
    info!(
        "Replayed {} measurements ({} updates skipped)",
        records.len(),
        skipped
    );
    results
}

/// Generate noisy measurements of a stationary pose.
///
/// Each component receives independent zero-mean Gaussian noise with the given standard deviation;
/// angular components are wrapped to `[-180, 180)` afterwards. Records are spaced `1 / rate_hz`
/// seconds apart starting at `t = 0`. The same seed always yields the same sequence.
///
/// # Arguments
/// * `truth` - True pose `[x, y, z, yaw, pitch, roll]`
/// * `noise_std` - Per-axis noise standard deviation; non-finite or negative values are treated as zero
/// * `count` - Number of records to generate
/// * `rate_hz` - Measurement rate; non-positive rates fall back to 1 Hz
/// * `seed` - Random number generator seed
pub fn synthetic_measurements(
    truth: [f64; STATE_SIZE],
    noise_std: [f64; STATE_SIZE],
    count: usize,
    rate_hz: f64,
    seed: u64,
) -> Vec<MeasurementRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let period = if rate_hz > 0.0 { 1.0 / rate_hz } else { 1.0 };
    let noise: Vec<Option<Normal<f64>>> = noise_std
        .iter()
        .map(|&sigma| {
            if sigma.is_finite() && sigma > 0.0 {
                Normal::new(0.0, sigma).ok()
            } else {
                None
            }
        })
        .collect();
    debug!("Generating {count} synthetic measurements at {rate_hz} Hz (seed {seed})");

    (0..count)
        .map(|k| {
            let mut pose = truth;
            for (i, value) in pose.iter_mut().enumerate() {
                if let Some(distribution) = &noise[i] {
                    *value += distribution.sample(&mut rng);
                }
                if i >= crate::ATTITUDE_START {
                    *value = wrap_to_180(*value);
                }
            }
            MeasurementRecord::new(k as f64 * period, pose)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use tempfile::NamedTempFile;

    const TRUTH: [f64; 6] = [1.0, 2.0, 3.0, 10.0, 20.0, 30.0];

    #[test]
    fn measurement_csv_roundtrip() {
        let records = vec![
            MeasurementRecord::new(0.0, TRUTH),
            MeasurementRecord::new(0.5, [0.0, 0.0, 0.0, -179.0, 0.0, 179.0]),
        ];
        let f = NamedTempFile::new().unwrap();
        MeasurementRecord::to_csv(&records, f.path()).unwrap();
        let loaded = MeasurementRecord::from_csv(f.path()).unwrap();
        assert_eq!(records, loaded);
    }

    #[test]
    fn measurement_csv_header_names() {
        let f = NamedTempFile::new().unwrap();
        MeasurementRecord::to_csv(&[MeasurementRecord::default()], f.path()).unwrap();
        let text = std::fs::read_to_string(f.path()).unwrap();
        assert!(text.starts_with("time,x,y,z,yaw,pitch,roll"));
    }

    #[test]
    fn malformed_csv_is_an_error() {
        let f = NamedTempFile::new().unwrap();
        std::fs::write(f.path(), "time,x,y,z,yaw,pitch,roll\n0.0,1.0,oops,3,4,5,6\n").unwrap();
        assert!(MeasurementRecord::from_csv(f.path()).is_err());
    }

    #[test]
    fn replay_produces_one_estimate_per_record() {
        let records: Vec<_> = (0..20)
            .map(|k| MeasurementRecord::new(k as f64 * 0.1, TRUTH))
            .collect();
        let mut filter = PoseKalmanFilter::default();
        let estimates = replay(&mut filter, &records);
        assert_eq!(estimates.len(), records.len());
        assert!(estimates.iter().all(|e| e.update_applied));
        assert_eq!(filter.statistics().predictions, 20);
        assert_eq!(estimates.last().unwrap().to_vector(), filter.get_state());
        assert_approx_eq!(estimates[5].time, 0.5, 1e-12);
    }

    #[test]
    fn replay_of_empty_log_is_empty() {
        let mut filter = PoseKalmanFilter::default();
        assert!(replay(&mut filter, &[]).is_empty());
        assert_eq!(filter.statistics().predictions, 0);
    }

    #[test]
    fn estimate_csv_roundtrip() {
        let mut filter = PoseKalmanFilter::default();
        let estimates = replay(&mut filter, &[MeasurementRecord::new(0.0, TRUTH)]);
        let f = NamedTempFile::new().unwrap();
        EstimateRecord::to_csv(&estimates, f.path()).unwrap();
        let loaded = EstimateRecord::from_csv(f.path()).unwrap();
        assert_eq!(estimates, loaded);
    }

    #[test]
    fn synthetic_measurements_are_deterministic() {
        let a = synthetic_measurements(TRUTH, [0.3; 6], 50, 10.0, 7);
        let b = synthetic_measurements(TRUTH, [0.3; 6], 50, 10.0, 7);
        let c = synthetic_measurements(TRUTH, [0.3; 6], 50, 10.0, 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_approx_eq!(a[10].time, 1.0, 1e-12);
    }

    #[test]
    fn synthetic_zero_noise_is_exact() {
        let records = synthetic_measurements(TRUTH, [0.0; 6], 5, 0.0, 1);
        for (k, r) in records.iter().enumerate() {
            assert_eq!(r.to_vector(), PoseVector::from(TRUTH));
            assert_eq!(r.time, k as f64);
        }
    }

    #[test]
    fn synthetic_angles_are_wrapped() {
        let records = synthetic_measurements(
            [0.0, 0.0, 0.0, 179.5, -179.5, 0.0],
            [0.0, 0.0, 0.0, 5.0, 5.0, 5.0],
            200,
            50.0,
            3,
        );
        for r in &records {
            for angle in [r.yaw, r.pitch, r.roll] {
                assert!((-180.0..180.0).contains(&angle));
            }
        }
    }
}
