//! Serializable filter configuration
//!
//! A [`FilterConfig`] carries everything needed to construct a [`PoseKalmanFilter`]: the
//! initial pose, the process and measurement noise standard deviations, the covariance update
//! variant, and logging preferences for the applications that host the filter. Any field left out
//! of a configuration file falls back to the documented default, so an empty file is a valid
//! configuration.
//!
//! ```toml
//! initial_state = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
//! process_noise_std = [0.1, 0.1, 0.1, 0.5, 0.5, 0.5]
//! measurement_noise_std = [0.3, 0.3, 0.2, 2.0, 1.0, 1.0]
//! covariance_update = "standard"
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::kalman::{CovarianceUpdate, PoseKalmanFilter};
use crate::noise::{
    DEFAULT_INITIAL_STATE, DEFAULT_MEASUREMENT_NOISE_STD, DEFAULT_PROCESS_NOISE_STD,
};
use crate::{MEAS_SIZE, STATE_SIZE};

fn default_initial_state() -> [f64; STATE_SIZE] {
    DEFAULT_INITIAL_STATE
}
fn default_process_noise_std() -> [f64; STATE_SIZE] {
    DEFAULT_PROCESS_NOISE_STD
}
fn default_measurement_noise_std() -> [f64; MEAS_SIZE] {
    DEFAULT_MEASUREMENT_NOISE_STD
}

/// Log verbosity, mirroring [`log::LevelFilter`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}
impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Logging preferences for a host application
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
    /// Log file path; stderr when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Initial pose `[x, y, z, yaw, pitch, roll]`
    #[serde(default = "default_initial_state")]
    pub initial_state: [f64; STATE_SIZE],

    /// Process noise standard deviations, squared into the diagonal of `Q`
    #[serde(default = "default_process_noise_std")]
    pub process_noise_std: [f64; STATE_SIZE],

    /// Measurement noise standard deviations, squared into the diagonal of `R`
    #[serde(default = "default_measurement_noise_std")]
    pub measurement_noise_std: [f64; MEAS_SIZE],

    #[serde(default)]
    pub covariance_update: CovarianceUpdate,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            initial_state: default_initial_state(),
            process_noise_std: default_process_noise_std(),
            measurement_noise_std: default_measurement_noise_std(),
            covariance_update: CovarianceUpdate::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl FilterConfig {
    /// Construct a filter from this configuration.
    pub fn build(&self) -> PoseKalmanFilter {
        PoseKalmanFilter::new(
            Some(self.initial_state),
            Some(self.process_noise_std),
            Some(self.measurement_noise_std),
        )
        .with_covariance_update(self.covariance_update)
    }

    /// Write the configuration to a JSON file (pretty-printed).
    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self).map_err(io::Error::other)
    }

    /// Read the configuration from a JSON file.
    pub fn from_json<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        serde_json::from_reader(file).map_err(io::Error::other)
    }
    /// Write the configuration as YAML.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = File::create(path)?;
        let s = serde_yaml::to_string(self).map_err(io::Error::other)?;
        file.write_all(s.as_bytes())
    }

    /// Read the configuration from YAML.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        serde_yaml::from_reader(file).map_err(io::Error::other)
    }
    /// Write the configuration as TOML.
    pub fn to_toml<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = File::create(path)?;
        let s = toml::to_string(self).map_err(io::Error::other)?;
        file.write_all(s.as_bytes())
    }
    /// Read the configuration from TOML.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let mut s = String::new();
        let mut file = File::open(path)?;
        file.read_to_string(&mut s)?;
        toml::from_str(&s).map_err(io::Error::other)
    }
    /// Generic write: choose format by file extension (.json/.yaml/.yml/.toml)
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let p = path.as_ref();
        match extension_of(p).as_deref() {
            Some("json") => self.to_json(p),
            Some("yaml") | Some("yml") => self.to_yaml(p),
            Some("toml") => self.to_toml(p),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "unsupported file extension",
            )),
        }
    }
    /// Generic read: choose format by file extension (.json/.yaml/.yml/.toml)
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let p = path.as_ref();
        match extension_of(p).as_deref() {
            Some("json") => Self::from_json(p),
            Some("yaml") | Some("yml") => Self::from_yaml(p),
            Some("toml") => Self::from_toml(p),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "unsupported file extension",
            )),
        }
    }
}

impl From<&FilterConfig> for PoseKalmanFilter {
    fn from(config: &FilterConfig) -> Self {
        config.build()
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn sample_cfg() -> FilterConfig {
        FilterConfig {
            initial_state: [1.0, 2.0, 3.0, 10.0, -20.0, 30.0],
            process_noise_std: [0.05; 6],
            measurement_noise_std: [0.5, 0.5, 0.5, 3.0, 3.0, 3.0],
            covariance_update: CovarianceUpdate::Joseph,
            logging: LoggingConfig {
                level: LogLevel::Debug,
                file: Some("/tmp/posekf.log".to_string()),
            },
        }
    }

    #[test]
    fn json_roundtrip() {
        let cfg = sample_cfg();
        let f = NamedTempFile::new().unwrap();
        let path = f.path().with_extension("json");
        cfg.to_json(&path).unwrap();
        let loaded = FilterConfig::from_json(&path).unwrap();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn yaml_roundtrip() {
        let cfg = sample_cfg();
        let f = NamedTempFile::new().unwrap();
        let path = f.path().with_extension("yaml");
        cfg.to_yaml(&path).unwrap();
        let loaded = FilterConfig::from_yaml(&path).unwrap();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = sample_cfg();
        let f = NamedTempFile::new().unwrap();
        let path = f.path().with_extension("toml");
        cfg.to_toml(&path).unwrap();
        let loaded = FilterConfig::from_toml(&path).unwrap();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn generic_dispatch_by_extension() {
        let cfg = FilterConfig::default();
        for ext in ["json", "yaml", "yml", "toml", "TOML"] {
            let f = NamedTempFile::new().unwrap();
            let path = f.path().with_extension(ext);
            cfg.to_file(&path).unwrap();
            let loaded = FilterConfig::from_file(&path).unwrap();
            assert_eq!(cfg, loaded, "extension {ext}");
        }
    }

    #[test]
    fn unsupported_extension_error() {
        let cfg = sample_cfg();
        let f = NamedTempFile::new().unwrap();
        let path = f.path().with_extension("txt");

        let result = cfg.to_file(&path);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidInput);

        let result = FilterConfig::from_file(&path);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let empty: FilterConfig = toml::from_str("").unwrap();
        assert_eq!(empty, FilterConfig::default());

        let partial: FilterConfig =
            serde_json::from_str(r#"{ "process_noise_std": [1, 1, 1, 2, 2, 2] }"#).unwrap();
        assert_eq!(partial.process_noise_std, [1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
        assert_eq!(partial.measurement_noise_std, DEFAULT_MEASUREMENT_NOISE_STD);
        assert_eq!(partial.initial_state, DEFAULT_INITIAL_STATE);
        assert_eq!(partial.covariance_update, CovarianceUpdate::Standard);
        assert_eq!(partial.logging.level, LogLevel::Info);
    }

    #[test]
    fn covariance_update_names() {
        let cfg: FilterConfig = toml::from_str(r#"covariance_update = "symmetrized""#).unwrap();
        assert_eq!(cfg.covariance_update, CovarianceUpdate::Symmetrized);
        assert!(toml::from_str::<FilterConfig>(r#"covariance_update = "bogus""#).is_err());
    }

    #[test]
    fn build_applies_every_setting() {
        let cfg = sample_cfg();
        let filter = cfg.build();
        assert_eq!(filter.get_state().as_slice(), &cfg.initial_state);
        assert_eq!(filter.covariance_update(), CovarianceUpdate::Joseph);
        assert!((filter.get_process_noise()[(0, 0)] - 0.0025).abs() < 1e-15);
        assert!((filter.get_measurement_noise()[(3, 3)] - 9.0).abs() < 1e-15);
        let via_from = PoseKalmanFilter::from(&cfg);
        assert_eq!(via_from.get_state(), filter.get_state());
    }

    #[test]
    fn log_level_conversions() {
        assert_eq!(LogLevel::default().as_str(), "info");
        assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
        assert_eq!(LogLevel::Off.to_level_filter(), log::LevelFilter::Off);
        let parsed: log::LevelFilter = LogLevel::Warn.as_str().parse().unwrap();
        assert_eq!(parsed, log::LevelFilter::Warn);
    }
}
