//! Common utility functions for the command line application.
//!
//! This module contains:
//! - Logger initialization
//! - Path validation and CSV file discovery

use std::error::Error;
use std::path::{Path, PathBuf};

/// Initialize the logger with the specified configuration.
///
/// # Arguments
/// * `log_level` - Log level string (off, error, warn, info, debug, trace)
/// * `log_file` - Optional path to log file (logs to stderr if None)
///
/// # Errors
/// Returns an error if the log file cannot be opened or logger initialization fails.
pub fn init_logger(log_level: &str, log_file: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    use std::io::Write;

    let level = parse_level(log_level);

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.args()
        )
    });

    if let Some(log_path) = log_file {
        ensure_parent_dir(log_path)?;
        let target = Box::new(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)?,
        );
        builder.target(env_logger::Target::Pipe(target));
    }

    builder.try_init()?;
    Ok(())
}

/// Parse a log level string, falling back to `info` on anything unrecognised.
pub fn parse_level(log_level: &str) -> log::LevelFilter {
    log_level.parse::<log::LevelFilter>().unwrap_or_else(|_| {
        eprintln!("Invalid log level '{}', defaulting to 'info'", log_level);
        log::LevelFilter::Info
    })
}

/// Validate input path exists and is either a file or directory.
///
/// # Errors
/// Returns an error if the path does not exist or is neither a file nor directory.
pub fn validate_input_path(input: &Path) -> Result<(), Box<dyn Error>> {
    if !input.exists() {
        return Err(format!("Input path '{}' does not exist.", input.display()).into());
    }
    if !input.is_file() && !input.is_dir() {
        return Err(format!(
            "Input path '{}' is neither a file nor a directory.",
            input.display()
        )
        .into());
    }
    Ok(())
}

/// Get all CSV files from a path (either single file or all CSVs in directory).
///
/// # Returns
/// A sorted vector of PathBuf for each CSV file found.
///
/// # Errors
/// Returns an error if:
/// - The input file is not a CSV
/// - No CSV files are found in the directory
/// - The path is neither a file nor directory
pub fn get_csv_files(input: &Path) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    if input.is_file() {
        if !is_csv(input) {
            return Err(format!("Input file '{}' is not a CSV file.", input.display()).into());
        }
        Ok(vec![input.to_path_buf()])
    } else if input.is_dir() {
        let mut csv_files: Vec<PathBuf> = std::fs::read_dir(input)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_csv(path))
            .collect();

        if csv_files.is_empty() {
            return Err(format!("No CSV files found in directory '{}'.", input.display()).into());
        }

        csv_files.sort();
        Ok(csv_files)
    } else {
        Err(format!(
            "Input path '{}' is neither a file nor a directory.",
            input.display()
        )
        .into())
    }
}

/// Create the output directory if it does not exist yet.
pub fn validate_output_path(output: &Path) -> Result<(), Box<dyn Error>> {
    if !output.exists() {
        std::fs::create_dir_all(output)?;
    }
    Ok(())
}

/// Create the parent directory of a file path if needed.
pub fn ensure_parent_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_level_accepts_known_names() {
        assert_eq!(parse_level("debug"), log::LevelFilter::Debug);
        assert_eq!(parse_level("OFF"), log::LevelFilter::Off);
        assert_eq!(parse_level("loud"), log::LevelFilter::Info);
    }

    #[test]
    fn missing_input_is_rejected() {
        let dir = tempdir().unwrap();
        assert!(validate_input_path(&dir.path().join("nope.csv")).is_err());
        assert!(validate_input_path(dir.path()).is_ok());
    }

    #[test]
    fn csv_discovery_in_directory() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("b.csv"), "").unwrap();
        std::fs::write(dir.path().join("a.CSV"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        let files = get_csv_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.CSV", "b.csv"]);

        assert!(get_csv_files(&dir.path().join("notes.txt")).is_err());
        let empty = tempdir().unwrap();
        assert!(get_csv_files(empty.path()).is_err());
    }

    #[test]
    fn output_directories_are_created() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("out").join("run1");
        validate_output_path(&nested).unwrap();
        assert!(nested.is_dir());

        let file = dir.path().join("logs").join("sim.log");
        ensure_parent_dir(&file).unwrap();
        assert!(dir.path().join("logs").is_dir());
    }
}
