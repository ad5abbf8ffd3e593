//! Host load sampling.

use std::path::PathBuf;

use crate::{AppError, AppResult};

/// Source of the host's 1-minute load average.
#[async_trait::async_trait]
pub trait SystemLoad: Send + Sync {
    /// Current 1-minute load average.
    async fn load_average(&self) -> AppResult<f64>;
}

/// Reads the load average from `/proc/loadavg`.
#[derive(Debug, Clone)]
pub struct LoadAverage {
    path: PathBuf,
}

impl LoadAverage {
    /// Read from the standard procfs location.
    #[must_use]
    pub fn new() -> Self {
        Self::from_path("/proc/loadavg")
    }

    /// Read from a custom file with the same format.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for LoadAverage {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the first field of a `/proc/loadavg` line.
pub fn parse_loadavg(contents: &str) -> AppResult<f64> {
    contents
        .split_whitespace()
        .next()
        .and_then(|field| field.parse::<f64>().ok())
        .ok_or_else(|| AppError::Internal(format!("Malformed loadavg: {contents:?}")))
}

#[async_trait::async_trait]
impl SystemLoad for LoadAverage {
    async fn load_average(&self) -> AppResult<f64> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AppError::Internal(format!("Failed to read {}: {e}", self.path.display()))
        })?;
        parse_loadavg(&contents)
    }
}

/// Fixed load value, for tests and hosts without procfs.
#[derive(Debug, Clone, Copy)]
pub struct FixedLoad(pub f64);

#[async_trait::async_trait]
impl SystemLoad for FixedLoad {
    async fn load_average(&self) -> AppResult<f64> {
        Ok(self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_loadavg() {
        let load = parse_loadavg("0.52 0.58 0.59 1/467 12345\n").unwrap();
        assert!((load - 0.52).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_loadavg_rejects_garbage() {
        assert!(parse_loadavg("").is_err());
        assert!(parse_loadavg("high load").is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let load = LoadAverage::from_path("/nonexistent/loadavg");
        assert!(load.load_average().await.is_err());
    }

    #[tokio::test]
    async fn test_fixed_load() {
        assert!((FixedLoad(3.5).load_average().await.unwrap() - 3.5).abs() < f64::EPSILON);
    }
}
