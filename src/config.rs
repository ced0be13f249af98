// Run configuration.
//
// Every knob has a built-in default so the binary runs with no setup at all.
// `STREAM_URL` overrides the primary endpoint; the remaining knobs are read
// from `MOVIE_REPORT_*` variables (e.g. `MOVIE_REPORT_OUTPUT_PATH`).
use crate::error::{ReportError, Result};
use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_STREAM_URL: &str = "http://5.181.20.204:8080/api/v1/stream-data";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Primary NDJSON endpoint.
    pub stream_url: String,
    /// Local NDJSON file read when the stream is unusable.
    pub fallback_path: PathBuf,
    /// The generated document.
    pub output_path: PathBuf,
    /// Directory that receives chart data files.
    pub chart_dir: PathBuf,
    pub timeout_secs: u64,
    /// Rows shown in the console preview table.
    pub preview_rows: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            stream_url: DEFAULT_STREAM_URL.to_string(),
            fallback_path: PathBuf::from("stream-data"),
            output_path: PathBuf::from("analysis_result.md"),
            chart_dir: PathBuf::from("charts"),
            timeout_secs: 10,
            preview_rows: 3,
        }
    }
}

impl AppConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Layer defaults, `MOVIE_REPORT_*` variables and `STREAM_URL`, in that order.
pub fn load_config() -> Result<AppConfig> {
    let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
        .merge(Env::prefixed("MOVIE_REPORT_"))
        .merge(Env::raw().only(&["stream_url"]))
        .extract()
        .map_err(|e| ReportError::Config(Box::new(e)))?;
    info!(
        stream_url = %config.stream_url,
        fallback = %config.fallback_path.display(),
        "configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_apply_without_environment() {
        Jail::expect_with(|_jail| {
            let config = load_config().expect("defaults should load");
            assert_eq!(config, AppConfig::default());
            assert_eq!(config.stream_url, DEFAULT_STREAM_URL);
            assert_eq!(config.timeout(), Duration::from_secs(10));
            Ok(())
        });
    }

    #[test]
    fn stream_url_is_overridden_by_environment() {
        Jail::expect_with(|jail| {
            jail.set_env("STREAM_URL", "http://localhost:9000/stream");
            let config = load_config().expect("env override should load");
            assert_eq!(config.stream_url, "http://localhost:9000/stream");
            assert_eq!(config.fallback_path, PathBuf::from("stream-data"));
            Ok(())
        });
    }

    #[test]
    fn prefixed_variables_override_paths_and_timeout() {
        Jail::expect_with(|jail| {
            jail.set_env("MOVIE_REPORT_OUTPUT_PATH", "out/report.md");
            jail.set_env("MOVIE_REPORT_TIMEOUT_SECS", "3");
            let config = load_config().expect("prefixed override should load");
            assert_eq!(config.output_path, PathBuf::from("out/report.md"));
            assert_eq!(config.timeout_secs, 3);
            Ok(())
        });
    }

    #[test]
    fn bad_timeout_is_a_config_error() {
        Jail::expect_with(|jail| {
            jail.set_env("MOVIE_REPORT_TIMEOUT_SECS", "soon");
            let err = load_config().expect_err("non-numeric timeout must fail");
            assert!(matches!(err, ReportError::Config(_)));
            Ok(())
        });
    }
}
