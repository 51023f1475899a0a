use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::CaptureSettings;
use crate::state::StateConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid setting {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

/// Analyzer settings. Intervals and windows are in milliseconds.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub grpc_server_address: String,
    /// 0 disables the signal check.
    pub min_bss_creation_rssi: i8,
    pub metrics_interval: u64,
    pub history_points: usize,
    pub confirmation_window: u64,
    pub stale_after: u64,
    pub snapshot_interval: u64,
    pub prune_interval: u64,
    pub control_timeout: u64,
    pub logging: LoggingConfig,
    pub capture: CaptureSettings,
    /// Snapshot sink, standard output when unset.
    pub output: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            grpc_server_address: "192.168.6.250:50051".to_string(),
            min_bss_creation_rssi: -84,
            metrics_interval: 1000,
            history_points: 60,
            confirmation_window: 60_000,
            stale_after: 120_000,
            snapshot_interval: 500,
            prune_interval: 30_000,
            control_timeout: 10_000,
            logging: LoggingConfig::default(),
            capture: CaptureSettings::default(),
            output: None,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the configuration file, falling back to the defaults when there is none or it
    /// can't be used. The error is handed back so it can be reported once logging is up.
    pub fn load(path: Option<&Path>) -> (Config, Option<ConfigError>) {
        let Some(path) = path else {
            return (Config::default(), None);
        };
        match Config::from_file(path) {
            Ok(config) => (config, None),
            Err(err) => (Config::default(), Some(err)),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("metrics_interval", self.metrics_interval),
            ("snapshot_interval", self.snapshot_interval),
            ("prune_interval", self.prune_interval),
            ("control_timeout", self.control_timeout),
            ("confirmation_window", self.confirmation_window),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be positive")));
        }
        if self.history_points == 0 {
            return Err(ConfigError::Invalid(
                "history_points must be positive".to_string(),
            ));
        }
        if self.grpc_server_address.is_empty() {
            return Err(ConfigError::Invalid(
                "grpc_server_address is empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn state_config(&self) -> StateConfig {
        StateConfig {
            confirmation_window: Duration::from_millis(self.confirmation_window),
            min_bss_creation_rssi: (self.min_bss_creation_rssi != 0)
                .then_some(self.min_bss_creation_rssi),
            history_points: self.history_points,
        }
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_millis(self.metrics_interval)
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot_interval)
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_millis(self.prune_interval)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after)
    }

    pub fn control_timeout(&self) -> Duration {
        Duration::from_millis(self.control_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"grpc_server_address": "10.0.0.1:50051", "history_points": 10, "capture": {{"channel": 36}}}}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.grpc_server_address, "10.0.0.1:50051");
        assert_eq!(config.history_points, 10);
        assert_eq!(config.capture.channel, 36);
        assert_eq!(config.capture.interface, "wlan0");
        assert_eq!(config.metrics_interval, 1000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
        let (config, error) = Config::load(Some(file.path()));
        assert_eq!(config, Config::default());
        assert!(error.is_some());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let path = Path::new("/nonexistent/wifi_analyzer.json");
        assert!(matches!(
            Config::from_file(path),
            Err(ConfigError::Io { .. })
        ));
        assert_eq!(Config::load(Some(path)).0, Config::default());
        assert!(Config::load(None).1.is_none());
    }

    #[test]
    fn test_invalid_values() {
        let config = Config {
            metrics_interval: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rssi_zero_is_unset() {
        let mut config = Config::default();
        assert_eq!(config.state_config().min_bss_creation_rssi, Some(-84));
        config.min_bss_creation_rssi = 0;
        assert_eq!(config.state_config().min_bss_creation_rssi, None);
        assert_eq!(
            config.state_config().confirmation_window,
            Duration::from_secs(60)
        );
    }
}
