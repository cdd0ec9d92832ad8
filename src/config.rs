// src/config.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use crate::drivers::FilterSpec;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub reader: ReaderSettings,
    pub display: DisplaySettings,
    pub export: ExportSettings,
    pub acquisition: AcquisitionInputs,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path` if given; a broken file is reported and replaced by the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::load(path) {
            Ok(config) => {
                log::info!("loaded config from {}", path.display());
                config
            }
            Err(err) => {
                log::error!("{err}; using defaults");
                Self::default()
            }
        }
    }
}

// ESP32 连接参数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderSettings {
    pub host: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub chunk_size: usize,
    pub buffer_capacity: usize,
}

impl ReaderSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.max(1))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.max(1))
    }
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            host: "172.20.10.3".to_owned(),
            port: 8080,
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
            chunk_size: 1024,
            buffer_capacity: 750,
        }
    }
}

// 实时显示参数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub refresh_ms: u64,
    pub data_len: usize,
    pub fft_size: usize,
    pub sample_rate_hz: f64,
    pub smoothing_cutoff_hz: f64,
    pub filter_order: usize,
}

impl DisplaySettings {
    pub fn refresh(&self) -> Duration {
        Duration::from_millis(self.refresh_ms.max(1))
    }

    pub fn smoothing_filter(&self) -> FilterSpec {
        FilterSpec::lowpass(self.smoothing_cutoff_hz, self.sample_rate_hz, self.filter_order)
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            refresh_ms: 100,
            data_len: 750,
            fft_size: 256,
            sample_rate_hz: 500.0,
            smoothing_cutoff_hz: 50.0,
            filter_order: 5,
        }
    }
}

// 离线导出滤波参数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub output_dir: PathBuf,
    pub lowcut_hz: f64,
    pub highcut_hz: f64,
    pub sample_rate_hz: f64,
    pub order: usize,
}

impl ExportSettings {
    pub fn filter(&self) -> FilterSpec {
        FilterSpec::bandpass(self.lowcut_hz, self.highcut_hz, self.sample_rate_hz, self.order)
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            lowcut_hz: 0.5,
            highcut_hz: 30.0,
            sample_rate_hz: 500.0,
            order: 5,
        }
    }
}

/// Initial text of the acquisition input boxes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionInputs {
    pub rounds: String,
    pub rest_secs: String,
    pub left_secs: String,
    pub right_secs: String,
}

impl Default for AcquisitionInputs {
    fn default() -> Self {
        Self {
            rounds: "1".to_owned(),
            rest_secs: "1".to_owned(),
            left_secs: "3".to_owned(),
            right_secs: "3".to_owned(),
        }
    }
}
