//! Viewer configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use mira_core::{DEFAULT_QUEUE_CAPACITY, PumpConfig};

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Protocol pump tuning.
    pub pump: PumpSection,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Mirror source address (IP:port).
    pub address: String,
    /// Connection timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Protocol pump tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PumpSection {
    /// Frame buffers kept by the image decoder's pool.
    pub pool_frames: usize,
    /// Seconds of silence before the stall indicator shows.
    pub watchdog_secs: u64,
    /// Hand-off queue capacity before updates are dropped.
    pub queue_capacity: usize,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            pump: PumpSection::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:5002".into(),
            timeout_ms: 5000,
        }
    }
}

impl Default for PumpSection {
    fn default() -> Self {
        let pump = PumpConfig::default();
        Self {
            pool_frames: pump.pool_frames,
            watchdog_secs: pump.watchdog_timeout.as_secs(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ViewConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default config to a file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Pump tunables derived from this config.
    pub fn pump_config(&self) -> PumpConfig {
        PumpConfig {
            pool_frames: self.pump.pool_frames,
            watchdog_timeout: Duration::from_secs(self.pump.watchdog_secs),
            ..PumpConfig::default()
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = ViewConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("address"));
        assert!(text.contains("watchdog_secs"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = ViewConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ViewConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.address, "127.0.0.1:5002");
        assert_eq!(parsed.pump.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn write_default_emits_parseable_file() {
        let path = std::env::temp_dir().join("mira-view-write-default-test.toml");
        ViewConfig::write_default(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: ViewConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network.timeout_ms, 5000);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn pump_config_carries_tunables() {
        let mut cfg = ViewConfig::default();
        cfg.pump.watchdog_secs = 3;
        cfg.pump.pool_frames = 7;
        let pump = cfg.pump_config();
        assert_eq!(pump.watchdog_timeout, Duration::from_secs(3));
        assert_eq!(pump.pool_frames, 7);
    }
}
