//! Demo configuration loaded from TOML.
//!
//! Lookup order:
//!
//! 1. `--config PATH` (must exist)
//! 2. `$XDG_CONFIG_HOME/sift/config.toml` (or the platform config dir), if present
//! 3. Built-in defaults
//!
//! ```toml
//! [provider]
//! min_delay_ms = 450
//! max_delay_ms = 900
//! fail_keyword = "fail"
//! result_count = 5
//!
//! [service]
//! cancel_superseded = false
//!
//! [telemetry]
//! json = true
//! tracing = true
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use sift_search::ServiceConfig;
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// The file is not valid TOML for [`DemoConfig`].
	#[error("invalid config {path}: {error}")]
	Parse {
		path: PathBuf,
		error: toml::de::Error,
	},

	/// The provider delay window is inverted.
	#[error("provider min_delay_ms ({min}) exceeds max_delay_ms ({max})")]
	InvalidDelay { min: u64, max: u64 },
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemoConfig {
	pub provider: ProviderConfig,
	pub service: ServiceSection,
	pub telemetry: TelemetryConfig,
}

/// Simulated provider behavior.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
	pub min_delay_ms: u64,
	pub max_delay_ms: u64,
	/// Queries containing this text (case-insensitive) fail. Empty disables failures.
	pub fail_keyword: String,
	pub result_count: usize,
}

impl Default for ProviderConfig {
	fn default() -> Self {
		Self {
			min_delay_ms: 450,
			max_delay_ms: 900,
			fail_keyword: "fail".to_string(),
			result_count: 5,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceSection {
	pub cancel_superseded: bool,
}

impl ServiceSection {
	pub fn to_service_config(&self) -> ServiceConfig {
		ServiceConfig {
			cancel_superseded: self.cancel_superseded,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
	/// Print each lifecycle event as a JSON line on stdout.
	pub json: bool,
	/// Mirror each lifecycle event into the `tracing` log.
	pub tracing: bool,
}

impl Default for TelemetryConfig {
	fn default() -> Self {
		Self { json: true, tracing: true }
	}
}

impl DemoConfig {
	pub fn parse(text: &str, path: &Path) -> Result<Self> {
		let config: Self = toml::from_str(text).map_err(|error| ConfigError::Parse {
			path: path.to_path_buf(),
			error,
		})?;
		config.validate()?;
		Ok(config)
	}

	pub fn from_file(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::parse(&text, path)
	}

	/// Loads `explicit` if given, else the default config file if it exists.
	pub fn load(explicit: Option<&Path>) -> Result<Self> {
		if let Some(path) = explicit {
			return Self::from_file(path);
		}
		match default_path() {
			Some(path) if path.is_file() => Self::from_file(&path),
			_ => Ok(Self::default()),
		}
	}

	pub fn validate(&self) -> Result<()> {
		let ProviderConfig { min_delay_ms, max_delay_ms, .. } = self.provider;
		if min_delay_ms > max_delay_ms {
			return Err(ConfigError::InvalidDelay {
				min: min_delay_ms,
				max: max_delay_ms,
			});
		}
		Ok(())
	}
}

pub fn default_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("sift").join("config.toml"))
}
