//! Application configuration.
//!
//! Every field has a default, so an empty TOML document (or
//! [`AppConfig::default`]) is a valid configuration.
//!
//! ```ignore
//! let config = AppConfig::from_toml_str(r#"
//! delimiters = ["[[", "]]"]
//! max_flush_iterations = 500
//! "#)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Interpolation markers in text nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct Delimiters {
	pub open: String,
	pub close: String,
}

impl Default for Delimiters {
	fn default() -> Self {
		Self {
			open: "{{".to_string(),
			close: "}}".to_string(),
		}
	}
}

impl From<(String, String)> for Delimiters {
	fn from((open, close): (String, String)) -> Self {
		Self { open, close }
	}
}

impl From<Delimiters> for (String, String) {
	fn from(d: Delimiters) -> Self {
		(d.open, d.close)
	}
}

/// Settings for one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
	/// Interpolation delimiters.
	pub delimiters: Delimiters,

	/// Token in component styles replaced by the component's scope class.
	pub scope_token: String,

	/// Text rendered where a component template names a slot nobody filled.
	///
	/// `{name}` is replaced by the slot name.
	pub missing_slot_text: String,

	/// Upper bound on scheduler passes per flush before it gives up.
	pub max_flush_iterations: usize,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			delimiters: Delimiters::default(),
			scope_token: ".$scope".to_string(),
			missing_slot_text: "Slot \"{name}\" is not defined".to_string(),
			max_flush_iterations: tendril_reactive::DEFAULT_MAX_FLUSH_ITERATIONS,
		}
	}
}

impl AppConfig {
	/// Parse and validate a TOML document
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(source)?;
		config.validate()?;
		Ok(config)
	}

	/// Validates value ranges.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.delimiters.open.is_empty() || self.delimiters.close.is_empty() {
			return Err(ConfigError::Invalid("delimiters cannot be empty".to_string()));
		}
		if self.scope_token.is_empty() {
			return Err(ConfigError::Invalid("scope_token cannot be empty".to_string()));
		}
		if self.max_flush_iterations == 0 {
			return Err(ConfigError::Invalid(
				"max_flush_iterations must be at least 1".to_string(),
			));
		}
		Ok(())
	}

	/// Placeholder text for an unfilled slot
	pub fn missing_slot(&self, name: &str) -> String {
		self.missing_slot_text.replace("{name}", name)
	}
}
