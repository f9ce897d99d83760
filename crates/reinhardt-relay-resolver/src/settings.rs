//! Resolver settings
//!
//! Settings can be built in code, parsed from TOML, or read from environment
//! variables:
//!
//! | Variable | Setting |
//! |----------|---------|
//! | `REINHARDT_RELAY_FETCH_POLICY` | `default_fetch_policy` |
//! | `REINHARDT_RELAY_FORCE_FETCH` | `default_cache_config.force` |
//! | `REINHARDT_RELAY_POLL_INTERVAL_MS` | `default_cache_config.poll` |

use reinhardt_relay_runtime::{CacheConfig, FetchPolicy};
use serde::{Deserialize, Serialize};

/// Errors raised while loading or validating settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	/// The settings source could not be parsed.
	#[error("Parse error: {0}")]
	ParseError(String),
	/// An environment variable held an unusable value.
	#[error("Invalid value for {name}: {message}")]
	InvalidEnv {
		/// Name of the variable.
		name: &'static str,
		/// What was wrong with it.
		message: String,
	},
	/// The settings are inconsistent.
	#[error("Validation error: {0}")]
	ValidationError(String),
}

/// Defaults applied to routes that do not configure their own values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolverSettings {
	/// Fetch policy for routes without one.
	#[serde(default)]
	pub default_fetch_policy: FetchPolicy,

	/// Cache config for routes without one.
	#[serde(default)]
	pub default_cache_config: Option<CacheConfig>,
}

impl ResolverSettings {
	/// Creates settings with defaults.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the default fetch policy.
	pub fn with_fetch_policy(mut self, fetch_policy: FetchPolicy) -> Self {
		self.default_fetch_policy = fetch_policy;
		self
	}

	/// Sets the default cache config.
	pub fn with_cache_config(mut self, cache_config: CacheConfig) -> Self {
		self.default_cache_config = Some(cache_config);
		self
	}

	/// Parses and validates settings from TOML.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_relay_resolver::ResolverSettings;
	/// use reinhardt_relay_runtime::FetchPolicy;
	///
	/// let settings = ResolverSettings::from_toml_str(
	///     r#"
	/// default_fetch_policy = "store-and-network"
	///
	/// [default_cache_config]
	/// force = true
	/// "#,
	/// )
	/// .unwrap();
	///
	/// assert_eq!(settings.default_fetch_policy, FetchPolicy::StoreAndNetwork);
	/// assert!(settings.default_cache_config.unwrap().force);
	/// ```
	pub fn from_toml_str(contents: &str) -> Result<Self, SettingsError> {
		let settings: Self = toml::from_str(contents)
			.map_err(|e| SettingsError::ParseError(format!("TOML parse error: {}", e)))?;
		settings.validate()?;
		Ok(settings)
	}

	/// Loads and validates settings from environment variables.
	pub fn from_env() -> Result<Self, SettingsError> {
		let mut settings = Self::default();

		if let Ok(policy) = std::env::var("REINHARDT_RELAY_FETCH_POLICY") {
			settings.default_fetch_policy =
				policy
					.trim()
					.parse()
					.map_err(|e: reinhardt_relay_runtime::UnknownFetchPolicy| {
						SettingsError::InvalidEnv {
							name: "REINHARDT_RELAY_FETCH_POLICY",
							message: e.to_string(),
						}
					})?;
		}

		if let Ok(force) = std::env::var("REINHARDT_RELAY_FORCE_FETCH") {
			let force = force.to_lowercase() == "true" || force == "1";
			settings
				.default_cache_config
				.get_or_insert_with(CacheConfig::default)
				.force = force;
		}

		if let Ok(poll) = std::env::var("REINHARDT_RELAY_POLL_INTERVAL_MS") {
			let poll = poll
				.trim()
				.parse::<u64>()
				.map_err(|e| SettingsError::InvalidEnv {
					name: "REINHARDT_RELAY_POLL_INTERVAL_MS",
					message: e.to_string(),
				})?;
			settings
				.default_cache_config
				.get_or_insert_with(CacheConfig::default)
				.poll = Some(poll);
		}

		settings.validate()?;
		Ok(settings)
	}

	/// Validates settings.
	pub fn validate(&self) -> Result<(), SettingsError> {
		let poll = self
			.default_cache_config
			.as_ref()
			.and_then(|cache_config| cache_config.poll);
		if poll == Some(0) {
			return Err(SettingsError::ValidationError(
				"poll interval must be greater than zero".to_string(),
			));
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serial_test::serial;

	const VARIABLES: [&str; 3] = [
		"REINHARDT_RELAY_FETCH_POLICY",
		"REINHARDT_RELAY_FORCE_FETCH",
		"REINHARDT_RELAY_POLL_INTERVAL_MS",
	];

	fn with_env<T>(values: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
		// SAFETY: Environment variables are process-global.
		// Tests calling this are marked #[serial] to ensure exclusive access.
		unsafe {
			for name in VARIABLES {
				std::env::remove_var(name);
			}
			for (name, value) in values {
				std::env::set_var(name, value);
			}
		}

		let result = f();

		// SAFETY: See above.
		unsafe {
			for name in VARIABLES {
				std::env::remove_var(name);
			}
		}
		result
	}

	#[rstest]
	fn test_defaults() {
		let settings = ResolverSettings::default();
		assert_eq!(settings.default_fetch_policy, FetchPolicy::NetworkOnly);
		assert!(settings.default_cache_config.is_none());
		assert!(settings.validate().is_ok());
	}

	#[rstest]
	fn test_from_toml_empty() {
		assert_eq!(
			ResolverSettings::from_toml_str("").unwrap(),
			ResolverSettings::default()
		);
	}

	#[rstest]
	#[case("default_fetch_policy = \"store-only\"")]
	#[case("default_fetch_policy = 3")]
	fn test_from_toml_rejects_bad_policy(#[case] contents: &str) {
		assert!(matches!(
			ResolverSettings::from_toml_str(contents),
			Err(SettingsError::ParseError(_))
		));
	}

	#[rstest]
	fn test_from_toml_rejects_zero_poll() {
		let result = ResolverSettings::from_toml_str("[default_cache_config]\npoll = 0\n");
		assert!(matches!(result, Err(SettingsError::ValidationError(_))));
	}

	#[rstest]
	#[serial(relay_env)]
	fn test_from_env() {
		let settings = with_env(
			&[
				("REINHARDT_RELAY_FETCH_POLICY", "store-or-network"),
				("REINHARDT_RELAY_FORCE_FETCH", "true"),
				("REINHARDT_RELAY_POLL_INTERVAL_MS", "250"),
			],
			ResolverSettings::from_env,
		)
		.unwrap();

		assert_eq!(settings.default_fetch_policy, FetchPolicy::StoreOrNetwork);
		let cache_config = settings.default_cache_config.unwrap();
		assert!(cache_config.force);
		assert_eq!(cache_config.poll, Some(250));
	}

	#[rstest]
	#[serial(relay_env)]
	fn test_from_env_without_variables() {
		let settings = with_env(&[], ResolverSettings::from_env).unwrap();
		assert_eq!(settings, ResolverSettings::default());
	}

	#[rstest]
	#[case("REINHARDT_RELAY_FETCH_POLICY", "sometimes")]
	#[case("REINHARDT_RELAY_POLL_INTERVAL_MS", "soon")]
	#[serial(relay_env)]
	fn test_from_env_rejects_invalid_values(#[case] name: &str, #[case] value: &str) {
		let result = with_env(&[(name, value)], ResolverSettings::from_env);
		assert!(matches!(result, Err(SettingsError::InvalidEnv { .. })));
	}

	#[rstest]
	#[serial(relay_env)]
	fn test_from_env_rejects_zero_poll() {
		let result = with_env(
			&[("REINHARDT_RELAY_POLL_INTERVAL_MS", "0")],
			ResolverSettings::from_env,
		);
		assert!(matches!(result, Err(SettingsError::ValidationError(_))));
	}
}
