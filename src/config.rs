//! Provider configuration: the TIMEOUT_DELTA window and generated credential lengths.

// self
use crate::{_prelude::*, error::ConfigError};

/// Smallest request/access token, in random bytes.
pub const MIN_TOKEN_BYTES: usize = 4;
/// Smallest token secret, in random bytes.
pub const MIN_SECRET_BYTES: usize = 12;
/// Smallest verification code, in random bytes.
pub const MIN_VERIFIER_BYTES: usize = 8;
/// Default TIMEOUT_DELTA: one day.
pub const DEFAULT_TIMEOUT_SECS: u32 = 86_400;

/// Tunables consumed by the replay guard and the token lifecycle manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
	/// Allowed clock skew for request timestamps and the lifetime of idle tokens, in seconds.
	pub timeout_secs: u32,
	/// Random bytes behind each request token value.
	pub request_token_bytes: usize,
	/// Random bytes behind each access token value.
	pub access_token_bytes: usize,
	/// Random bytes behind each token secret.
	pub token_secret_bytes: usize,
	/// Random bytes behind each verification code.
	pub verifier_bytes: usize,
}
impl ProviderConfig {
	/// Returns a builder seeded with the defaults.
	pub fn builder() -> ProviderConfigBuilder {
		ProviderConfigBuilder::default()
	}

	/// Parses and validates a JSON configuration document. Absent fields take defaults.
	pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(document);
		let config: Self = serde_path_to_error::deserialize(&mut de).map_err(|e| {
			ConfigError::Parse { path: e.path().to_string(), message: e.inner().to_string() }
		})?;

		config.validate()?;

		Ok(config)
	}

	/// TIMEOUT_DELTA as a duration.
	pub fn timeout_delta(&self) -> Duration {
		Duration::seconds(i64::from(self.timeout_secs))
	}

	/// Validates protocol minimums.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.timeout_secs == 0 {
			return Err(ConfigError::NonPositiveTimeout);
		}

		ensure_min("request_token_bytes", self.request_token_bytes, MIN_TOKEN_BYTES)?;
		ensure_min("access_token_bytes", self.access_token_bytes, MIN_TOKEN_BYTES)?;
		ensure_min("token_secret_bytes", self.token_secret_bytes, MIN_SECRET_BYTES)?;
		ensure_min("verifier_bytes", self.verifier_bytes, MIN_VERIFIER_BYTES)?;

		Ok(())
	}
}
impl Default for ProviderConfig {
	fn default() -> Self {
		Self {
			timeout_secs: DEFAULT_TIMEOUT_SECS,
			request_token_bytes: 16,
			access_token_bytes: 16,
			token_secret_bytes: 24,
			verifier_bytes: MIN_VERIFIER_BYTES,
		}
	}
}

/// Builder for [`ProviderConfig`] values.
#[derive(Clone, Debug, Default)]
pub struct ProviderConfigBuilder {
	config: ProviderConfig,
}
impl ProviderConfigBuilder {
	/// Overrides TIMEOUT_DELTA in seconds.
	pub fn timeout_secs(mut self, secs: u32) -> Self {
		self.config.timeout_secs = secs;

		self
	}

	/// Overrides the request token length.
	pub fn request_token_bytes(mut self, bytes: usize) -> Self {
		self.config.request_token_bytes = bytes;

		self
	}

	/// Overrides the access token length.
	pub fn access_token_bytes(mut self, bytes: usize) -> Self {
		self.config.access_token_bytes = bytes;

		self
	}

	/// Overrides the token secret length.
	pub fn token_secret_bytes(mut self, bytes: usize) -> Self {
		self.config.token_secret_bytes = bytes;

		self
	}

	/// Overrides the verification code length.
	pub fn verifier_bytes(mut self, bytes: usize) -> Self {
		self.config.verifier_bytes = bytes;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ProviderConfig, ConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

fn ensure_min(field: &'static str, actual: usize, min: usize) -> Result<(), ConfigError> {
	if actual < min { Err(ConfigError::CredentialTooShort { field, min, actual }) } else { Ok(()) }
}
