//! Registered consumer applications.

// self
use crate::{
	_prelude::*,
	auth::{ConsumerId, ConsumerKey, Secret},
};

/// How a consumer's request tokens obtain their verification code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationMode {
	/// The code is issued as soon as a user authenticates against the request token.
	Auto,
	/// The code is issued only after the user explicitly approves the consumer.
	#[default]
	UserAuthorized,
}
impl VerificationMode {
	/// Returns a stable label suitable for logs and config documents.
	pub const fn as_str(self) -> &'static str {
		match self {
			VerificationMode::Auto => "auto",
			VerificationMode::UserAuthorized => "user-authorized",
		}
	}
}
impl Display for VerificationMode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Identity of a calling application. Immutable once registered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
	/// Numeric row identifier; scopes nonce records.
	pub id: ConsumerId,
	/// Public consumer key.
	pub key: ConsumerKey,
	/// Confidential consumer secret.
	pub secret: Secret,
	/// Verification-code issuance policy.
	pub verification_mode: VerificationMode,
	/// Suspended consumers resolve but are refused before any token work.
	#[serde(default)]
	pub suspended: bool,
}
impl Consumer {
	/// Creates an active consumer.
	pub fn new(
		id: ConsumerId,
		key: ConsumerKey,
		secret: impl Into<String>,
		verification_mode: VerificationMode,
	) -> Self {
		Self { id, key, secret: Secret::new(secret), verification_mode, suspended: false }
	}

	/// Marks the consumer as permanently refused.
	pub fn suspend(mut self) -> Self {
		self.suspended = true;

		self
	}
}
