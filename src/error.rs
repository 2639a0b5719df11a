//! Fault-level error types shared across the store, lifecycle, and validation layers.
//!
//! Protocol outcomes (bad nonce, expired token, ...) are never errors; they travel as
//! [`OAuthState`](crate::session::OAuthState) values. Everything in this module is a hard
//! failure that callers must propagate.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical fault exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Inbound request material could not be interpreted.
	#[error(transparent)]
	InvalidRequest(#[from] crate::request::RequestError),
	/// The operating-system random source failed.
	#[error("Secure random source is unavailable: {message}.")]
	Entropy {
		/// Description reported by the random source.
		message: String,
	},
}
impl Error {
	/// Wraps a random-source failure.
	pub fn entropy(src: impl Display) -> Self {
		Self::Entropy { message: src.to_string() }
	}
}

/// Configuration and validation failures raised while assembling a provider.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ConfigError {
	/// TIMEOUT_DELTA must be a positive number of seconds.
	#[error("The timeout delta must be positive.")]
	NonPositiveTimeout,
	/// A generated credential would fall below its protocol minimum length.
	#[error("The {field} length must be at least {min} bytes, got {actual}.")]
	CredentialTooShort {
		/// Configuration field that failed validation.
		field: &'static str,
		/// Minimum permitted byte count.
		min: usize,
		/// Value that was supplied.
		actual: usize,
	},
	/// The configuration document could not be parsed.
	#[error("Configuration field `{path}` is invalid: {message}.")]
	Parse {
		/// Dotted path to the offending field.
		path: String,
		/// Parser message.
		message: String,
	},
	/// `register` validation was requested but no registration hook is installed.
	#[error("No registration hook is installed.")]
	MissingRegistrationHook,
}
