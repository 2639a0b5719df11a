//! Signature verification seam and the built-in OAuth 1.0a signature methods.
//!
//! The validation pipeline only depends on [`SignatureVerifier`]. [`StandardVerifier`] covers
//! `HMAC-SHA1`, `HMAC-SHA256`, and `PLAINTEXT`; asymmetric methods such as `RSA-SHA1` need a
//! custom implementation that looks up the consumer's public key.

pub mod base_string;
pub mod method;

pub use base_string::*;
pub use method::*;

// self
use crate::{_prelude::*, request::SignedRequest};

/// Secrets a signature is checked against for the current validation mode.
#[derive(Clone, Copy)]
pub struct SigningSecrets<'a> {
	/// Consumer secret.
	pub consumer_secret: &'a str,
	/// Request- or access-token secret; absent on consumer-only calls.
	pub token_secret: Option<&'a str>,
}
impl<'a> SigningSecrets<'a> {
	/// Secrets for a call signed by the consumer alone.
	pub fn consumer_only(consumer_secret: &'a str) -> Self {
		Self { consumer_secret, token_secret: None }
	}

	/// Secrets for a call signed with a token.
	pub fn with_token(consumer_secret: &'a str, token_secret: &'a str) -> Self {
		Self { consumer_secret, token_secret: Some(token_secret) }
	}
}
impl Debug for SigningSecrets<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SigningSecrets")
			.field("consumer_secret", &"<redacted>")
			.field("token_secret", &self.token_secret.map(|_| "<redacted>"))
			.finish()
	}
}

/// Confirms that a request's submitted signature is authentic.
pub trait SignatureVerifier
where
	Self: Send + Sync,
{
	/// Returns `true` when `request.oauth.signature` matches the request signed with `secrets`.
	fn verify(&self, request: &SignedRequest, secrets: &SigningSecrets<'_>) -> bool;
}
