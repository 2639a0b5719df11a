//! Storage contracts and built-in credential store implementations.
//!
//! A [`CredentialStore`] persists four relations: consumers, request tokens, access tokens,
//! and nonce records. Lookups are exact-match and report absence as `None`. Every mutating
//! call is atomic on its own; in particular nonce recording is insert-if-absent and deleting
//! or expiring a token removes its nonce records in the same unit.

pub mod file;
pub mod memory;
pub mod tables;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use tables::CredentialTables;

// self
use crate::{
	_prelude::*,
	auth::{
		AccessToken, Consumer, NewAccessToken, NewRequestToken, NonceInsert, NonceRecord,
		RequestToken, Secret, TokenId, TokenScope, UserId,
	},
};

/// Boxed future returned by every [`CredentialStore`] call.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by credential stores.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Fetches a consumer by its public key.
	fn find_consumer<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Consumer>>;

	/// Fetches a request token owned by `consumer_key`.
	fn find_request_token<'a>(
		&'a self,
		consumer_key: &'a str,
		token: &'a str,
	) -> StoreFuture<'a, Option<RequestToken>>;

	/// Fetches a request token whose active verification code equals `verifier`.
	fn find_request_token_by_verifier<'a>(
		&'a self,
		consumer_key: &'a str,
		token: &'a str,
		verifier: &'a str,
	) -> StoreFuture<'a, Option<RequestToken>>;

	/// Fetches an access token owned by `consumer_key`.
	fn find_access_token<'a>(
		&'a self,
		consumer_key: &'a str,
		token: &'a str,
	) -> StoreFuture<'a, Option<AccessToken>>;

	/// Persists a request token and returns its row id.
	fn insert_request_token(&self, token: NewRequestToken) -> StoreFuture<'_, TokenId>;

	/// Persists an access token and returns its row id.
	fn insert_access_token(&self, token: NewAccessToken) -> StoreFuture<'_, TokenId>;

	/// Binds an authenticated user to a request token. Returns `false` if the row is gone.
	fn bind_user(&self, request_token: TokenId, user_id: UserId) -> StoreFuture<'_, bool>;

	/// Replaces the verification code of a request token, binding `user_id` alongside it.
	/// Returns `false` if the row is gone.
	fn set_verification_code(
		&self,
		request_token: TokenId,
		user_id: UserId,
		code: Secret,
	) -> StoreFuture<'_, bool>;

	/// Atomically inserts `replacement` and deletes the request token with its nonces, provided
	/// the request token still carries a user and the verification code `verifier`.
	fn exchange_request_token<'a>(
		&'a self,
		request_token: TokenId,
		verifier: &'a str,
		replacement: NewAccessToken,
	) -> StoreFuture<'a, ExchangeOutcome>;

	/// Refreshes the last-used instant of an access token. Returns `false` if the row is gone.
	fn touch_access_token(&self, id: TokenId, instant: OffsetDateTime) -> StoreFuture<'_, bool>;

	/// Deletes a request token and its nonces. Returns `false` if nothing was deleted.
	fn delete_request_token(&self, id: TokenId) -> StoreFuture<'_, bool>;

	/// Deletes an access token and its nonces. Returns `false` if nothing was deleted.
	fn delete_access_token<'a>(
		&'a self,
		consumer_key: &'a str,
		token: &'a str,
	) -> StoreFuture<'a, bool>;

	/// Deletes the token and its nonces only if its reference instant (creation for request
	/// tokens, last use for access tokens) is older than `cutoff`. Returns `true` on deletion.
	fn expire_token(&self, scope: TokenScope, cutoff: OffsetDateTime) -> StoreFuture<'_, bool>;

	/// Records a nonce unless the tuple already exists; the check and the write are one unit.
	fn insert_nonce(&self, record: NonceRecord) -> StoreFuture<'_, NonceInsert>;

	/// Reports whether the exact tuple is recorded.
	fn nonce_exists<'a>(&'a self, record: &'a NonceRecord) -> StoreFuture<'a, bool>;

	/// Deletes every nonce scoped to the token and returns how many were removed.
	fn delete_nonces(&self, scope: TokenScope) -> StoreFuture<'_, usize>;
}

/// Result of an atomic request-token exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeOutcome {
	/// The request token was consumed and the access token row created.
	Exchanged(TokenId),
	/// The request token exists but the verifier (or bound user) did not match.
	VerifierMismatch,
	/// No request token matched the id.
	Missing,
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// A uniqueness constraint other than the nonce tuple was violated.
	#[error("Uniqueness constraint violated: {message}.")]
	Conflict {
		/// Human-readable error payload.
		message: String,
	},
	/// A write was applied but its result could not be read back.
	#[error("Partial write: {message}.")]
	PartialWrite {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn exchange_outcome_can_be_serialized() {
		let payload = serde_json::to_string(&ExchangeOutcome::Exchanged(TokenId(3)))
			.expect("ExchangeOutcome should serialize to JSON.");

		assert_eq!(payload, r#"{"Exchanged":3}"#);

		let round_trip: ExchangeOutcome = serde_json::from_str(&payload)
			.expect("Serialized outcome should deserialize from JSON.");

		assert_eq!(round_trip, ExchangeOutcome::Exchanged(TokenId(3)));
	}

	#[test]
	fn partial_writes_render_as_faults() {
		let error = StoreError::PartialWrite { message: "token id missing after insert".into() };

		assert_eq!(error.to_string(), "Partial write: token id missing after insert.");
	}
}
