//! Token lifecycle manager: issuance, user binding, verification codes, exchange, sliding
//! expiry, and revocation.
//!
//! Every mutation goes through one [`CredentialStore`] call so deletions and their nonce
//! cascades land atomically. Random material comes from the operating-system CSPRNG.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};
// self
use crate::{
	_prelude::*,
	auth::{
		AccessToken, Consumer, NewAccessToken, NewRequestToken, RequestToken, Secret, TokenScope,
		TokenValue, UserId, VerificationMode,
	},
	config::ProviderConfig,
	identity::{self, UserDirectory},
	obs::{self, LifecycleEvent, ProviderSpan},
	session::OAuthState,
	store::{CredentialStore, ExchangeOutcome},
};

/// Result of authenticating a user against a request token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindOutcome {
	/// The proof matched; the user is now bound to the request token.
	Bound {
		/// Updated request token row.
		token: RequestToken,
		/// Verification code, issued immediately for `auto` consumers.
		verification_code: Option<Secret>,
	},
	/// Unknown email or wrong proof. Nothing was changed.
	Rejected,
}

/// Result of exchanging a request token for an access token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExchangeResult {
	/// A new access token was minted and the request token deleted.
	Exchanged(AccessToken),
	/// The verifier did not match; the request token is kept for a retry.
	VerifierInvalid,
	/// The request token no longer exists.
	TokenRejected,
}
impl ExchangeResult {
	/// Protocol outcome corresponding to the result.
	pub fn state(&self) -> OAuthState {
		match self {
			Self::Exchanged(_) => OAuthState::Ok,
			Self::VerifierInvalid => OAuthState::VerifierInvalid,
			Self::TokenRejected => OAuthState::TokenRejected,
		}
	}
}

/// Generates, persists, expires, and revokes request and access tokens.
#[derive(Clone)]
pub struct TokenLifecycle {
	store: Arc<dyn CredentialStore>,
	directory: Arc<dyn UserDirectory>,
	config: ProviderConfig,
}
impl TokenLifecycle {
	/// Creates a manager over the given store and user directory.
	pub fn new(
		store: Arc<dyn CredentialStore>,
		directory: Arc<dyn UserDirectory>,
		config: ProviderConfig,
	) -> Self {
		Self { store, directory, config }
	}

	/// Configuration in effect.
	pub fn config(&self) -> &ProviderConfig {
		&self.config
	}

	/// Issues a request token stamped with the current UTC time.
	pub async fn issue_request_token(&self, consumer: &Consumer) -> Result<RequestToken> {
		self.issue_request_token_at(consumer, OffsetDateTime::now_utc()).await
	}

	/// Generates and persists a fresh request token for `consumer`.
	pub async fn issue_request_token_at(
		&self,
		consumer: &Consumer,
		now: OffsetDateTime,
	) -> Result<RequestToken> {
		ProviderSpan::lifecycle("issue_request_token")
			.instrument(self.insert_request_token(consumer, now))
			.await
	}

	/// Authenticates `email` against a request token with the submitted proof.
	///
	/// `email` and `proof` are used exactly as received. For `auto` consumers the verification
	/// code is issued in the same step.
	pub async fn bind_user(
		&self,
		consumer: &Consumer,
		token: &RequestToken,
		email: &str,
		proof: &str,
	) -> Result<BindOutcome> {
		ProviderSpan::lifecycle("bind_user")
			.instrument(self.authenticate(consumer, token, email, proof))
			.await
	}

	/// Issues a verification code for a request token with a bound user.
	///
	/// Returns `None` when no user is bound or the token is gone. A new code replaces any
	/// previous one.
	pub async fn issue_verification_code(&self, token: &RequestToken) -> Result<Option<Secret>> {
		let Some(user_id) = token.user_id else {
			return Ok(None);
		};

		ProviderSpan::lifecycle("issue_verification_code")
			.instrument(self.store_verification_code(token, user_id))
			.await
	}

	/// Exchanges a request token for an access token stamped with the current UTC time.
	pub async fn exchange_for_access_token(
		&self,
		token: &RequestToken,
		verifier: &str,
	) -> Result<ExchangeResult> {
		self.exchange_for_access_token_at(token, verifier, OffsetDateTime::now_utc()).await
	}

	/// Exchanges a request token whose stored verification code equals `verifier`.
	pub async fn exchange_for_access_token_at(
		&self,
		token: &RequestToken,
		verifier: &str,
		now: OffsetDateTime,
	) -> Result<ExchangeResult> {
		let Some(user_id) = token.user_id else {
			return Ok(ExchangeResult::VerifierInvalid);
		};

		ProviderSpan::lifecycle("exchange_for_access_token")
			.instrument(self.exchange(token, user_id, verifier, now))
			.await
	}

	/// Runs [`TokenLifecycle::expire_if_stale_at`] against the current UTC time.
	pub async fn expire_if_stale(&self, scope: TokenScope) -> Result<OAuthState> {
		self.expire_if_stale_at(scope, OffsetDateTime::now_utc()).await
	}

	/// Deletes the token when it outlived the timeout window; otherwise renews access tokens.
	///
	/// Returns `TOKEN_EXPIRED` after deleting a stale token, `TOKEN_REJECTED` when an access
	/// token vanished before it could be renewed, and `OK` otherwise.
	pub async fn expire_if_stale_at(
		&self,
		scope: TokenScope,
		now: OffsetDateTime,
	) -> Result<OAuthState> {
		let cutoff = now - self.config.timeout_delta();

		if self.store.expire_token(scope, cutoff).await? {
			obs::record_lifecycle_event(LifecycleEvent::Expired);

			return Ok(OAuthState::TokenExpired);
		}

		match scope {
			TokenScope::RequestToken(_) => Ok(OAuthState::Ok),
			TokenScope::AccessToken(id) =>
				if self.store.touch_access_token(id, now).await? {
					Ok(OAuthState::Ok)
				} else {
					Ok(OAuthState::TokenRejected)
				},
		}
	}

	/// Deletes a request token and its nonces. Returns `false` when it was already gone.
	pub async fn revoke_request_token(&self, token: &RequestToken) -> Result<bool> {
		let revoked = self.store.delete_request_token(token.id).await?;

		if revoked {
			obs::record_lifecycle_event(LifecycleEvent::Revoked);
		}

		Ok(revoked)
	}

	/// Deletes an access token and its nonces. Returns `false` when it was already gone.
	pub async fn revoke_access_token(&self, consumer_key: &str, token: &str) -> Result<bool> {
		let revoked = self.store.delete_access_token(consumer_key, token).await?;

		if revoked {
			obs::record_lifecycle_event(LifecycleEvent::Revoked);
		}

		Ok(revoked)
	}

	async fn insert_request_token(
		&self,
		consumer: &Consumer,
		now: OffsetDateTime,
	) -> Result<RequestToken> {
		let draft = NewRequestToken {
			consumer_key: consumer.key.clone(),
			token: random_token(self.config.request_token_bytes)?,
			secret: random_secret(self.config.token_secret_bytes)?,
			created_at: now,
		};
		let id = self.store.insert_request_token(draft.clone()).await?;

		obs::record_lifecycle_event(LifecycleEvent::RequestIssued);

		Ok(draft.into_row(id))
	}

	async fn authenticate(
		&self,
		consumer: &Consumer,
		token: &RequestToken,
		email: &str,
		proof: &str,
	) -> Result<BindOutcome> {
		let Some(user) = self.directory.find_by_email(email).await? else {
			return Ok(BindOutcome::Rejected);
		};
		let expected = identity::expected_proof(
			token.secret.expose(),
			consumer.secret.expose(),
			user.password_hash.expose(),
		);

		if !identity::proof_matches(&expected, proof) {
			return Ok(BindOutcome::Rejected);
		}
		if !self.store.bind_user(token.id, user.user_id).await? {
			return Ok(BindOutcome::Rejected);
		}

		obs::record_lifecycle_event(LifecycleEvent::UserBound);

		let mut bound = token.clone();

		bound.user_id = Some(user.user_id);

		let verification_code = match consumer.verification_mode {
			VerificationMode::Auto => {
				let code = self.store_verification_code(&bound, user.user_id).await?;

				bound.verifier = code.clone();

				code
			},
			VerificationMode::UserAuthorized => None,
		};

		Ok(BindOutcome::Bound { token: bound, verification_code })
	}

	async fn exchange(
		&self,
		token: &RequestToken,
		user_id: UserId,
		verifier: &str,
		now: OffsetDateTime,
	) -> Result<ExchangeResult> {
		let draft = NewAccessToken {
			consumer_key: token.consumer_key.clone(),
			token: random_token(self.config.access_token_bytes)?,
			secret: random_secret(self.config.token_secret_bytes)?,
			user_id,
			created_at: now,
		};

		match self.store.exchange_request_token(token.id, verifier, draft.clone()).await? {
			ExchangeOutcome::Exchanged(id) => {
				obs::record_lifecycle_event(LifecycleEvent::AccessIssued);

				Ok(ExchangeResult::Exchanged(draft.into_row(id)))
			},
			ExchangeOutcome::VerifierMismatch => Ok(ExchangeResult::VerifierInvalid),
			ExchangeOutcome::Missing => Ok(ExchangeResult::TokenRejected),
		}
	}

	async fn store_verification_code(
		&self,
		token: &RequestToken,
		user_id: UserId,
	) -> Result<Option<Secret>> {
		let code = random_secret(self.config.verifier_bytes)?;

		if !self.store.set_verification_code(token.id, user_id, code.clone()).await? {
			return Ok(None);
		}

		obs::record_lifecycle_event(LifecycleEvent::VerifierIssued);

		Ok(Some(code))
	}
}
impl Debug for TokenLifecycle {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenLifecycle").field("config", &self.config).finish_non_exhaustive()
	}
}

fn random_bytes(len: usize) -> Result<Vec<u8>> {
	let mut bytes = vec![0; len];

	OsRng.try_fill_bytes(&mut bytes).map_err(Error::entropy)?;

	Ok(bytes)
}

fn random_token(len: usize) -> Result<TokenValue> {
	let encoded = URL_SAFE_NO_PAD.encode(random_bytes(len)?);

	TokenValue::new(encoded).map_err(|e| Error::entropy(format!("generated token invalid: {e}")))
}

fn random_secret(len: usize) -> Result<Secret> {
	Ok(Secret::new(URL_SAFE_NO_PAD.encode(random_bytes(len)?)))
}
