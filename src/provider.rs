//! Validation orchestrator: resolves consumers and tokens, guards against replay, verifies
//! signatures, and drives the token lifecycle for each validation mode.
//!
//! Stage order is fixed for every token-bearing mode:
//!
//! 1. consumer resolution (`CONSUMER_KEY_UNKNOWN`, `CONSUMER_KEY_REFUSED`),
//! 2. token resolution (`TOKEN_REJECTED`, `TOKEN_EXPIRED` for stale request tokens),
//! 3. replay guard (`BAD_TIMESTAMP`, `BAD_NONCE`),
//! 4. signature verification (`INVALID_SIGNATURE`),
//! 5. the mode's lifecycle action.
//!
//! The first failing stage decides the outcome; later stages do not run.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Consumer, RequestToken, Secret, TokenScope},
	config::ProviderConfig,
	error::ConfigError,
	ext::{RegistrationDecision, RegistrationHook},
	identity::UserDirectory,
	lifecycle::{BindOutcome, ExchangeResult, TokenLifecycle},
	obs::{self, ProviderSpan, ValidationMetrics},
	replay::{ReplayGuard, ReplayVerdict},
	request::SignedRequest,
	session::{
		self, BoundToken, OAuthState, Resolver, Session, Stage, StageFuture, TokenKind,
		ValidationMode,
	},
	signature::{SignatureVerifier, SigningSecrets, StandardVerifier},
	store::CredentialStore,
};

/// Provider-side OAuth 1.0a validation engine.
#[derive(Clone)]
pub struct Provider {
	/// Credential store shared by every stage.
	pub store: Arc<dyn CredentialStore>,
	/// Signature verifier consulted after the replay guard.
	pub verifier: Arc<dyn SignatureVerifier>,
	/// Shared counters for validation outcomes.
	pub validation_metrics: Arc<ValidationMetrics>,
	lifecycle: TokenLifecycle,
	replay: ReplayGuard,
	registration: Option<Arc<dyn RegistrationHook>>,
	config: ProviderConfig,
}
impl Provider {
	/// Creates a provider that verifies signatures with [`StandardVerifier`].
	pub fn new(
		store: Arc<dyn CredentialStore>,
		directory: Arc<dyn UserDirectory>,
		config: ProviderConfig,
	) -> Result<Self> {
		config.validate()?;

		Ok(Self {
			verifier: Arc::new(StandardVerifier::default()),
			validation_metrics: Default::default(),
			lifecycle: TokenLifecycle::new(store.clone(), directory, config),
			replay: ReplayGuard::new(store.clone(), config.timeout_delta()),
			registration: None,
			store,
			config,
		})
	}

	/// Replaces the signature verifier.
	pub fn with_verifier<V>(mut self, verifier: V) -> Self
	where
		V: 'static + SignatureVerifier,
	{
		self.verifier = Arc::new(verifier);

		self
	}

	/// Installs the hook consulted by [`ValidationMode::Register`].
	pub fn with_registration_hook<H>(mut self, hook: H) -> Self
	where
		H: 'static + RegistrationHook,
	{
		self.registration = Some(Arc::new(hook));

		self
	}

	/// Configuration in effect.
	pub fn config(&self) -> &ProviderConfig {
		&self.config
	}

	/// Token lifecycle manager backing this provider.
	pub fn lifecycle(&self) -> &TokenLifecycle {
		&self.lifecycle
	}

	/// Validates `request` under `mode` against the current UTC time.
	pub async fn validate(&self, mode: ValidationMode, request: &SignedRequest) -> Result<Session> {
		self.validate_at(mode, request, OffsetDateTime::now_utc()).await
	}

	/// Validates `request` under `mode` at the provided instant.
	///
	/// Protocol outcomes are reported through [`Session::state`]; `Err` means a fault such as
	/// an unreachable store or a failed random source.
	pub async fn validate_at(
		&self,
		mode: ValidationMode,
		request: &SignedRequest,
		now: OffsetDateTime,
	) -> Result<Session> {
		let span = ProviderSpan::validation(mode, "validate");

		self.validation_metrics.record_attempt();

		let result = span.instrument(self.run(mode, request, now)).await;

		if let Ok(session) = &result {
			self.validation_metrics.record_outcome(session.state());
			obs::record_validation_outcome(mode, session.state());
		}

		result
	}

	/// Authenticates a user against the request token of a validated `authorize` session.
	///
	/// Returns `true` when the user was bound. Sessions validated under any other mode are
	/// refused with `false`. For `auto` consumers the verification code is
	/// issued in the same step and exposed through [`Session::verification_code`].
	pub async fn authenticate_user(
		&self,
		session: &mut Session,
		email: &str,
		proof: &str,
	) -> Result<bool> {
		if session.mode() != ValidationMode::Authorize || !session.state().is_ok() {
			return Ok(false);
		}

		let (Some(consumer), Some(token)) = (session.consumer(), session.request_token()) else {
			return Ok(false);
		};

		match self.lifecycle.bind_user(consumer, token, email, proof).await? {
			BindOutcome::Bound { token, verification_code } => {
				session.bind(BoundToken::Request(token));

				if let Some(code) = verification_code {
					session.set_verification_code(code);
				}

				Ok(true)
			},
			BindOutcome::Rejected => Ok(false),
		}
	}

	/// Issues a verification code for the session's request token once a user is bound.
	///
	/// Only `authorize` sessions qualify; any other mode yields `None`.
	pub async fn issue_verification_code(&self, session: &mut Session) -> Result<Option<Secret>> {
		if session.mode() != ValidationMode::Authorize || !session.state().is_ok() {
			return Ok(None);
		}

		let Some(token) = session.request_token() else {
			return Ok(None);
		};
		let Some(code) = self.lifecycle.issue_verification_code(token).await? else {
			return Ok(None);
		};
		let mut token = token.clone();

		token.verifier = Some(code.clone());

		session.bind(BoundToken::Request(token));
		session.set_verification_code(code.clone());

		Ok(Some(code))
	}

	async fn run(
		&self,
		mode: ValidationMode,
		request: &SignedRequest,
		now: OffsetDateTime,
	) -> Result<Session> {
		let mut session = Session::new(mode);

		match mode {
			ValidationMode::Register => return self.register(session, request).await,
			ValidationMode::Invalidate => return self.invalidate(session, request).await,
			ValidationMode::Request
			| ValidationMode::Authorize
			| ValidationMode::Access
			| ValidationMode::Use => {},
		}

		if !session::drive(self, &mut session, request, now).await? {
			return Ok(session);
		}
		if !self.signature_matches(&session, request) {
			session.finish(OAuthState::InvalidSignature);

			return Ok(session);
		}

		match mode {
			ValidationMode::Request => {
				let Some(consumer) = session.consumer() else {
					return Ok(session);
				};
				let token = self.lifecycle.issue_request_token_at(consumer, now).await?;

				session.bind(BoundToken::Request(token));
			},
			ValidationMode::Access => self.exchange(&mut session, request, now).await?,
			ValidationMode::Use => self.renew(&mut session, now).await?,
			ValidationMode::Authorize | ValidationMode::Register | ValidationMode::Invalidate => {},
		}

		Ok(session)
	}

	fn signature_matches(&self, session: &Session, request: &SignedRequest) -> bool {
		let Some(consumer) = session.consumer() else {
			return false;
		};
		let secrets = match session.token_pair() {
			Some((_, secret)) => SigningSecrets::with_token(consumer.secret.expose(), secret.expose()),
			None => SigningSecrets::consumer_only(consumer.secret.expose()),
		};

		self.verifier.verify(request, &secrets)
	}

	async fn exchange(
		&self,
		session: &mut Session,
		request: &SignedRequest,
		now: OffsetDateTime,
	) -> Result<()> {
		let (Some(token), Some(verifier)) = (session.request_token(), request.oauth.verifier.as_deref())
		else {
			session.finish(OAuthState::VerifierInvalid);

			return Ok(());
		};

		match self.lifecycle.exchange_for_access_token_at(token, verifier, now).await? {
			ExchangeResult::Exchanged(access) => session.bind(BoundToken::Access(access)),
			ExchangeResult::VerifierInvalid => session.finish(OAuthState::VerifierInvalid),
			ExchangeResult::TokenRejected => {
				session.clear_token();
				session.finish(OAuthState::TokenRejected);
			},
		}

		Ok(())
	}

	async fn renew(&self, session: &mut Session, now: OffsetDateTime) -> Result<()> {
		let Some(token) = session.access_token() else {
			return Ok(());
		};
		let state = self.lifecycle.expire_if_stale_at(TokenScope::AccessToken(token.id), now).await?;

		if state.is_ok() {
			let mut token = token.clone();

			token.last_used_at = token.last_used_at.max(now);

			session.bind(BoundToken::Access(token));
		} else {
			session.clear_token();
			session.finish(state);
		}

		Ok(())
	}

	async fn register(&self, mut session: Session, request: &SignedRequest) -> Result<Session> {
		let Some(hook) = &self.registration else {
			return Err(ConfigError::MissingRegistrationHook.into());
		};

		match hook.register(request).await? {
			RegistrationDecision::Registered(consumer) => session.set_consumer(consumer),
			RegistrationDecision::Refused => session.finish(OAuthState::ConsumerKeyRefused),
		}

		Ok(session)
	}

	/// Revokes the named token. A token that no longer exists is a successful no-op; an
	/// existing token is only revoked by a request signed with its secret.
	async fn invalidate(&self, mut session: Session, request: &SignedRequest) -> Result<Session> {
		let consumer_key = request.oauth.consumer_key.as_str();
		let Some(consumer) = self.store.find_consumer(consumer_key).await? else {
			session.finish(OAuthState::ConsumerKeyUnknown);

			return Ok(session);
		};

		session.set_consumer(consumer);

		let Some(token) = request.oauth.token.as_deref() else {
			session.finish(OAuthState::TokenRejected);

			return Ok(session);
		};
		let bound = match self.store.find_access_token(consumer_key, token).await? {
			Some(access) => BoundToken::Access(access),
			None => match self.store.find_request_token(consumer_key, token).await? {
				Some(pending) => BoundToken::Request(pending),
				None => return Ok(session),
			},
		};

		session.bind(bound);

		if !self.signature_matches(&session, request) {
			session.finish(OAuthState::InvalidSignature);

			return Ok(session);
		}

		match session.token() {
			BoundToken::Access(access) => {
				self.lifecycle.revoke_access_token(consumer_key, access.token.as_ref()).await?;
			},
			BoundToken::Request(pending) => {
				self.lifecycle.revoke_request_token(pending).await?;
			},
			BoundToken::None => {},
		}

		session.clear_token();

		Ok(session)
	}

	async fn resolve_request_token(
		&self,
		consumer: &Consumer,
		token: &str,
		now: OffsetDateTime,
	) -> Result<Result<RequestToken, OAuthState>> {
		let Some(row) = self.store.find_request_token(consumer.key.as_ref(), token).await? else {
			return Ok(Err(OAuthState::TokenRejected));
		};
		let state =
			self.lifecycle.expire_if_stale_at(TokenScope::RequestToken(row.id), now).await?;

		if state.is_ok() { Ok(Ok(row)) } else { Ok(Err(state)) }
	}

	async fn resolve_access_token(
		&self,
		consumer: &Consumer,
		token: &str,
	) -> Result<Result<AccessToken, OAuthState>> {
		Ok(self
			.store
			.find_access_token(consumer.key.as_ref(), token)
			.await?
			.ok_or(OAuthState::TokenRejected))
	}
}
impl Resolver for Provider {
	fn resolve_consumer<'a>(
		&'a self,
		session: &'a mut Session,
		request: &'a SignedRequest,
	) -> StageFuture<'a> {
		Box::pin(async move {
			let Some(consumer) = self.store.find_consumer(&request.oauth.consumer_key).await? else {
				return Ok(Stage::Halt(OAuthState::ConsumerKeyUnknown));
			};
			let suspended = consumer.suspended;

			session.set_consumer(consumer);

			if suspended {
				return Ok(Stage::Halt(OAuthState::ConsumerKeyRefused));
			}

			Ok(Stage::Continue)
		})
	}

	fn resolve_token<'a>(
		&'a self,
		session: &'a mut Session,
		request: &'a SignedRequest,
		now: OffsetDateTime,
	) -> StageFuture<'a> {
		Box::pin(async move {
			let Some(kind) = session.mode().token_kind() else {
				return Ok(Stage::Continue);
			};
			let (Some(consumer), Some(token)) = (session.consumer(), request.oauth.token.as_deref())
			else {
				return Ok(Stage::Halt(OAuthState::TokenRejected));
			};
			let bound = match kind {
				TokenKind::Request =>
					self.resolve_request_token(consumer, token, now).await?.map(BoundToken::Request),
				TokenKind::Access =>
					self.resolve_access_token(consumer, token).await?.map(BoundToken::Access),
			};

			match bound {
				Ok(bound) => {
					session.bind(bound);

					Ok(Stage::Continue)
				},
				Err(state) => Ok(Stage::Halt(state)),
			}
		})
	}

	fn check_replay<'a>(
		&'a self,
		session: &'a mut Session,
		request: &'a SignedRequest,
		now: OffsetDateTime,
	) -> StageFuture<'a> {
		Box::pin(async move {
			let Some(consumer) = session.consumer() else {
				return Ok(Stage::Halt(OAuthState::ConsumerKeyUnknown));
			};
			let verdict = self
				.replay
				.check_at(
					consumer,
					session.token().scope(),
					&request.oauth.nonce,
					request.oauth.timestamp,
					now,
				)
				.await?;

			match verdict {
				ReplayVerdict::Fresh => Ok(Stage::Continue),
				ReplayVerdict::StaleTimestamp { in_future } => {
					session.mark_timestamp_in_future(in_future);

					Ok(Stage::Halt(verdict.state()))
				},
				ReplayVerdict::NonceReused => Ok(Stage::Halt(verdict.state())),
			}
		})
	}
}
impl Debug for Provider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Provider")
			.field("config", &self.config)
			.field("registration_hook", &self.registration.is_some())
			.finish_non_exhaustive()
	}
}
