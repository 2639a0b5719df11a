//! Per-call validation state: protocol outcomes, validation modes, and the [`Session`] value
//! threaded through the pipeline.
//!
//! A [`Session`] is created for one inbound call, mutated only by the pipeline stages that
//! run for that call, and handed back to the caller once an outcome is reached.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Consumer, RequestToken, Secret, TokenScope, UserId},
	request::SignedRequest,
};

/// Boxed future returned by [`Resolver`] stages.
pub type StageFuture<'a> = Pin<Box<dyn Future<Output = Result<Stage>> + 'a + Send>>;

/// Protocol outcome of a validation pass.
///
/// Outcomes are data the caller maps onto a response; none of them is a fault.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OAuthState {
	/// Every check passed.
	#[default]
	Ok,
	/// The submitted signature did not verify.
	InvalidSignature,
	/// The nonce was already used within the token's scope.
	BadNonce,
	/// The timestamp falls outside the accepted window.
	BadTimestamp,
	/// No consumer is registered under the submitted key.
	ConsumerKeyUnknown,
	/// The consumer exists but may not make calls.
	ConsumerKeyRefused,
	/// The submitted token does not exist for this consumer.
	TokenRejected,
	/// The submitted token outlived the timeout window and has been deleted.
	TokenExpired,
	/// The verification code does not match the request token.
	VerifierInvalid,
}
impl OAuthState {
	/// Returns the stable outcome code.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Ok => "OK",
			Self::InvalidSignature => "INVALID_SIGNATURE",
			Self::BadNonce => "BAD_NONCE",
			Self::BadTimestamp => "BAD_TIMESTAMP",
			Self::ConsumerKeyUnknown => "CONSUMER_KEY_UNKNOWN",
			Self::ConsumerKeyRefused => "CONSUMER_KEY_REFUSED",
			Self::TokenRejected => "TOKEN_REJECTED",
			Self::TokenExpired => "TOKEN_EXPIRED",
			Self::VerifierInvalid => "VERIFIER_INVALID",
		}
	}

	/// Returns the `oauth_problem` token reported for a failed call.
	pub const fn problem(self) -> Option<&'static str> {
		match self {
			Self::Ok => None,
			Self::InvalidSignature => Some("signature_invalid"),
			Self::BadNonce => Some("nonce_used"),
			Self::BadTimestamp => Some("timestamp_refused"),
			Self::ConsumerKeyUnknown => Some("consumer_key_unknown"),
			Self::ConsumerKeyRefused => Some("consumer_key_refused"),
			Self::TokenRejected => Some("token_rejected"),
			Self::TokenExpired => Some("token_expired"),
			Self::VerifierInvalid => Some("verifier_invalid"),
		}
	}

	/// Whether this is [`OAuthState::Ok`].
	pub const fn is_ok(self) -> bool {
		matches!(self, Self::Ok)
	}
}
impl Display for OAuthState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Pipeline variant selected by the caller for one inbound call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ValidationMode {
	/// Consumer registration via the installed hook.
	Register,
	/// Consumer-initiated token teardown (logout).
	///
	/// Naming a token that does not exist (already revoked, exchanged, or expired) succeeds
	/// with `OK` without a signature check, so repeated logouts stay idempotent. An existing
	/// token is only revoked by a request signed with the consumer and token secrets.
	Invalidate,
	/// Obtain a request token.
	Request,
	/// Authenticate a user against a pending request token.
	Authorize,
	/// Exchange a verified request token for an access token.
	Access,
	/// Authenticated resource access.
	#[default]
	Use,
}
impl ValidationMode {
	/// Every mode, in declaration order.
	pub const ALL: [Self; 6] =
		[Self::Register, Self::Invalidate, Self::Request, Self::Authorize, Self::Access, Self::Use];

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Register => "register",
			Self::Invalidate => "invalidate",
			Self::Request => "request",
			Self::Authorize => "authorize",
			Self::Access => "access",
			Self::Use => "use",
		}
	}

	/// Which token kind this mode resolves, if any.
	pub const fn token_kind(self) -> Option<TokenKind> {
		match self {
			Self::Authorize | Self::Access => Some(TokenKind::Request),
			Self::Use => Some(TokenKind::Access),
			Self::Register | Self::Invalidate | Self::Request => None,
		}
	}
}
impl Display for ValidationMode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ValidationMode {
	type Err = UnknownValidationMode;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|mode| mode.as_str() == s)
			.ok_or_else(|| UnknownValidationMode { mode: s.to_owned() })
	}
}

/// Raised when a validation mode label is not recognized.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown validation mode `{mode}`.")]
pub struct UnknownValidationMode {
	/// Submitted label.
	pub mode: String,
}

/// Token kinds a validation mode can bind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
	/// Request token.
	Request,
	/// Access token.
	Access,
}

/// Token resolved for the current call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BoundToken {
	/// No token is involved (consumer-only call, or resolution failed).
	#[default]
	None,
	/// A request token.
	Request(RequestToken),
	/// An access token.
	Access(AccessToken),
}
impl BoundToken {
	/// Nonce scope of the bound token.
	pub fn scope(&self) -> Option<TokenScope> {
		match self {
			Self::None => None,
			Self::Request(row) => Some(TokenScope::RequestToken(row.id)),
			Self::Access(row) => Some(TokenScope::AccessToken(row.id)),
		}
	}

	/// Token value and secret of the bound token.
	pub fn pair(&self) -> Option<(&str, &Secret)> {
		match self {
			Self::None => None,
			Self::Request(row) => Some((row.token.as_ref(), &row.secret)),
			Self::Access(row) => Some((row.token.as_ref(), &row.secret)),
		}
	}
}

/// Ephemeral state of one validation pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
	mode: ValidationMode,
	consumer: Option<Consumer>,
	token: BoundToken,
	state: OAuthState,
	timestamp_in_future: bool,
	verification_code: Option<Secret>,
}
impl Session {
	/// Starts an empty session for the given mode.
	pub fn new(mode: ValidationMode) -> Self {
		Self {
			mode,
			consumer: None,
			token: BoundToken::None,
			state: OAuthState::Ok,
			timestamp_in_future: false,
			verification_code: None,
		}
	}

	/// Validation mode of this call.
	pub fn mode(&self) -> ValidationMode {
		self.mode
	}

	/// Current protocol outcome.
	pub fn state(&self) -> OAuthState {
		self.state
	}

	/// Resolved consumer, if resolution succeeded.
	pub fn consumer(&self) -> Option<&Consumer> {
		self.consumer.as_ref()
	}

	/// Resolved token.
	pub fn token(&self) -> &BoundToken {
		&self.token
	}

	/// Resolved request token, if one is bound.
	pub fn request_token(&self) -> Option<&RequestToken> {
		match &self.token {
			BoundToken::Request(row) => Some(row),
			_ => None,
		}
	}

	/// Resolved access token, if one is bound.
	pub fn access_token(&self) -> Option<&AccessToken> {
		match &self.token {
			BoundToken::Access(row) => Some(row),
			_ => None,
		}
	}

	/// Token value and secret handed back to the caller for response construction.
	pub fn token_pair(&self) -> Option<(&str, &Secret)> {
		self.token.pair()
	}

	/// User bound to the resolved token.
	pub fn user_id(&self) -> Option<UserId> {
		match &self.token {
			BoundToken::None => None,
			BoundToken::Request(row) => row.user_id,
			BoundToken::Access(row) => Some(row.user_id),
		}
	}

	/// Whether the rejected timestamp lay in the future. Informational only.
	pub fn timestamp_in_future(&self) -> bool {
		self.timestamp_in_future
	}

	/// Verification code issued during this call, if any.
	pub fn verification_code(&self) -> Option<&Secret> {
		self.verification_code.as_ref()
	}

	/// `OK`, a non-empty request token pair, and a bound user.
	pub fn request_verified(&self) -> bool {
		self.state.is_ok()
			&& self.request_token().is_some_and(|row| {
				!row.token.is_empty() && !row.secret.is_empty() && row.user_id.is_some()
			})
	}

	/// `OK`, a non-empty access token pair, and a positive user id.
	pub fn access_verified(&self) -> bool {
		self.state.is_ok()
			&& self
				.access_token()
				.is_some_and(|row| !row.token.is_empty() && !row.secret.is_empty())
	}

	/// Whether a token pair was handed out or resolved and the outcome is `OK`.
	pub fn has_credentials(&self) -> bool {
		self.state.is_ok()
			&& self.token_pair().is_some_and(|(token, secret)| !token.is_empty() && !secret.is_empty())
	}

	pub(crate) fn set_consumer(&mut self, consumer: Consumer) {
		self.consumer = Some(consumer);
	}

	pub(crate) fn bind(&mut self, token: BoundToken) {
		self.token = token;
	}

	pub(crate) fn clear_token(&mut self) {
		self.token = BoundToken::None;
	}

	pub(crate) fn set_verification_code(&mut self, code: Secret) {
		self.verification_code = Some(code);
	}

	pub(crate) fn mark_timestamp_in_future(&mut self, in_future: bool) {
		self.timestamp_in_future = in_future;
	}

	pub(crate) fn finish(&mut self, state: OAuthState) {
		self.state = state;
	}
}

/// Result of one pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
	/// Proceed to the next stage.
	Continue,
	/// Stop with the given outcome.
	Halt(OAuthState),
}

/// Lookup and replay stages the state machine drives in a fixed order.
///
/// [`Resolver::resolve_consumer`] always runs before [`Resolver::resolve_token`], and
/// [`Resolver::check_replay`] always runs before the signature check.
pub trait Resolver
where
	Self: Send + Sync,
{
	/// Resolves the consumer named by the request into the session.
	fn resolve_consumer<'a>(
		&'a self,
		session: &'a mut Session,
		request: &'a SignedRequest,
	) -> StageFuture<'a>;

	/// Resolves the token the session's mode requires, if any.
	fn resolve_token<'a>(
		&'a self,
		session: &'a mut Session,
		request: &'a SignedRequest,
		now: OffsetDateTime,
	) -> StageFuture<'a>;

	/// Applies timestamp freshness and nonce uniqueness for the session's token scope.
	fn check_replay<'a>(
		&'a self,
		session: &'a mut Session,
		request: &'a SignedRequest,
		now: OffsetDateTime,
	) -> StageFuture<'a>;
}

/// Runs the three resolver stages in order, stopping at the first halt.
///
/// Returns `true` when every stage passed; otherwise the session carries the halting outcome.
pub async fn drive<R>(
	resolver: &R,
	session: &mut Session,
	request: &SignedRequest,
	now: OffsetDateTime,
) -> Result<bool>
where
	R: ?Sized + Resolver,
{
	if let Stage::Halt(state) = resolver.resolve_consumer(session, request).await? {
		session.finish(state);

		return Ok(false);
	}
	if let Stage::Halt(state) = resolver.resolve_token(session, request, now).await? {
		session.clear_token();
		session.finish(state);

		return Ok(false);
	}
	if let Stage::Halt(state) = resolver.check_replay(session, request, now).await? {
		session.finish(state);

		return Ok(false);
	}

	Ok(true)
}
