//! Consumer registration contract consulted by the `register` validation mode.

// self
use crate::{_prelude::*, auth::Consumer, request::SignedRequest, store::StoreError};

/// Boxed future returned by [`RegistrationHook::register`].
pub type RegistrationFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RegistrationDecision, StoreError>> + 'a + Send>>;

/// Host-supplied policy that admits new consumers.
pub trait RegistrationHook
where
	Self: Send + Sync,
{
	/// Decides whether the request registers a consumer.
	fn register<'a>(&'a self, request: &'a SignedRequest) -> RegistrationFuture<'a>;
}
impl<F> RegistrationHook for F
where
	F: Fn(&SignedRequest) -> RegistrationDecision + Send + Sync,
{
	fn register<'a>(&'a self, request: &'a SignedRequest) -> RegistrationFuture<'a> {
		let decision = self(request);

		Box::pin(async move { Ok(decision) })
	}
}

/// Result emitted by a [`RegistrationHook`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationDecision {
	/// The consumer was registered (or already existed) and may proceed.
	Registered(Consumer),
	/// Registration was refused.
	Refused,
}
