//! Optional observability helpers for validation passes and token lifecycle events.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth1_provider.validation` (with `mode`
//!   and `stage` fields) and `oauth1_provider.lifecycle` (with a `stage` field).
//! - Enable `metrics` to increment `oauth1_provider_validation_total`, labeled by `mode` +
//!   `state`, and `oauth1_provider_lifecycle_total`, labeled by `event`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Token lifecycle transitions observed by the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
	/// A request token was minted.
	RequestIssued,
	/// A user authenticated against a request token.
	UserBound,
	/// A verification code was issued.
	VerifierIssued,
	/// A request token was exchanged for an access token.
	AccessIssued,
	/// A stale token was deleted.
	Expired,
	/// A token was explicitly revoked.
	Revoked,
}
impl LifecycleEvent {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			LifecycleEvent::RequestIssued => "request_issued",
			LifecycleEvent::UserBound => "user_bound",
			LifecycleEvent::VerifierIssued => "verifier_issued",
			LifecycleEvent::AccessIssued => "access_issued",
			LifecycleEvent::Expired => "expired",
			LifecycleEvent::Revoked => "revoked",
		}
	}
}
impl Display for LifecycleEvent {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
