// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	obs::LifecycleEvent,
	session::{OAuthState, ValidationMode},
};

/// Records a completed validation via the global metrics recorder (when enabled).
pub fn record_validation_outcome(mode: ValidationMode, state: OAuthState) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth1_provider_validation_total",
			"mode" => mode.as_str(),
			"state" => state.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (mode, state);
	}
}

/// Records a token lifecycle transition via the global metrics recorder (when enabled).
pub fn record_lifecycle_event(event: LifecycleEvent) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("oauth1_provider_lifecycle_total", "event" => event.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = event;
	}
}

/// Thread-safe counters for validation passes.
#[derive(Debug, Default)]
pub struct ValidationMetrics {
	attempts: AtomicU64,
	accepted: AtomicU64,
	rejected: AtomicU64,
}
impl ValidationMetrics {
	/// Returns the total number of validation passes started.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of passes that ended in `OK`.
	pub fn accepted(&self) -> u64 {
		self.accepted.load(Ordering::Relaxed)
	}

	/// Returns the number of passes that ended in any other protocol outcome.
	pub fn rejected(&self) -> u64 {
		self.rejected.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_outcome(&self, state: OAuthState) {
		if state.is_ok() {
			self.accepted.fetch_add(1, Ordering::Relaxed);
		} else {
			self.rejected.fetch_add(1, Ordering::Relaxed);
		}
	}
}
