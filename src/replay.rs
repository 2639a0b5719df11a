//! Replay guard: timestamp freshness and per-token nonce uniqueness.
//!
//! The timestamp window is enforced on every call. Nonces are only tracked once a token scope
//! is bound; consumer-only calls carry no scope to record them under. Recording uses the
//! store's insert-if-absent so concurrent duplicates resolve to exactly one winner.

// self
use crate::{
	_prelude::*,
	auth::{Consumer, NonceInsert, NonceRecord, TokenScope},
	session::OAuthState,
	store::CredentialStore,
};

/// Verdict of one replay check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayVerdict {
	/// Timestamp is fresh and the nonce (if scoped) was recorded.
	Fresh,
	/// Timestamp lies outside the window.
	StaleTimestamp {
		/// Whether the timestamp was ahead of the provider clock.
		in_future: bool,
	},
	/// The nonce was already recorded for this consumer and token scope.
	NonceReused,
}
impl ReplayVerdict {
	/// Protocol outcome corresponding to the verdict.
	pub const fn state(self) -> OAuthState {
		match self {
			Self::Fresh => OAuthState::Ok,
			Self::StaleTimestamp { .. } => OAuthState::BadTimestamp,
			Self::NonceReused => OAuthState::BadNonce,
		}
	}
}

/// Enforces replay defenses against a shared [`CredentialStore`].
#[derive(Clone)]
pub struct ReplayGuard {
	store: Arc<dyn CredentialStore>,
	window: Duration,
}
impl ReplayGuard {
	/// Creates a guard that accepts timestamps within `window` of the provider clock.
	pub fn new(store: Arc<dyn CredentialStore>, window: Duration) -> Self {
		Self { store, window }
	}

	/// Accepted clock skew.
	pub fn window(&self) -> Duration {
		self.window
	}

	/// Checks the timestamp window only.
	pub fn check_timestamp_at(&self, timestamp: i64, now: OffsetDateTime) -> ReplayVerdict {
		let now = now.unix_timestamp();

		if now.abs_diff(timestamp) > self.window.whole_seconds().unsigned_abs() {
			ReplayVerdict::StaleTimestamp { in_future: timestamp > now }
		} else {
			ReplayVerdict::Fresh
		}
	}

	/// Runs [`ReplayGuard::check_at`] against the current UTC time.
	pub async fn check(
		&self,
		consumer: &Consumer,
		scope: Option<TokenScope>,
		nonce: &str,
		timestamp: i64,
	) -> Result<ReplayVerdict> {
		self.check_at(consumer, scope, nonce, timestamp, OffsetDateTime::now_utc()).await
	}

	/// Checks the timestamp, then records the nonce under `scope` when one is bound.
	pub async fn check_at(
		&self,
		consumer: &Consumer,
		scope: Option<TokenScope>,
		nonce: &str,
		timestamp: i64,
		now: OffsetDateTime,
	) -> Result<ReplayVerdict> {
		let verdict = self.check_timestamp_at(timestamp, now);

		if verdict != ReplayVerdict::Fresh {
			return Ok(verdict);
		}

		let Some(scope) = scope else {
			return Ok(ReplayVerdict::Fresh);
		};
		let record = NonceRecord::new(consumer.id, scope, nonce);

		match self.store.insert_nonce(record).await? {
			NonceInsert::Recorded => Ok(ReplayVerdict::Fresh),
			NonceInsert::Replayed => Ok(ReplayVerdict::NonceReused),
		}
	}
}
impl Debug for ReplayGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ReplayGuard").field("window", &self.window).finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		auth::{ConsumerKey, TokenId, VerificationMode},
		store::MemoryStore,
	};

	const NOW: OffsetDateTime = macros::datetime!(2025-06-01 12:00 UTC);

	fn guard() -> (ReplayGuard, Consumer) {
		let store = MemoryStore::default();
		let consumer = store
			.register_consumer(
				ConsumerKey::new("c1").expect("Consumer key fixture should be valid."),
				"s1",
				VerificationMode::Auto,
			)
			.expect("Consumer registration should succeed.");

		(ReplayGuard::new(Arc::new(store), Duration::seconds(300)), consumer)
	}

	#[test]
	fn timestamps_outside_the_window_are_stale() {
		let (guard, _) = guard();
		let now = NOW.unix_timestamp();

		assert_eq!(guard.check_timestamp_at(now - 300, NOW), ReplayVerdict::Fresh);
		assert_eq!(
			guard.check_timestamp_at(now - 301, NOW),
			ReplayVerdict::StaleTimestamp { in_future: false }
		);
		assert_eq!(
			guard.check_timestamp_at(now + 301, NOW),
			ReplayVerdict::StaleTimestamp { in_future: true }
		);
	}

	#[tokio::test]
	async fn scoped_nonces_are_single_use() {
		let (guard, consumer) = guard();
		let scope = Some(TokenScope::AccessToken(TokenId(7)));
		let ts = NOW.unix_timestamp();
		let first = guard.check_at(&consumer, scope, "n1", ts, NOW).await;
		let second = guard.check_at(&consumer, scope, "n1", ts, NOW).await;
		let other_scope =
			guard.check_at(&consumer, Some(TokenScope::AccessToken(TokenId(8))), "n1", ts, NOW).await;

		assert_eq!(first.expect("First check should not fault."), ReplayVerdict::Fresh);
		assert_eq!(second.expect("Second check should not fault."), ReplayVerdict::NonceReused);
		assert_eq!(other_scope.expect("Other scope should not fault."), ReplayVerdict::Fresh);
	}

	#[tokio::test]
	async fn unscoped_calls_skip_nonce_tracking_but_not_timestamps() {
		let (guard, consumer) = guard();
		let ts = NOW.unix_timestamp();

		for _ in 0..2 {
			let verdict = guard
				.check_at(&consumer, None, "n1", ts, NOW)
				.await
				.expect("Unscoped check should not fault.");

			assert_eq!(verdict, ReplayVerdict::Fresh);
		}

		let stale = guard
			.check_at(&consumer, None, "n2", ts - 3_600, NOW)
			.await
			.expect("Stale check should not fault.");

		assert_eq!(stale.state(), OAuthState::BadTimestamp);
	}

	#[tokio::test]
	async fn stale_timestamps_do_not_consume_nonces() {
		let (guard, consumer) = guard();
		let scope = Some(TokenScope::RequestToken(TokenId(1)));
		let ts = NOW.unix_timestamp();
		let stale = guard
			.check_at(&consumer, scope, "n1", ts - 3_600, NOW)
			.await
			.expect("Stale check should not fault.");
		let fresh =
			guard.check_at(&consumer, scope, "n1", ts, NOW).await.expect("Fresh check should not fault.");

		assert_eq!(stale.state(), OAuthState::BadTimestamp);
		assert_eq!(fresh, ReplayVerdict::Fresh);
	}
}
