//! Request tokens, access tokens, nonce records, and the secrets they carry.

pub mod access;
pub mod nonce;
pub mod request;
pub mod secret;

// self
use crate::_prelude::*;

/// Returns `true` once more than `timeout` has elapsed between `since` and `now`.
pub(crate) fn elapsed_beyond(since: OffsetDateTime, now: OffsetDateTime, timeout: Duration) -> bool {
	now - since > timeout
}
