//! Rate-limit snapshots and the monotonic tracker each credential keeps.
//!
//! The pipeline only reports quota headers; it never enforces them. Enforcement happens in
//! the credential client through a [`QuotaPolicy`](crate::ext::QuotaPolicy), which reads the
//! snapshot tracked here.

// crates.io
use http::HeaderMap;
// self
use crate::_prelude::*;

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Last-known quota state for one token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
	/// Fingerprint of the token the quota belongs to.
	pub token: String,
	/// Requests allowed per window.
	pub limit: u32,
	/// Requests left in the current window.
	pub remaining: u32,
	/// Instant the window resets.
	pub reset: OffsetDateTime,
}
impl RateLimit {
	/// Extracts a snapshot from `X-RateLimit-*` headers.
	///
	/// Returns `None` unless all three headers are present and well formed; endpoints
	/// without quota accounting simply omit them.
	pub fn from_headers(headers: &HeaderMap, token_fingerprint: &str) -> Option<Self> {
		let read = |name: &str| headers.get(name)?.to_str().ok()?.trim().parse::<i64>().ok();
		let limit = u32::try_from(read(LIMIT_HEADER)?).ok()?;
		let remaining = u32::try_from(read(REMAINING_HEADER)?).ok()?;
		let reset = OffsetDateTime::from_unix_timestamp(read(RESET_HEADER)?).ok()?;

		Some(Self { token: token_fingerprint.to_owned(), limit, remaining, reset })
	}

	/// Returns `true` when `self` is at least as strict as `current` and should replace it:
	/// the window resets later, or fewer requests remain.
	pub fn supersedes(&self, current: &Self) -> bool {
		self.reset > current.reset || self.remaining < current.remaining
	}

	/// Returns `true` if no requests remain and the window has not reset yet.
	pub fn is_exhausted_at(&self, now: OffsetDateTime) -> bool {
		self.remaining == 0 && self.reset > now
	}
}

/// Holds the strictest rate-limit snapshot observed for one credential.
///
/// Concurrent responses can arrive out of order. A response that left earlier may carry a
/// more optimistic `remaining`, so [`observe`](Self::observe) only replaces the held
/// snapshot when the candidate [supersedes](RateLimit::supersedes) it.
#[derive(Debug, Default)]
pub struct RateLimitTracker(Mutex<Option<RateLimit>>);
impl RateLimitTracker {
	/// Creates a tracker seeded with a persisted snapshot.
	pub fn new(initial: Option<RateLimit>) -> Self {
		Self(Mutex::new(initial))
	}

	/// Offers a new snapshot; returns `true` if it replaced the held one.
	pub fn observe(&self, candidate: &RateLimit) -> bool {
		let mut current = self.0.lock();

		match current.as_ref() {
			Some(held) if !candidate.supersedes(held) => false,
			_ => {
				*current = Some(candidate.clone());

				true
			},
		}
	}

	/// Returns a copy of the held snapshot.
	pub fn current(&self) -> Option<RateLimit> {
		self.0.lock().clone()
	}
}
