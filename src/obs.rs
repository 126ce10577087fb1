//! Optional observability helpers for gateway calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `github_gateway.call` with the `kind`
//!   (operation) and `stage` (call site) fields, plus `request_id` on pipeline fetches
//!   (the value sent as `x-request-id`), and events for retries, redirects,
//!   timeouts, evictions, and pool reloads.
//! - Enable `metrics` to increment the `github_gateway_call_total` counter for every
//!   attempt/success/failure, labeled by `kind` + `outcome`, and the
//!   `github_gateway_eviction_total` counter labeled by `pool`.
//!
//! Credentials are only ever identified by id or token fingerprint.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Gateway operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// Single pipeline exchange (including its redirects and retries).
	Fetch,
	/// Pagination walk over a paged endpoint.
	Paginate,
	/// Pool execution including evict-and-retry rounds.
	PoolExecute,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::Fetch => "fetch",
			CallKind::Paginate => "paginate",
			CallKind::PoolExecute => "pool_execute",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to a gateway operation.
	Attempt,
	/// The operation produced a response (which may still be an API-level failure).
	Success,
	/// An error propagated back to the caller.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}

	/// Maps a result onto [`Success`](Self::Success) or [`Failure`](Self::Failure).
	pub fn of<T, E>(result: &std::result::Result<T, E>) -> Self {
		if result.is_ok() { Self::Success } else { Self::Failure }
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
