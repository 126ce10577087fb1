//! Quota policy contracts consulted before a credential dispatches a request.

// self
use crate::{_prelude::*, auth::CredentialId, rate_limit::RateLimit, request::Priority};

/// Boxed future returned by [`QuotaPolicy::evaluate`].
pub type QuotaFuture<'a> = Pin<Box<dyn Future<Output = Result<QuotaDecision>> + 'a + Send>>;

/// Strategy that inspects a credential's tracked quota before it calls upstream.
pub trait QuotaPolicy
where
	Self: Send + Sync,
{
	/// Evaluates whether the next call may proceed.
	fn evaluate(&self, context: &QuotaContext) -> QuotaFuture<'_>;
}

/// Context shared with a [`QuotaPolicy`] before an outbound call is made.
#[derive(Clone, Debug)]
pub struct QuotaContext {
	/// Credential about to execute the call.
	pub credential: CredentialId,
	/// Strictest snapshot tracked for the credential, if any response reported one.
	pub snapshot: Option<RateLimit>,
	/// Priority of the pending request.
	pub priority: Priority,
	/// Timestamp the client observed before invoking the policy.
	pub observed_at: OffsetDateTime,
}
impl QuotaContext {
	/// Creates a new context for the given credential, snapshot, and priority.
	pub fn new(credential: CredentialId, snapshot: Option<RateLimit>, priority: Priority) -> Self {
		Self { credential, snapshot, priority, observed_at: OffsetDateTime::now_utc() }
	}

	/// Overrides the timestamp associated with the observation.
	pub fn with_observed_at(mut self, instant: OffsetDateTime) -> Self {
		self.observed_at = instant;

		self
	}
}

/// Result emitted by a [`QuotaPolicy`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuotaDecision {
	/// The request may proceed immediately.
	Allow,
	/// The credential must not be used until the directive says so.
	Reject(RetryDirective),
}

/// Advises callers when to retry after a [`QuotaDecision::Reject`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryDirective {
	/// Instant when it is safe to retry.
	pub earliest_retry_at: OffsetDateTime,
	/// Suggested backoff duration.
	pub recommended_backoff: Duration,
	/// Optional descriptive string.
	pub reason: Option<String>,
}
impl RetryDirective {
	/// Creates a new directive with the provided timing metadata.
	pub fn new(earliest_retry_at: OffsetDateTime, recommended_backoff: Duration) -> Self {
		Self { earliest_retry_at, recommended_backoff, reason: None }
	}

	/// Adds a human-readable reason.
	pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
		self.reason = Some(reason.into());

		self
	}
}

/// Rejects calls once the tracked quota falls to a reserve until the window resets.
///
/// The reserve only binds background and sub-request work; interactive and public-pool
/// calls may spend the quota down to zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExhaustionPolicy {
	reserve: u32,
}
impl ExhaustionPolicy {
	/// Keeps `reserve` requests per window for interactive work.
	pub fn with_reserve(reserve: u32) -> Self {
		Self { reserve }
	}

	/// Synchronous core of [`QuotaPolicy::evaluate`].
	pub fn decide(&self, context: &QuotaContext) -> QuotaDecision {
		let Some(snapshot) = context.snapshot.as_ref() else {
			return QuotaDecision::Allow;
		};
		let floor = if context.priority >= Priority::Interactive { 0 } else { self.reserve };

		if snapshot.remaining > floor || snapshot.reset <= context.observed_at {
			return QuotaDecision::Allow;
		}

		QuotaDecision::Reject(
			RetryDirective::new(snapshot.reset, snapshot.reset - context.observed_at)
				.with_reason(format!("{} of {} requests left", snapshot.remaining, snapshot.limit)),
		)
	}
}
impl QuotaPolicy for ExhaustionPolicy {
	fn evaluate(&self, context: &QuotaContext) -> QuotaFuture<'_> {
		let decision = self.decide(context);

		Box::pin(async move { Ok(decision) })
	}
}
