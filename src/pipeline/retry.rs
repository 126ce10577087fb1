//! Retry schedule for transient failures.

// crates.io
use http::StatusCode;
// self
use crate::{_prelude::*, config::GatewayConfig};

/// Attempt budget and linear backoff for one exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Total attempts, first try included.
	pub max_attempts: u32,
	/// Base delay; attempt `n` (zero-based) waits `n * delay`.
	pub delay: Duration,
}
impl RetryPolicy {
	/// Reads the policy from configuration.
	pub fn from_config(config: &GatewayConfig) -> Self {
		Self { max_attempts: config.max_attempts.max(1), delay: config.retry_delay }
	}

	/// Returns `true` when `attempt` (zero-based) is the final one.
	pub fn is_last(&self, attempt: u32) -> bool {
		attempt + 1 >= self.max_attempts
	}

	/// Delay to wait before `attempt` (zero-based); the first attempt never waits.
	pub fn delay_before(&self, attempt: u32) -> Duration {
		self.delay * attempt
	}

	/// Statuses retried on every attempt but the last.
	pub fn retries_status(status: StatusCode) -> bool {
		matches!(
			status,
			StatusCode::INTERNAL_SERVER_ERROR
				| StatusCode::BAD_GATEWAY
				| StatusCode::SERVICE_UNAVAILABLE
				| StatusCode::GATEWAY_TIMEOUT
		)
	}
}
