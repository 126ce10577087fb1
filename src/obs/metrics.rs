// self
use crate::obs::{CallKind, CallOutcome};

/// Records a call outcome via the global metrics recorder (when enabled).
pub fn record_call_outcome(kind: CallKind, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"github_gateway_call_total",
			"kind" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records one credential eviction from the named pool (when enabled).
pub fn record_eviction(pool: &'static str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("github_gateway_eviction_total", "pool" => pool).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = pool;
	}
}
