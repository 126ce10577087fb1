// self
use crate::{_prelude::*, auth::CredentialId, obs::CallKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// A span builder used by gateway operations.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provided call kind + stage.
	pub fn new(kind: CallKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"github_gateway.call",
				kind = kind.as_str(),
				stage,
				request_id = tracing::field::Empty
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Tags the span with the correlation id sent upstream.
	pub fn record_request_id(&self, request_id: &str) {
		#[cfg(feature = "tracing")]
		self.span.record("request_id", request_id);
		#[cfg(not(feature = "tracing"))]
		let _ = request_id;
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> CallSpanGuard {
		#[cfg(feature = "tracing")]
		{
			CallSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			CallSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`CallSpan::entered`].
pub struct CallSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for CallSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("CallSpanGuard(..)")
	}
}

pub(crate) fn retry_scheduled(
	credential: &CredentialId,
	attempt: u32,
	delay: Duration,
	cause: &str,
) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		%credential,
		attempt,
		delay_ms = delay.whole_milliseconds() as u64,
		cause,
		"retrying upstream call"
	);
	#[cfg(not(feature = "tracing"))]
	let _ = (credential, attempt, delay, cause);
}

pub(crate) fn redirect_followed(status: u16, location: &Url, hops: usize) {
	#[cfg(feature = "tracing")]
	tracing::debug!(status, %location, hops, "following redirect");
	#[cfg(not(feature = "tracing"))]
	let _ = (status, location, hops);
}

pub(crate) fn call_timed_out(credential: &CredentialId, target: &Url, after: Duration) {
	#[cfg(feature = "tracing")]
	tracing::error!(
		%credential,
		%target,
		after_ms = after.whole_milliseconds() as u64,
		"upstream call timed out"
	);
	#[cfg(not(feature = "tracing"))]
	let _ = (credential, target, after);
}

pub(crate) fn unexpected_error_body(status: u16, content_type: Option<&str>, preview: &str) {
	#[cfg(feature = "tracing")]
	tracing::warn!(status, content_type, preview, "upstream error body is not structured JSON");
	#[cfg(not(feature = "tracing"))]
	let _ = (status, content_type, preview);
}

pub(crate) fn credential_evicted(pool: &'static str, credential: &CredentialId, reason: &str) {
	#[cfg(feature = "tracing")]
	tracing::info!(pool, %credential, reason, "evicting credential from pool");
	#[cfg(not(feature = "tracing"))]
	let _ = (pool, credential, reason);
}

pub(crate) fn public_pool_reloaded(members: usize) {
	#[cfg(feature = "tracing")]
	tracing::info!(members, "public pool membership reloaded");
	#[cfg(not(feature = "tracing"))]
	let _ = members;
}

pub(crate) fn public_pool_reload_failed(error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(%error, "public pool reload failed; keeping previous membership");
	#[cfg(not(feature = "tracing"))]
	let _ = error;
}

pub(crate) fn client_deactivated(credential: &CredentialId, persisted: bool) {
	#[cfg(feature = "tracing")]
	tracing::debug!(%credential, persisted, "credential client deactivated");
	#[cfg(not(feature = "tracing"))]
	let _ = (credential, persisted);
}

pub(crate) fn rate_limit_persist_failed(credential: &CredentialId, error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(%credential, %error, "failed to persist rate-limit snapshot");
	#[cfg(not(feature = "tracing"))]
	let _ = (credential, error);
}
