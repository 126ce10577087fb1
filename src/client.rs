//! Credential clients: one token bound to the shared pipeline.
//!
//! A client couples a stored credential with its own rate-limit tracker and a bounded
//! concurrency gate. The upstream API penalizes bursty concurrent use of one identity, so
//! at most [`client_concurrency`](crate::config::GatewayConfig::client_concurrency) calls
//! run at once; the rest queue in arrival order. Clients are created and retired by the
//! [`ClientDirectory`].

pub mod directory;

pub use directory::ClientDirectory;

// std
use std::sync::atomic::{AtomicBool, Ordering};
// crates.io
use async_lock::Semaphore;
// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialId},
	ext::{QuotaContext, QuotaDecision, QuotaPolicy},
	obs,
	pipeline::{PayloadFormat, Pipeline},
	rate_limit::{RateLimit, RateLimitTracker},
	request::Request,
	response::Response,
	store::CredentialStore,
};

/// One active credential.
pub struct CredentialClient {
	credential: Credential,
	pipeline: Arc<Pipeline>,
	gate: Semaphore,
	tracker: RateLimitTracker,
	policy: Arc<dyn QuotaPolicy>,
	store: Arc<dyn CredentialStore>,
	active: AtomicBool,
	last_used: Mutex<OffsetDateTime>,
}
impl CredentialClient {
	/// Activates a client for `credential`, seeding its tracker with the persisted snapshot.
	pub fn new(
		credential: Credential,
		pipeline: Arc<Pipeline>,
		policy: Arc<dyn QuotaPolicy>,
		store: Arc<dyn CredentialStore>,
	) -> Self {
		let gate = Semaphore::new(pipeline.config().client_concurrency);
		let tracker = RateLimitTracker::new(credential.rate_limit.clone());

		Self {
			credential,
			pipeline,
			gate,
			tracker,
			policy,
			store,
			active: AtomicBool::new(true),
			last_used: Mutex::new(OffsetDateTime::now_utc()),
		}
	}

	/// Identity of the credential owner.
	pub fn id(&self) -> &CredentialId {
		&self.credential.id
	}

	/// Credential this client executes with.
	pub fn credential(&self) -> &Credential {
		&self.credential
	}

	/// Pipeline shared with every other client of the gateway.
	pub fn pipeline(&self) -> &Pipeline {
		&self.pipeline
	}

	/// Strictest rate-limit snapshot observed so far.
	pub fn rate_limit(&self) -> Option<RateLimit> {
		self.tracker.current()
	}

	/// Returns `false` once the client has been deactivated.
	pub fn is_active(&self) -> bool {
		self.active.load(Ordering::Acquire)
	}

	/// Instant the client last started a call.
	pub fn last_used(&self) -> OffsetDateTime {
		*self.last_used.lock()
	}

	/// Executes `request` through the pipeline, decoding the payload as `F`.
	///
	/// The quota policy is consulted first; a rejection surfaces as
	/// [`Error::RateLimited`]. The call then waits for a concurrency slot, which is released
	/// on every exit path, cancellation included.
	pub async fn fetch<F>(&self, request: &Request) -> Result<Response<F::Output>>
	where
		F: PayloadFormat,
	{
		self.ensure_active()?;

		let context =
			QuotaContext::new(self.id().clone(), self.tracker.current(), request.priority);

		if let QuotaDecision::Reject(directive) = self.policy.evaluate(&context).await? {
			return Err(Error::RateLimited {
				credential: self.id().clone(),
				reset_at: directive.earliest_retry_at,
			});
		}

		let _permit = self.gate.acquire().await;

		// Deactivation may have happened while this call was queued.
		self.ensure_active()?;
		*self.last_used.lock() = OffsetDateTime::now_utc();

		let response = self.pipeline.fetch::<F>(&self.credential, request).await?;

		if let Some(snapshot) = response.rate_limit.as_ref() {
			self.tracker.observe(snapshot);
		}

		Ok(response)
	}

	/// Retires the client and persists its rate-limit snapshot.
	///
	/// Returns `Ok(true)` when a snapshot was written. Calling it again is a no-op.
	pub async fn deactivate(&self) -> Result<bool> {
		if !self.active.swap(false, Ordering::AcqRel) {
			return Ok(false);
		}

		let persisted = match self.tracker.current() {
			Some(snapshot) => self
				.store
				.persist_rate_limit(&self.credential.token, snapshot)
				.await
				.inspect_err(|e| obs::rate_limit_persist_failed(self.id(), e))?,
			None => false,
		};

		obs::client_deactivated(self.id(), persisted);

		Ok(persisted)
	}

	fn ensure_active(&self) -> Result<()> {
		if self.is_active() {
			Ok(())
		} else {
			Err(Error::ClientRetired { credential: self.id().clone() })
		}
	}
}
impl Debug for CredentialClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialClient")
			.field("credential", &self.credential)
			.field("active", &self.is_active())
			.field("rate_limit", &self.tracker.current())
			.finish_non_exhaustive()
	}
}
