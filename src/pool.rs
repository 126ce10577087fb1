//! Credential pools: pick a client per call, evict failing credentials, try again.
//!
//! Both pool variants share [`execute`]. A response with status 401/403, an
//! [`Error::RateLimited`], or an [`Error::ClientActivation`] evicts the credential that
//! produced it and re-runs the action on another member. An [`Error::ClientRetired`] only
//! means the picked client went idle underneath the call, so the action is re-run without
//! evicting and the directory activates a fresh client. Any other outcome, including
//! ordinary API failures, is returned to the caller. Eviction is local to the pool instance
//! and never touches the store.

pub mod bounded;
pub mod public;

pub use bounded::BoundedPool;
pub use public::PublicPool;

// self
use crate::{
	_prelude::*,
	auth::CredentialId,
	client::CredentialClient,
	obs::{self, CallKind, CallOutcome, CallSpan},
	response::Response,
};

/// Boxed future returned by [`CredentialPool`] operations.
pub type PoolFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Selection and eviction policy over a set of credential clients.
pub trait CredentialPool
where
	Self: Send + Sync,
{
	/// Stable label used in logs and metrics.
	fn name(&self) -> &'static str;

	/// Runs once per [`execute`] before the first pick.
	fn prepare(&self) -> PoolFuture<'_, ()> {
		Box::pin(async { Ok(()) })
	}

	/// Picks a client, preferring `affinity` while it is still a member.
	///
	/// `Ok(None)` means the pool has no members left. Activation failures surface as
	/// [`Error::ClientActivation`] naming the credential to evict.
	fn pick<'a>(
		&'a self,
		affinity: Option<&'a CredentialId>,
	) -> PoolFuture<'a, Option<Arc<CredentialClient>>>;

	/// Removes `id` from the pool; returns `false` if it was not a member.
	fn evict(&self, id: &CredentialId) -> bool;

	/// Adds `id` to the pool; returns `false` if it already was a member.
	fn add(&self, id: CredentialId) -> bool;

	/// Current number of members.
	fn len(&self) -> usize;

	/// Returns `true` when the pool has no members.
	fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Runs `action` on a pooled client, evicting and retrying on credential failures.
///
/// Fails with [`Error::PoolEmpty`] once no member remains.
pub async fn execute<P, T, A, Fut>(
	pool: &P,
	affinity: Option<&CredentialId>,
	action: A,
) -> Result<Response<T>>
where
	P: ?Sized + CredentialPool,
	A: Fn(Arc<CredentialClient>) -> Fut,
	Fut: Future<Output = Result<Response<T>>>,
{
	let span = CallSpan::new(CallKind::PoolExecute, pool.name());

	obs::record_call_outcome(CallKind::PoolExecute, CallOutcome::Attempt);

	let result = span.instrument(run(pool, affinity, action)).await;

	obs::record_call_outcome(CallKind::PoolExecute, CallOutcome::of(&result));

	result
}

async fn run<P, T, A, Fut>(
	pool: &P,
	affinity: Option<&CredentialId>,
	action: A,
) -> Result<Response<T>>
where
	P: ?Sized + CredentialPool,
	A: Fn(Arc<CredentialClient>) -> Fut,
	Fut: Future<Output = Result<Response<T>>>,
{
	pool.prepare().await?;

	loop {
		let client = match pool.pick(affinity).await {
			Ok(Some(client)) => client,
			Ok(None) => return Err(Error::PoolEmpty),
			Err(Error::ClientActivation { credential, reason }) => {
				evict(pool, &credential, &reason);

				continue;
			},
			Err(e) => return Err(e),
		};
		let id = client.id().clone();

		match action(client).await {
			Ok(response) if response.is_credential_rejected() =>
				evict(pool, &id, &format!("HTTP {}", response.status.as_u16())),
			Ok(response) => return Ok(response),
			Err(Error::ClientRetired { .. }) => continue,
			Err(e @ (Error::RateLimited { .. } | Error::ClientActivation { .. })) =>
				evict(pool, &id, &e.to_string()),
			Err(e) => return Err(e),
		}
	}
}

fn evict<P>(pool: &P, id: &CredentialId, reason: &str)
where
	P: ?Sized + CredentialPool,
{
	if pool.evict(id) {
		obs::credential_evicted(pool.name(), id, reason);
		obs::record_eviction(pool.name());
	}
}
