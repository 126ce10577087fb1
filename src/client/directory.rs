//! Activation lifecycle for credential clients.

// std
use std::sync::Weak;
// crates.io
use tokio::task::JoinHandle;
// self
use crate::{
	_prelude::*,
	auth::CredentialId,
	client::CredentialClient,
	ext::QuotaPolicy,
	pipeline::Pipeline,
	store::CredentialStore,
};

/// Registry of active credential clients.
///
/// Clients are activated lazily on first use, reused while active, and retired once idle
/// for longer than [`client_idle_timeout`](crate::config::GatewayConfig::client_idle_timeout).
/// Concurrent activations of the same identity are single-flight: only one store load runs.
pub struct ClientDirectory {
	pipeline: Arc<Pipeline>,
	store: Arc<dyn CredentialStore>,
	policy: Arc<dyn QuotaPolicy>,
	clients: RwLock<HashMap<CredentialId, Arc<CredentialClient>>>,
	activation_guards: Mutex<HashMap<CredentialId, Arc<AsyncMutex<()>>>>,
}
impl ClientDirectory {
	/// Creates an empty directory.
	pub fn new(
		pipeline: Arc<Pipeline>,
		store: Arc<dyn CredentialStore>,
		policy: Arc<dyn QuotaPolicy>,
	) -> Self {
		Self {
			pipeline,
			store,
			policy,
			clients: Default::default(),
			activation_guards: Default::default(),
		}
	}

	/// Store the directory loads credentials from.
	pub fn store(&self) -> &Arc<dyn CredentialStore> {
		&self.store
	}

	/// Number of active clients.
	pub fn len(&self) -> usize {
		self.clients.read().len()
	}

	/// Returns `true` when no client is active.
	pub fn is_empty(&self) -> bool {
		self.clients.read().is_empty()
	}

	/// Returns the active client for `id` without activating one.
	pub fn get(&self, id: &CredentialId) -> Option<Arc<CredentialClient>> {
		self.clients.read().get(id).filter(|client| client.is_active()).cloned()
	}

	/// Returns the client for `id`, activating it from the store when needed.
	///
	/// Missing, revoked, or unloadable credentials fail with [`Error::ClientActivation`].
	pub async fn activate(&self, id: &CredentialId) -> Result<Arc<CredentialClient>> {
		if let Some(client) = self.get(id) {
			return Ok(client);
		}

		let lease = ActivationLease::acquire(self, id);
		let _lock = lease.guard().lock().await;

		// Another caller may have finished activating while this one waited.
		if let Some(client) = self.get(id) {
			return Ok(client);
		}

		let credential = self
			.store
			.load_credential(id)
			.await
			.map_err(|e| Error::activation(id, e.to_string()))?
			.ok_or_else(|| Error::activation(id, "credential not found"))?;

		if credential.is_revoked() {
			return Err(Error::activation(id, "credential was revoked"));
		}

		let client = Arc::new(CredentialClient::new(
			credential,
			self.pipeline.clone(),
			self.policy.clone(),
			self.store.clone(),
		));

		self.clients.write().insert(id.clone(), client.clone());

		Ok(client)
	}

	/// Retires clients idle since before `now - client_idle_timeout`.
	///
	/// Returns the number of retired clients. Snapshot persistence failures are logged and
	/// do not stop the sweep.
	pub async fn deactivate_idle(&self, now: OffsetDateTime) -> usize {
		let cutoff = now - self.pipeline.config().client_idle_timeout;

		self.retire(|client| client.last_used() <= cutoff).await
	}

	/// Retires every client (shutdown).
	pub async fn deactivate_all(&self) -> usize {
		self.retire(|_| true).await
	}

	/// Spawns a task that retires idle clients every `every` until the directory is dropped.
	pub fn spawn_idle_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
		let directory: Weak<Self> = Arc::downgrade(self);
		let period = every.unsigned_abs().max(std::time::Duration::from_millis(1));

		tokio::spawn(async move {
			let mut interval = tokio::time::interval(period);

			// The first tick completes immediately.
			interval.tick().await;

			loop {
				interval.tick().await;

				let Some(directory) = directory.upgrade() else {
					break;
				};

				directory.deactivate_idle(OffsetDateTime::now_utc()).await;
			}
		})
	}

	/// Retires the client for `id`, if active.
	pub async fn retire_one(&self, id: &CredentialId) -> bool {
		self.retire(|client| client.id() == id).await > 0
	}

	async fn retire<P>(&self, predicate: P) -> usize
	where
		P: Fn(&Arc<CredentialClient>) -> bool,
	{
		let retired = {
			let mut clients = self.clients.write();
			let ids = clients
				.iter()
				.filter(|&(_, client)| predicate(client))
				.map(|(id, _)| id.clone())
				.collect::<Vec<_>>();

			ids.into_iter().filter_map(|id| clients.remove(&id)).collect::<Vec<_>>()
		};

		for client in &retired {
			// Failures are already logged by the client.
			let _ = client.deactivate().await;
		}

		retired.len()
	}

	/// Number of identities with an activation in flight.
	pub fn pending_activations(&self) -> usize {
		self.activation_guards.lock().len()
	}
}
/// Shared handle on the per-identity activation guard.
///
/// The map entry is removed when the last lease for an identity is dropped, so the map only
/// holds identities with an activation in flight. Leases are only cloned and released while
/// the map lock is held, which keeps the reference count check exact.
struct ActivationLease<'a> {
	directory: &'a ClientDirectory,
	id: CredentialId,
	guard: Arc<AsyncMutex<()>>,
}
impl<'a> ActivationLease<'a> {
	fn acquire(directory: &'a ClientDirectory, id: &CredentialId) -> Self {
		let guard = directory
			.activation_guards
			.lock()
			.entry(id.clone())
			.or_insert_with(|| Arc::new(AsyncMutex::new(())))
			.clone();

		Self { directory, id: id.clone(), guard }
	}

	fn guard(&self) -> &AsyncMutex<()> {
		&self.guard
	}
}
impl Drop for ActivationLease<'_> {
	fn drop(&mut self) {
		let mut guards = self.directory.activation_guards.lock();

		// Release this lease's reference under the map lock, then check for other holders.
		drop(std::mem::take(&mut self.guard));

		if guards.get(&self.id).is_some_and(|guard| Arc::strong_count(guard) == 1) {
			guards.remove(&self.id);
		}
	}
}

impl Debug for ClientDirectory {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientDirectory").field("active", &self.len()).finish_non_exhaustive()
	}
}
