//! Load-spreading pool over every live credential in the store.
//!
//! Membership is published as one immutable [`Roster`] snapshot holding both the rotation
//! slots and the live set. Picks read a snapshot and never block on writers; eviction, adds,
//! and reloads replace the snapshot wholesale. The rotation cursor is always reduced modulo
//! the length of the snapshot it indexes, so a reload racing a pick can never index out of
//! bounds: the pick simply finishes against the roster it started with.
//!
//! Until the first load completes the roster is empty but not authoritative, so callers
//! wait for that load instead of failing with [`Error::PoolEmpty`].

// std
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
// self
use crate::{
	_prelude::*,
	auth::CredentialId,
	client::{ClientDirectory, CredentialClient},
	obs,
	pool::{CredentialPool, PoolFuture},
};

/// Immutable membership snapshot.
#[derive(Clone, Debug, Default)]
struct Roster {
	// Evicted entries leave a `None` hole until the next reload compacts them.
	slots: Vec<Option<CredentialId>>,
	live: HashSet<CredentialId>,
}
impl Roster {
	fn from_ids(ids: Vec<CredentialId>) -> Self {
		let live = ids.iter().cloned().collect();

		Self { slots: ids.into_iter().map(Some).collect(), live }
	}

	fn without(&self, id: &CredentialId) -> Self {
		let slots = self
			.slots
			.iter()
			.map(|slot| slot.as_ref().filter(|member| *member != id).cloned())
			.collect();
		let mut live = self.live.clone();

		live.remove(id);

		Self { slots, live }
	}

	fn with(&self, id: CredentialId) -> Self {
		let mut next = self.clone();

		next.live.insert(id.clone());
		next.slots.push(Some(id));

		next
	}
}

/// Round-robin pool over all live credentials, reloaded from the store every
/// [`public_reload_every`](crate::config::GatewayConfig::public_reload_every) calls.
#[derive(Debug)]
pub struct PublicPool {
	directory: Arc<ClientDirectory>,
	roster: RwLock<Arc<Roster>>,
	loaded: AtomicBool,
	cursor: AtomicUsize,
	calls: AtomicU64,
	reload_every: u64,
	reload_guard: AsyncMutex<()>,
}
impl PublicPool {
	/// Creates an empty pool; the first [`execute`](crate::pool::execute) loads the roster.
	pub fn new(directory: Arc<ClientDirectory>, reload_every: u64) -> Self {
		Self {
			directory,
			roster: Default::default(),
			loaded: AtomicBool::new(false),
			cursor: AtomicUsize::new(0),
			calls: AtomicU64::new(0),
			reload_every: reload_every.max(1),
			reload_guard: AsyncMutex::new(()),
		}
	}

	/// Replaces the roster with every live credential from the store.
	///
	/// Reclaims slots left by evictions and picks up new credentials. Returns the new
	/// member count. When a reload is already running, returns the current count instead of
	/// starting another one.
	pub async fn reload(&self) -> Result<usize> {
		if !self.is_loaded() {
			self.ensure_loaded().await?;

			return Ok(self.len());
		}

		let Some(_guard) = self.reload_guard.try_lock() else {
			return Ok(self.len());
		};

		self.load().await
	}

	/// Returns `true` once a roster has been loaded from the store.
	pub fn is_loaded(&self) -> bool {
		self.loaded.load(Ordering::Acquire)
	}

	async fn ensure_loaded(&self) -> Result<()> {
		if self.is_loaded() {
			return Ok(());
		}

		let _guard = self.reload_guard.lock().await;

		// The load this caller waited on may already have filled the roster.
		if self.is_loaded() {
			return Ok(());
		}

		self.load().await.map(drop)
	}

	async fn load(&self) -> Result<usize> {
		let ids = self.directory.store().list_credentials().await?;
		let members = ids.len();

		*self.roster.write() = Arc::new(Roster::from_ids(ids));
		self.loaded.store(true, Ordering::Release);

		obs::public_pool_reloaded(members);

		Ok(members)
	}

	/// Returns `true` while `id` is a live member.
	pub fn contains(&self, id: &CredentialId) -> bool {
		self.snapshot().live.contains(id)
	}

	fn snapshot(&self) -> Arc<Roster> {
		self.roster.read().clone()
	}

	fn choose(&self, affinity: Option<&CredentialId>) -> Option<CredentialId> {
		let roster = self.snapshot();

		if let Some(id) = affinity.filter(|id| roster.live.contains(*id)) {
			return Some(id.clone());
		}
		if roster.live.is_empty() {
			return None;
		}

		let len = roster.slots.len();
		let start = self.cursor.fetch_add(1, Ordering::Relaxed) % len;

		// Holes are skipped rather than treated as an empty pool.
		(0..len).find_map(|offset| roster.slots[(start + offset) % len].clone())
	}

	fn update<F>(&self, change: F) -> bool
	where
		F: FnOnce(&Roster) -> Option<Roster>,
	{
		let mut roster = self.roster.write();

		match change(&**roster) {
			Some(next) => {
				*roster = Arc::new(next);

				true
			},
			None => false,
		}
	}
}
impl CredentialPool for PublicPool {
	fn name(&self) -> &'static str {
		"public"
	}

	fn prepare(&self) -> PoolFuture<'_, ()> {
		Box::pin(async move {
			let due = self.calls.fetch_add(1, Ordering::Relaxed) % self.reload_every == 0;

			if !self.is_loaded() {
				return self.ensure_loaded().await;
			}
			if due {
				// A failed periodic reload keeps serving the previous roster.
				if let Err(e) = self.reload().await {
					obs::public_pool_reload_failed(&e);
				}
			}

			Ok(())
		})
	}

	fn pick<'a>(
		&'a self,
		affinity: Option<&'a CredentialId>,
	) -> PoolFuture<'a, Option<Arc<CredentialClient>>> {
		Box::pin(async move {
			let Some(id) = self.choose(affinity) else {
				return Ok(None);
			};

			self.directory.activate(&id).await.map(Some)
		})
	}

	fn evict(&self, id: &CredentialId) -> bool {
		self.update(|roster| roster.live.contains(id).then(|| roster.without(id)))
	}

	fn add(&self, id: CredentialId) -> bool {
		self.update(|roster| (!roster.live.contains(&id)).then(|| roster.with(id)))
	}

	fn len(&self) -> usize {
		self.snapshot().live.len()
	}
}
