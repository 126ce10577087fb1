//! Pool over an explicit, caller-provided set of credentials.

// crates.io
use rand::seq::IteratorRandom;
// self
use crate::{
	_prelude::*,
	auth::CredentialId,
	client::{ClientDirectory, CredentialClient},
	pool::{CredentialPool, PoolFuture},
};

/// Fixed membership chosen at construction; evictions only ever shrink it.
///
/// Picks honor the caller's affinity while that credential is a member and otherwise choose a
/// member at random.
#[derive(Debug)]
pub struct BoundedPool {
	directory: Arc<ClientDirectory>,
	members: Mutex<HashSet<CredentialId>>,
}
impl BoundedPool {
	/// Creates a pool over `ids`; clients are activated on first pick.
	pub fn new<I>(directory: Arc<ClientDirectory>, ids: I) -> Self
	where
		I: IntoIterator<Item = CredentialId>,
	{
		Self { directory, members: Mutex::new(ids.into_iter().collect()) }
	}

	/// Returns `true` while `id` has not been evicted.
	pub fn contains(&self, id: &CredentialId) -> bool {
		self.members.lock().contains(id)
	}

	/// Current members in sorted order.
	pub fn members(&self) -> Vec<CredentialId> {
		let mut members = self.members.lock().iter().cloned().collect::<Vec<_>>();

		members.sort();

		members
	}

	fn choose(&self, affinity: Option<&CredentialId>) -> Option<CredentialId> {
		let members = self.members.lock();

		if let Some(id) = affinity.filter(|id| members.contains(*id)) {
			return Some(id.clone());
		}

		members.iter().choose(&mut rand::rng()).cloned()
	}
}
impl CredentialPool for BoundedPool {
	fn name(&self) -> &'static str {
		"bounded"
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
		self.members.lock().remove(id)
	}

	fn add(&self, id: CredentialId) -> bool {
		self.members.lock().insert(id)
	}

	fn len(&self) -> usize {
		self.members.lock().len()
	}
}
