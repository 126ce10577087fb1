//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialId, TokenSecret},
	rate_limit::RateLimit,
	store::{self, CredentialMap, CredentialStore, StoreFuture},
};

type StoreMap = Arc<RwLock<CredentialMap>>;

/// Thread-safe storage backend that keeps credentials in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of stored credentials, revoked ones included.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn save_now(map: StoreMap, credential: Credential) {
		map.write().insert(credential.id.clone(), credential);
	}

	fn load_now(map: StoreMap, id: CredentialId) -> Option<Credential> {
		map.read().get(&id).cloned()
	}
}
impl CredentialStore for MemoryStore {
	fn save_credential(&self, credential: Credential) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			Self::save_now(map, credential);

			Ok(())
		})
	}

	fn load_credential<'a>(&'a self, id: &'a CredentialId) -> StoreFuture<'a, Option<Credential>> {
		let map = self.0.clone();
		let id = id.to_owned();

		Box::pin(async move { Ok(Self::load_now(map, id)) })
	}

	fn persist_rate_limit<'a>(
		&'a self,
		token: &'a TokenSecret,
		snapshot: RateLimit,
	) -> StoreFuture<'a, bool> {
		let map = self.0.clone();

		Box::pin(async move { Ok(store::apply_rate_limit(&mut map.write(), token, snapshot)) })
	}

	fn revoke_token<'a>(
		&'a self,
		token: &'a TokenSecret,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, bool> {
		let map = self.0.clone();

		Box::pin(async move { Ok(store::apply_revocation(&mut map.write(), token, instant)) })
	}

	fn list_credentials(&self) -> StoreFuture<'_, Vec<CredentialId>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(store::live_ids(&map.read())) })
	}
}
