//! Storage contracts and built-in store implementations for gateway credentials.
//!
//! The store is an external collaborator: the gateway loads credentials from it on
//! activation, writes rate-limit snapshots back when a client goes idle, and lists live
//! identities when the public pool reloads. Pool eviction never touches the store;
//! permanent revocation is a separate, explicit call.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialId, TokenSecret},
	rate_limit::RateLimit,
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by credential stores.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Persists or replaces a credential (onboarding, token rotation).
	fn save_credential(&self, credential: Credential) -> StoreFuture<'_, ()>;

	/// Fetches the credential for `id`, if present.
	fn load_credential<'a>(&'a self, id: &'a CredentialId) -> StoreFuture<'a, Option<Credential>>;

	/// Stores `snapshot` against the credential currently holding `token`.
	///
	/// Returns `false` without writing when no live credential holds the token any more
	/// (it was rotated or revoked while the client was active).
	fn persist_rate_limit<'a>(
		&'a self,
		token: &'a TokenSecret,
		snapshot: RateLimit,
	) -> StoreFuture<'a, bool>;

	/// Marks the credential holding `token` as revoked at `instant`.
	///
	/// Returns `false` when no live credential holds the token.
	fn revoke_token<'a>(
		&'a self,
		token: &'a TokenSecret,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, bool>;

	/// Lists every live (non-revoked) credential identity, ordered by id.
	fn list_credentials(&self) -> StoreFuture<'_, Vec<CredentialId>>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures (e.g., serde) surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

type CredentialMap = HashMap<CredentialId, Credential>;

// Shared mutation helpers so every backend applies the same rules.
fn apply_rate_limit(map: &mut CredentialMap, token: &TokenSecret, snapshot: RateLimit) -> bool {
	let live = map
		.values_mut()
		.find(|credential| !credential.is_revoked() && &credential.token == token);

	match live {
		Some(credential) => {
			credential.rate_limit = Some(snapshot);

			true
		},
		None => false,
	}
}

fn apply_revocation(map: &mut CredentialMap, token: &TokenSecret, instant: OffsetDateTime) -> bool {
	let live = map
		.values_mut()
		.find(|credential| !credential.is_revoked() && &credential.token == token);

	match live {
		Some(credential) => {
			credential.revoke(instant);

			true
		},
		None => false,
	}
}

fn live_ids(map: &CredentialMap) -> Vec<CredentialId> {
	let mut ids = map
		.values()
		.filter(|credential| !credential.is_revoked())
		.map(|credential| credential.id.clone())
		.collect::<Vec<_>>();

	ids.sort();

	ids
}
