//! Stored credential records.

// self
use crate::{
	_prelude::*,
	auth::{CredentialId, TokenSecret},
	rate_limit::RateLimit,
};

/// One externally issued token plus the bookkeeping the gateway persists alongside it.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
	/// Identity of the token owner.
	pub id: CredentialId,
	/// Access token; callers must avoid logging it.
	pub token: TokenSecret,
	/// Last rate-limit snapshot persisted for this token, if any.
	#[serde(default)]
	pub rate_limit: Option<RateLimit>,
	/// Revocation instant once the token is known to be permanently dead.
	#[serde(default)]
	pub revoked_at: Option<OffsetDateTime>,
}
impl Credential {
	/// Creates a live credential without a rate-limit history.
	pub fn new(id: CredentialId, token: impl Into<String>) -> Self {
		Self { id, token: TokenSecret::new(token), rate_limit: None, revoked_at: None }
	}

	/// Seeds the credential with a previously observed snapshot.
	pub fn with_rate_limit(mut self, snapshot: RateLimit) -> Self {
		self.rate_limit = Some(snapshot);

		self
	}

	/// Returns `true` once the token has been revoked.
	pub fn is_revoked(&self) -> bool {
		self.revoked_at.is_some()
	}

	/// Marks the token as revoked.
	pub fn revoke(&mut self, instant: OffsetDateTime) {
		self.revoked_at = Some(instant);
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("id", &self.id)
			.field("token", &self.token.fingerprint())
			.field("rate_limit", &self.rate_limit)
			.field("revoked_at", &self.revoked_at)
			.finish()
	}
}
