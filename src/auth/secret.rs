//! Token secret wrapper that redacts sensitive material.

// std
use std::sync::OnceLock;
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use serde::{Deserializer, Serializer};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Redacted access token keeping sensitive material out of logs.
///
/// The [`fingerprint`](Self::fingerprint) is a base64 (no padding) SHA-256 digest of the
/// token. It identifies the token in rate-limit snapshots and log lines without exposing it,
/// and is cached after the first calculation.
#[derive(Default)]
pub struct TokenSecret {
	value: String,
	fingerprint_cache: OnceLock<String>,
}
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self { value: value.into(), fingerprint_cache: OnceLock::new() }
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.value
	}

	/// Stable, non-reversible identifier for this token.
	pub fn fingerprint(&self) -> &str {
		self.fingerprint_cache.get_or_init(|| {
			let digest = Sha256::digest(self.value.as_bytes());

			STANDARD_NO_PAD.encode(digest)
		})
	}
}
impl Clone for TokenSecret {
	fn clone(&self) -> Self {
		Self { value: self.value.clone(), fingerprint_cache: self.fingerprint_cache.clone() }
	}
}
impl PartialEq for TokenSecret {
	fn eq(&self, other: &Self) -> bool {
		self.value == other.value
	}
}
impl Eq for TokenSecret {}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
impl Serialize for TokenSecret {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.value)
	}
}
impl<'de> Deserialize<'de> for TokenSecret {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(Self::new)
	}
}
