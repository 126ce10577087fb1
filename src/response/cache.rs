//! Cache validators and expiry computation.

// crates.io
use http::{
	HeaderMap,
	header::{CACHE_CONTROL, DATE, ETAG, EXPIRES, LAST_MODIFIED},
};
// self
use crate::{_prelude::*, auth::CredentialId, transport::date};

const POLL_INTERVAL_HEADER: &str = "x-poll-interval";

/// Validators and freshness data captured from a response.
///
/// The upstream API scopes cached representations to the token that fetched them, so the
/// validators remember which credential they belong to. The pipeline only sends them back
/// (as `If-None-Match` / `If-Modified-Since`) when the same credential executes the request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
	/// Credential whose response produced these validators.
	pub owner: CredentialId,
	/// Entity tag.
	pub etag: Option<String>,
	/// `Last-Modified` instant.
	pub last_modified: Option<OffsetDateTime>,
	/// Effective expiry: the earlier of the HTTP expiry and the poll interval.
	pub expires: Option<OffsetDateTime>,
	/// Minimum polling interval requested by the upstream API.
	pub poll_interval: Option<Duration>,
}
impl CacheMetadata {
	/// Captures validators from response headers; `None` when the response has none.
	pub fn from_headers(
		owner: &CredentialId,
		headers: &HeaderMap,
		now: OffsetDateTime,
	) -> Option<Self> {
		let etag = header_str(headers, ETAG.as_str()).map(str::to_owned);
		let last_modified =
			header_str(headers, LAST_MODIFIED.as_str()).and_then(date::parse_http_date);
		let poll_interval = header_str(headers, POLL_INTERVAL_HEADER)
			.and_then(|raw| raw.parse::<i64>().ok())
			.filter(|secs| *secs > 0)
			.map(Duration::seconds);
		let expires = effective_expiry(headers, poll_interval, now);

		if etag.is_none() && last_modified.is_none() && expires.is_none() {
			return None;
		}

		Some(Self { owner: owner.clone(), etag, last_modified, expires, poll_interval })
	}

	/// Returns `true` when the validators may be sent on behalf of `credential`.
	pub fn is_owned_by(&self, credential: &CredentialId) -> bool {
		&self.owner == credential
	}

	/// Returns `true` while the cached representation is still fresh.
	pub fn is_fresh_at(&self, now: OffsetDateTime) -> bool {
		self.expires.is_some_and(|expires| expires > now)
	}

	/// Returns `true` if there is anything to validate against.
	pub fn has_validators(&self) -> bool {
		self.etag.is_some() || self.last_modified.is_some()
	}
}

/// Computes `min(http_expiry, date + poll_interval)`.
///
/// The HTTP expiry prefers `Cache-Control` (`max-age`, `s-maxage`; the smaller wins) over
/// `Expires`. Both are anchored on the response `Date`, or on `now` when it is missing.
pub fn effective_expiry(
	headers: &HeaderMap,
	poll_interval: Option<Duration>,
	now: OffsetDateTime,
) -> Option<OffsetDateTime> {
	let anchor = header_str(headers, DATE.as_str()).and_then(date::parse_http_date).unwrap_or(now);
	let http_expiry = header_str(headers, CACHE_CONTROL.as_str())
		.and_then(max_age)
		.map(|age| anchor.checked_add(age))
		.unwrap_or_else(|| header_str(headers, EXPIRES.as_str()).and_then(date::parse_http_date));
	// Offsets beyond the representable range carry no usable expiry.
	let poll_expiry = poll_interval.and_then(|interval| anchor.checked_add(interval));

	match (http_expiry, poll_expiry) {
		(Some(http), Some(poll)) => Some(http.min(poll)),
		(http, poll) => http.or(poll),
	}
}

fn max_age(cache_control: &str) -> Option<Duration> {
	cache_control
		.split(',')
		.filter_map(|directive| {
			let (name, value) = directive.trim().split_once('=')?;

			match name.trim().to_ascii_lowercase().as_str() {
				"max-age" | "s-maxage" => value.trim().trim_matches('"').parse::<i64>().ok(),
				_ => None,
			}
		})
		.min()
		.map(Duration::seconds)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
	headers.get(name)?.to_str().ok().map(str::trim).filter(|value| !value.is_empty())
}
