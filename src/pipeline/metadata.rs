//! Response metadata extraction (cache, quota, retry hints, scopes, pagination).

// crates.io
use http::{HeaderMap, header::RETRY_AFTER};
// self
use crate::{
	_prelude::*,
	auth::{Credential, ScopeSet},
	rate_limit::RateLimit,
	response::{CacheMetadata, Pagination, Response},
	transport::date,
};

const SCOPES_HEADER: &str = "x-oauth-scopes";

/// Copies every piece of header-derived metadata onto `response`.
///
/// `uri` is the final (post-redirect) URI, used to resolve relative `Link` targets.
pub fn apply<T>(
	response: &mut Response<T>,
	credential: &Credential,
	headers: &HeaderMap,
	uri: &Url,
	now: OffsetDateTime,
) {
	response.cache = CacheMetadata::from_headers(&credential.id, headers, now);
	response.rate_limit = RateLimit::from_headers(headers, credential.token.fingerprint());
	response.retry_after = retry_after(headers, now);
	response.scopes = scopes(headers);
	response.pagination = Pagination::from_headers(headers, uri);
}

/// Converts `Retry-After` (delta seconds or HTTP date) into an absolute instant.
pub fn retry_after(headers: &HeaderMap, now: OffsetDateTime) -> Option<OffsetDateTime> {
	let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(now + Duration::seconds(secs.into()));
	}

	date::parse_http_date(raw)
}

fn scopes(headers: &HeaderMap) -> ScopeSet {
	headers
		.get(SCOPES_HEADER)
		.and_then(|value| value.to_str().ok())
		.and_then(|raw| ScopeSet::from_header(raw).ok())
		.unwrap_or_default()
}
