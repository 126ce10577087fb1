//! Typed result envelope for one logical request.

pub mod api_error;
pub mod cache;
pub mod pagination;
pub mod redirect;

pub use api_error::*;
pub use cache::*;
pub use pagination::*;
pub use redirect::*;

// crates.io
use http::StatusCode;
// self
use crate::{_prelude::*, auth::ScopeSet, rate_limit::RateLimit, request::Request};

/// Outcome of a request, successful or not.
///
/// API-level failures are data, not errors: check [`succeeded`](Self::succeeded) and
/// [`error`](Self::error). A paged fetch merges every walked page into the response of the
/// first one (see [`merge_page`](Self::merge_page)).
#[derive(Clone, Debug)]
pub struct Response<T> {
	/// Request this response answers.
	pub request: Request,
	/// Final HTTP status (after redirects and retries).
	pub status: StatusCode,
	/// Decoded payload, set only for successful, non-304 responses.
	pub payload: Option<T>,
	/// Structured error detail, when the upstream provided one.
	pub error: Option<ApiError>,
	/// Cache validators of the final response.
	pub cache: Option<CacheMetadata>,
	/// Validators of the first page alone, for callers caching at page-1 granularity.
	pub first_page_cache: Option<CacheMetadata>,
	/// Rate-limit snapshot reported with the final response.
	pub rate_limit: Option<RateLimit>,
	/// Redirects followed to reach the final response, newest first.
	pub redirect: Option<Arc<RedirectLink>>,
	/// Cursor to the next page.
	pub pagination: Option<Pagination>,
	/// OAuth scopes granted to the executing token.
	pub scopes: ScopeSet,
	/// Absolute instant before which the upstream asked not to retry.
	pub retry_after: Option<OffsetDateTime>,
	/// Pages merged into this response.
	pub page_count: u32,
}
impl<T> Response<T> {
	/// Creates an empty response for `request` with `status`.
	pub fn new(request: Request, status: StatusCode) -> Self {
		Self {
			request,
			status,
			payload: None,
			error: None,
			cache: None,
			first_page_cache: None,
			rate_limit: None,
			redirect: None,
			pagination: None,
			scopes: ScopeSet::default(),
			retry_after: None,
			page_count: 1,
		}
	}

	/// Returns `true` for statuses in `[200, 400)`.
	pub fn succeeded(&self) -> bool {
		(200..400).contains(&self.status.as_u16())
	}

	/// Returns `true` for `304 Not Modified`.
	pub fn is_not_modified(&self) -> bool {
		self.status == StatusCode::NOT_MODIFIED
	}

	/// Returns `true` when the upstream rejected the credential itself (401/403).
	pub fn is_credential_rejected(&self) -> bool {
		matches!(self.status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
	}

	/// Sets the payload, replacing any earlier value.
	pub fn set_payload(&mut self, payload: T) {
		self.payload = Some(payload);
	}

	/// Consumes the response and returns its payload.
	pub fn into_payload(self) -> Option<T> {
		self.payload
	}

	/// Converts the payload while keeping every piece of metadata.
	pub fn map_payload<U, F>(self, f: F) -> Response<U>
	where
		F: FnOnce(T) -> U,
	{
		Response {
			request: self.request,
			status: self.status,
			payload: self.payload.map(f),
			error: self.error,
			cache: self.cache,
			first_page_cache: self.first_page_cache,
			rate_limit: self.rate_limit,
			redirect: self.redirect,
			pagination: self.pagination,
			scopes: self.scopes,
			retry_after: self.retry_after,
			page_count: self.page_count,
		}
	}
}
impl<T> Response<Vec<T>> {
	/// Appends a subsequently fetched page.
	///
	/// Items are appended, the page count grows, and the cursor, cache metadata, and
	/// rate-limit snapshot are taken from the newer page.
	pub fn merge_page(&mut self, page: Response<Vec<T>>) {
		let items = page.payload.unwrap_or_default();

		match self.payload.as_mut() {
			Some(existing) => existing.extend(items),
			None => self.payload = Some(items),
		}

		self.page_count += 1;
		self.status = page.status;
		self.pagination = page.pagination;
		self.cache = page.cache;
		self.retry_after = page.retry_after;

		if page.rate_limit.is_some() {
			self.rate_limit = page.rate_limit;
		}
	}

	/// Replaces the result set with the contents of a page reached by skipping.
	pub fn replace_with_page(&mut self, page: Response<Vec<T>>) {
		self.payload = Some(page.payload.unwrap_or_default());
		self.status = page.status;
		self.pagination = page.pagination;
		self.cache = page.cache;

		if page.rate_limit.is_some() {
			self.rate_limit = page.rate_limit;
		}
	}

	/// Clears the result set and the cursor.
	pub fn clear_results(&mut self) {
		self.payload = Some(Vec::new());
		self.pagination = None;
	}
}
