//! Pagination walker: turns one paged endpoint into a deduplicated result set.
//!
//! Pages are fetched strictly in order, because each cursor is only known once the
//! previous page has arrived. Page 1 is always fetched, even when skipping, so its cache
//! validators can be handed back to the caller.

// std
use std::num::NonZeroU32;
// crates.io
use http::Method;
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	client::CredentialClient,
	obs::{self, CallKind, CallOutcome, CallSpan},
	pipeline::Json,
	request::{Request, RequestError},
	response::Response,
};

const PER_PAGE: &str = "per_page";

/// How much of a paged resource to enumerate.
///
/// The default walks every page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageLimits {
	/// Pages to walk before stopping normally.
	pub soft: Option<NonZeroU32>,
	/// Leading pages to skip.
	pub skip: u32,
	/// Page count beyond which the walk is abandoned and reported as an empty result.
	pub hard: Option<NonZeroU32>,
}
impl PageLimits {
	/// Stops after `pages` pages.
	pub fn with_soft_limit(mut self, pages: NonZeroU32) -> Self {
		self.soft = Some(pages);

		self
	}

	/// Skips the first `pages` pages; the result starts on page `pages + 1`.
	pub fn with_skip(mut self, pages: u32) -> Self {
		self.skip = pages;

		self
	}

	/// Gives up on resources with more than `pages` pages.
	pub fn with_hard_limit(mut self, pages: NonZeroU32) -> Self {
		self.hard = Some(pages);

		self
	}

	/// Returns `true` when the caller accepts an incomplete result.
	pub fn is_bounded(&self) -> bool {
		self.soft.is_some() || self.hard.is_some()
	}
}

type Paged<T> = Json<Vec<T>>;

impl CredentialClient {
	/// Fetches a paged GET endpoint and merges its pages into one response.
	///
	/// - `per_page` is forced to the configured maximum unless the request sets it.
	/// - A failed or `304` first page is returned as-is.
	/// - With `skip`, the result starts on page `skip + 1`: one `next` hop for `skip == 1`, a
	///   direct jump when the `Link` header numbers its pages, otherwise a walk along `next`
	///   links. Skipping past the last page yields an empty result without a cursor.
	/// - With a hard limit, a resource reporting more pages yields an empty result that keeps
	///   page 1's cache validators, so repeat calls can short-circuit on `304`.
	/// - A page failing mid-walk yields the partial result without cache validators when a
	///   limit was given; an unbounded walk returns the failure instead.
	/// - Items are deduplicated by `key`, keeping the first occurrence.
	///
	/// [`first_page_cache`](Response::first_page_cache) always carries page 1's validators.
	pub async fn fetch_paged<T, K, KF>(
		&self,
		request: Request,
		key: KF,
		limits: PageLimits,
	) -> Result<Response<Vec<T>>>
	where
		T: 'static + Send + DeserializeOwned,
		K: Eq + Hash,
		KF: Send + Fn(&T) -> K,
	{
		let span = CallSpan::new(CallKind::Paginate, "client.fetch_paged");

		obs::record_call_outcome(CallKind::Paginate, CallOutcome::Attempt);

		let result = span.instrument(self.walk(request, key, limits)).await;

		obs::record_call_outcome(CallKind::Paginate, CallOutcome::of(&result));

		result
	}

	async fn walk<T, K, KF>(
		&self,
		request: Request,
		key: KF,
		limits: PageLimits,
	) -> Result<Response<Vec<T>>>
	where
		T: 'static + Send + DeserializeOwned,
		K: Eq + Hash,
		KF: Send + Fn(&T) -> K,
	{
		if request.method != Method::GET {
			return Err(RequestError::PagedNonGet { method: request.method.to_string() }.into());
		}

		let request = if request.query_value(PER_PAGE).is_some() {
			request
		} else {
			let size = self.pipeline().config().max_page_size;

			request.with_query(PER_PAGE, size)
		};
		let follow_up =
			request.clone().without_cache().with_priority(request.priority.for_sub_request());
		let mut result = self.fetch::<Paged<T>>(&request).await?;

		result.first_page_cache = result.cache.clone();

		if !result.succeeded() || result.is_not_modified() {
			return Ok(result);
		}

		let total_pages = result
			.pagination
			.as_ref()
			.and_then(|pagination| pagination.interpolation.as_ref())
			.map(|interpolation| interpolation.last_page);

		if limits.skip > 0 {
			let jump = result
				.pagination
				.as_ref()
				.and_then(|pagination| pagination.interpolation.as_ref())
				.filter(|_| limits.skip > 1)
				.map(|interpolation| interpolation.page_uri(limits.skip.saturating_add(1)));

			match jump {
				Some(Some(uri)) => {
					let page = self.fetch::<Paged<T>>(&follow_up.with_uri(&uri)).await?;

					if !page.succeeded() {
						return Ok(page);
					}

					result.replace_with_page(page);
				},
				Some(None) => {
					result.clear_results();

					return Ok(result);
				},
				None =>
					for _ in 0..limits.skip {
						let Some(next) = next_uri(&result) else {
							result.clear_results();

							return Ok(result);
						};
						let page = self.fetch::<Paged<T>>(&follow_up.with_uri(&next)).await?;

						if !page.succeeded() {
							return Ok(page);
						}

						result.replace_with_page(page);
					},
			}
		}

		if matches!((limits.hard, total_pages), (Some(hard), Some(total)) if total > hard.get()) {
			abandon(&mut result);

			return Ok(result);
		}

		let soft = limits.soft.map_or(u32::MAX, NonZeroU32::get);
		let hard = limits.hard.map_or(u32::MAX, NonZeroU32::get);
		let mut pages = 1;

		while let Some(next) = next_uri(&result) {
			if pages >= soft {
				break;
			}
			// Only reachable when the cursor could not report the page count up front.
			if pages >= hard {
				abandon(&mut result);

				return Ok(result);
			}

			match self.fetch::<Paged<T>>(&follow_up.with_uri(&next)).await {
				Ok(page) if page.succeeded() => {
					result.merge_page(page);

					pages += 1;
				},
				Ok(page) if !limits.is_bounded() => return Ok(page),
				Err(e) if !limits.is_bounded() => return Err(e),
				_ => {
					// Known incomplete; must not be cached.
					result.cache = None;

					break;
				},
			}
		}

		if let Some(items) = result.payload.take() {
			let mut seen = HashSet::new();

			let unique = items.into_iter().filter(|item| seen.insert(key(item))).collect();

			result.payload = Some(unique);
		}

		Ok(result)
	}
}

fn abandon<T>(result: &mut Response<Vec<T>>) {
	result.clear_results();
	result.cache = result.first_page_cache.clone();
}

fn next_uri<T>(response: &Response<T>) -> Option<Url> {
	response.pagination.as_ref()?.next.clone()
}
