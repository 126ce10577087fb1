//! Pagination cursors parsed from `Link` headers.
//!
//! GitHub's header looks like
//! `<https://api.github.com/repositories/1/issues?page=2>; rel="next", <...?page=9>; rel="last"`.
//! The parser is deliberately lenient: unquoted `rel` values, space-separated relation lists,
//! relative targets, and stray whitespace are all accepted.

// crates.io
use http::{HeaderMap, header::LINK};
// self
use crate::_prelude::*;

const PAGE_PARAM: &str = "page";

/// Where the next page lives, plus an optional shortcut to arbitrary pages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pagination {
	/// `rel="next"` target.
	pub next: Option<Url>,
	/// `rel="last"` target.
	pub last: Option<Url>,
	/// Present when the links number pages with a `page` query parameter.
	pub interpolation: Option<PageInterpolation>,
}
impl Pagination {
	/// Parses the `Link` header of a response; `None` when there is nothing to follow.
	pub fn from_headers(headers: &HeaderMap, base: &Url) -> Option<Self> {
		let raw = headers.get(LINK)?.to_str().ok()?;

		Self::parse(raw, base)
	}

	/// Parses a raw `Link` header value, resolving relative targets against `base`.
	pub fn parse(raw: &str, base: &Url) -> Option<Self> {
		let mut next = None;
		let mut last = None;

		for (rel, target) in parse_link_header(raw, base) {
			match rel.as_str() {
				"next" => next = Some(target),
				"last" => last = Some(target),
				_ => {},
			}
		}

		if next.is_none() && last.is_none() {
			return None;
		}

		let interpolation = last.as_ref().and_then(PageInterpolation::from_last);

		Some(Self { next, last, interpolation })
	}

	/// Returns `true` when another page follows.
	pub fn has_next(&self) -> bool {
		self.next.is_some()
	}
}

/// Lets the walker compute any page URI without visiting the pages in between.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageInterpolation {
	template: Url,
	/// Number of the last page (the total page count).
	pub last_page: u32,
}
impl PageInterpolation {
	fn from_last(last: &Url) -> Option<Self> {
		let last_page = last
			.query_pairs()
			.find(|(key, _)| key == PAGE_PARAM)
			.and_then(|(_, value)| value.parse::<u32>().ok())
			.filter(|page| *page >= 1)?;

		Some(Self { template: last.clone(), last_page })
	}

	/// URI of page `page` (1-based), or `None` past the last page.
	pub fn page_uri(&self, page: u32) -> Option<Url> {
		if page == 0 || page > self.last_page {
			return None;
		}

		let pairs = self
			.template
			.query_pairs()
			.map(|(key, value)| {
				if key == PAGE_PARAM {
					(key.into_owned(), page.to_string())
				} else {
					(key.into_owned(), value.into_owned())
				}
			})
			.collect::<Vec<_>>();
		let mut uri = self.template.clone();

		uri.query_pairs_mut().clear().extend_pairs(pairs);

		Some(uri)
	}
}

/// Splits a `Link` header into `(rel, target)` pairs.
pub fn parse_link_header(raw: &str, base: &Url) -> Vec<(String, Url)> {
	let mut links = Vec::new();
	let mut rest = raw;

	while let Some(open) = rest.find('<') {
		let after_open = &rest[open + 1..];
		let Some(close) = after_open.find('>') else {
			break;
		};
		let target = after_open[..close].trim();
		let tail = &after_open[close + 1..];
		let params_end = tail.find('<').unwrap_or(tail.len());
		let params = &tail[..params_end];

		rest = &tail[params_end..];

		let Ok(target) = base.join(target) else {
			continue;
		};

		for param in params.split([';', ',']) {
			let Some((name, value)) = param.split_once('=') else {
				continue;
			};

			if !name.trim().eq_ignore_ascii_case("rel") {
				continue;
			}

			for rel in value.trim().trim_matches('"').split_whitespace() {
				links.push((rel.to_ascii_lowercase(), target.clone()));
			}
		}
	}

	links
}
