//! Redirect chains recorded while following `Location` headers.

// crates.io
use http::StatusCode;
// self
use crate::_prelude::*;

/// One followed redirect, linked to the hop before it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectLink {
	/// Redirect status (301, 302, 303, 307, 308).
	pub status: StatusCode,
	/// URI that answered with the redirect.
	pub original: Url,
	/// Target the request was re-issued against.
	pub resolved: Url,
	/// Previous hop, if this was not the first redirect.
	pub previous: Option<Arc<RedirectLink>>,
}
impl RedirectLink {
	/// Iterates the chain from the most recent hop back to the first.
	pub fn iter(&self) -> impl Iterator<Item = &RedirectLink> {
		std::iter::successors(Some(self), |link| link.previous.as_deref())
	}

	/// Number of hops in the chain ending at `self`.
	pub fn hops(&self) -> usize {
		self.iter().count()
	}

	/// URI the caller originally asked for.
	pub fn origin(&self) -> &Url {
		let mut first = self;

		while let Some(previous) = first.previous.as_deref() {
			first = previous;
		}

		&first.original
	}
}
