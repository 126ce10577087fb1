//! Immutable description of one logical upstream call.

// crates.io
use http::Method;
// self
use crate::{_prelude::*, response::CacheMetadata};

/// Errors raised for requests that can never be executed as written.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum RequestError {
	/// The path embeds a query string; query parameters must be set separately.
	#[error("Request path `{path}` must not contain a query string.")]
	PathContainsQuery {
		/// Offending path.
		path: String,
	},
	/// Conditional validators were attached to a method other than GET.
	#[error("Cache validators can only be sent with GET, not {method}.")]
	ConditionalNonGet {
		/// Method of the rejected request.
		method: String,
	},
	/// Paged fetches walk `Link` headers and only make sense for GET.
	#[error("Paged fetches require GET, not {method}.")]
	PagedNonGet {
		/// Method of the rejected request.
		method: String,
	},
	/// The request target could not be resolved into an absolute URI.
	#[error("Request target `{target}` is not a valid URI: {source}.")]
	InvalidUri {
		/// Path or URI that failed to resolve.
		target: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The caller deadline leaves no time for the call.
	#[error("Request timeout must be positive, got {timeout}.")]
	NonPositiveTimeout {
		/// Rejected timeout.
		timeout: String,
	},
	/// The request body could not be serialized.
	#[error("Request body could not be serialized: {message}.")]
	Body {
		/// Serializer message.
		message: String,
	},
}

/// Scheduling hint carried by a request.
///
/// The pipeline does not enforce priorities; callers and pools use them to decide what to
/// run first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
	/// Bulk refresh work nobody is waiting on.
	#[default]
	Background,
	/// Follow-up fetch issued on behalf of another request (pagination, expansion).
	SubRequest,
	/// A user is waiting on the result.
	Interactive,
	/// Load-spreading work routed through the public pool.
	PublicPool,
}
impl Priority {
	/// Priority inherited by follow-up pages: background work is upgraded, the rest kept.
	pub const fn for_sub_request(self) -> Self {
		match self {
			Self::Background => Self::SubRequest,
			other => other,
		}
	}
}

/// One logical upstream call.
///
/// The path never carries a query string; parameters live in a key-ordered map so the
/// materialized URI is deterministic. Builder methods consume the request, so a value that
/// has been handed to the pipeline cannot change underneath it.
#[derive(Clone, Debug)]
pub struct Request {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the API base, or an absolute URI without a query string.
	pub path: String,
	/// Query parameters ordered by key.
	pub query: BTreeMap<String, String>,
	/// `Accept` override for endpoints with preview or raw media types.
	pub accept: Option<String>,
	/// Request body (JSON for REST writes and GraphQL).
	pub body: Option<Vec<u8>>,
	/// Cache validators from a previous response for the same resource.
	pub cache: Option<CacheMetadata>,
	/// Scheduling hint.
	pub priority: Priority,
	/// Caller deadline overriding the configured call timeout.
	pub timeout: Option<Duration>,
	/// Instant the request was created.
	pub created_at: OffsetDateTime,
}
impl Request {
	/// Creates a request for `method` against `path`.
	pub fn new(method: Method, path: impl Into<String>) -> Result<Self, RequestError> {
		let path = path.into();

		if path.contains('?') {
			return Err(RequestError::PathContainsQuery { path });
		}

		Ok(Self {
			method,
			path,
			query: BTreeMap::new(),
			accept: None,
			body: None,
			cache: None,
			priority: Priority::default(),
			timeout: None,
			created_at: OffsetDateTime::now_utc(),
		})
	}

	/// Shorthand for a GET request.
	pub fn get(path: impl Into<String>) -> Result<Self, RequestError> {
		Self::new(Method::GET, path)
	}

	/// Creates a request carrying a JSON body.
	pub fn json<B>(method: Method, path: impl Into<String>, body: &B) -> Result<Self, RequestError>
	where
		B: ?Sized + Serialize,
	{
		let bytes = serde_json::to_vec(body)
			.map_err(|e| RequestError::Body { message: e.to_string() })?;
		let mut request = Self::new(method, path)?;

		request.body = Some(bytes);

		Ok(request)
	}

	/// Creates a GraphQL `{query, variables}` POST against `path`.
	pub fn graphql(
		path: impl Into<String>,
		query: &str,
		variables: Option<serde_json::Value>,
	) -> Result<Self, RequestError> {
		let mut body = serde_json::Map::new();

		body.insert("query".into(), query.into());

		if let Some(variables) = variables {
			body.insert("variables".into(), variables);
		}

		Self::json(Method::POST, path, &body)
	}

	/// Sets (or replaces) a query parameter.
	pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.query.insert(key.into(), value.to_string());

		self
	}

	/// Overrides the `Accept` header.
	pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
		self.accept = Some(accept.into());

		self
	}

	/// Attaches cache validators from a previous response.
	pub fn with_cache(mut self, cache: CacheMetadata) -> Self {
		self.cache = Some(cache);

		self
	}

	/// Drops any cache validators.
	pub fn without_cache(mut self) -> Self {
		self.cache = None;

		self
	}

	/// Sets the scheduling hint.
	pub fn with_priority(mut self, priority: Priority) -> Self {
		self.priority = priority;

		self
	}

	/// Overrides the caller deadline for this request.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Returns a query parameter value.
	pub fn query_value(&self, key: &str) -> Option<&str> {
		self.query.get(key).map(String::as_str)
	}

	/// Materializes the absolute URI against `base`.
	pub fn uri(&self, base: &Url) -> Result<Url, RequestError> {
		let invalid = |source| RequestError::InvalidUri { target: self.path.clone(), source };
		let mut uri = if is_absolute(&self.path) {
			Url::parse(&self.path).map_err(invalid)?
		} else {
			base.join(self.path.trim_start_matches('/')).map_err(invalid)?
		};

		if self.query.is_empty() {
			uri.set_query(None);
		} else {
			uri.query_pairs_mut().clear().extend_pairs(self.query.iter());
		}

		Ok(uri)
	}

	/// Clones the request onto a new absolute URI, re-parsing its query parameters.
	///
	/// Used for redirects and `Link` navigation. Everything else (method, body, validators,
	/// priority) is carried over.
	pub fn with_uri(&self, uri: &Url) -> Self {
		let mut target = uri.clone();

		target.set_query(None);
		target.set_fragment(None);

		Self {
			path: target.to_string(),
			query: uri.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect(),
			..self.clone()
		}
	}
}

fn is_absolute(path: &str) -> bool {
	path.starts_with("https://") || path.starts_with("http://")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn base() -> Url {
		Url::parse("https://api.github.com/").expect("Base fixture should parse.")
	}

	#[test]
	fn path_with_query_is_rejected() {
		let err = Request::get("repos/o/r/issues?page=2").expect_err("Embedded query must fail.");

		assert!(matches!(err, RequestError::PathContainsQuery { .. }));
	}

	#[test]
	fn uri_orders_query_by_key() {
		let request = Request::get("/repos/o/r/issues")
			.expect("Request fixture should be valid.")
			.with_query("state", "all")
			.with_query("per_page", 100);
		let uri = request.uri(&base()).expect("URI should materialize.");

		assert_eq!(uri.as_str(), "https://api.github.com/repos/o/r/issues?per_page=100&state=all");
	}

	#[test]
	fn with_uri_reparses_query() {
		let request = Request::get("repos/o/r/issues")
			.expect("Request fixture should be valid.")
			.with_priority(Priority::Interactive);
		let next = Url::parse("https://api.github.com/repositories/9/issues?page=3&per_page=100")
			.expect("Next link fixture should parse.");
		let moved = request.with_uri(&next);

		assert_eq!(moved.path, "https://api.github.com/repositories/9/issues");
		assert_eq!(moved.query_value("page"), Some("3"));
		assert_eq!(moved.priority, Priority::Interactive);
		assert_eq!(moved.uri(&base()).expect("URI should materialize."), next);
	}

	#[test]
	fn background_pages_upgrade_to_sub_requests() {
		assert_eq!(Priority::Background.for_sub_request(), Priority::SubRequest);
		assert_eq!(Priority::Interactive.for_sub_request(), Priority::Interactive);
		assert!(Priority::Background < Priority::SubRequest);
		assert!(Priority::Interactive < Priority::PublicPool);
	}

	#[test]
	fn graphql_body_carries_query_and_variables() {
		let request = Request::graphql(
			"graphql",
			"query { viewer { login } }",
			Some(serde_json::json!({ "first": 10 })),
		)
		.expect("GraphQL request should build.");
		let body: serde_json::Value = serde_json::from_slice(
			request.body.as_deref().expect("GraphQL request should carry a body."),
		)
		.expect("Body should be JSON.");

		assert_eq!(request.method, Method::POST);
		assert_eq!(body["query"], "query { viewer { login } }");
		assert_eq!(body["variables"]["first"], 10);
	}
}
