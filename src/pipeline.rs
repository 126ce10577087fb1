//! Request pipeline: one logical request in, one typed response out.
//!
//! A fetch materializes the request URI, attaches headers, and then loops over two
//! concerns. Transport failures and 500/502/503/504 responses are retried with a linear
//! backoff. Redirects (301/302/303/307/308) are followed by hand up to
//! [`max_redirects`](GatewayConfig::max_redirects) hops, each recorded in the response's
//! redirect chain. The final response is mined for metadata and, when it succeeded, decoded
//! with the caller's [`PayloadFormat`].
//!
//! The whole exchange runs under a deadline slightly shorter than the caller's so a timeout
//! surfaces here, logged, before the caller's own framework gives up.

pub mod metadata;
pub mod payload;
pub mod retry;

pub use payload::*;
pub use retry::*;

// crates.io
use http::{
	HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
	header::{
		ACCEPT, AUTHORIZATION, CONTENT_TYPE, DATE, IF_MODIFIED_SINCE, IF_NONE_MATCH, LOCATION,
		USER_AGENT,
	},
};
// self
use crate::{
	_prelude::*,
	auth::Credential,
	config::GatewayConfig,
	error::{ConfigError, TransportError},
	obs::{self, CallKind, CallOutcome, CallSpan},
	request::{Request, RequestError},
	response::{RedirectLink, Response},
	transport::{GatewayHttpClient, HttpRequest, HttpResponse, date},
};

const BODY_PREVIEW_CHARS: usize = 256;
/// Correlation header carrying the id of one logical fetch across retries and redirects.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Executes requests against the upstream API on behalf of a credential.
///
/// The pipeline holds no per-credential state; one instance is shared by every credential
/// client of a gateway.
#[derive(Clone)]
pub struct Pipeline {
	http: Arc<dyn GatewayHttpClient>,
	config: Arc<GatewayConfig>,
	base: Url,
}
impl Pipeline {
	/// Creates a pipeline over `http` with a validated configuration.
	pub fn new(
		http: Arc<dyn GatewayHttpClient>,
		config: GatewayConfig,
	) -> Result<Self, ConfigError> {
		let config = config.validate()?;
		let base = config.api_base_url()?;

		Ok(Self { http, config: Arc::new(config), base })
	}

	/// Configuration the pipeline runs with.
	pub fn config(&self) -> &GatewayConfig {
		&self.config
	}

	/// Normalized API base that relative request paths resolve against.
	pub fn base(&self) -> &Url {
		&self.base
	}

	/// Executes `request` with `credential` and decodes the payload as `F`.
	///
	/// Only transport failures on the final attempt, timeouts, redirect overflows, decode
	/// failures of successful bodies, and malformed requests are errors. Every HTTP status,
	/// including exhausted 5xx retries, comes back as a [`Response`].
	pub async fn fetch<F>(
		&self,
		credential: &Credential,
		request: &Request,
	) -> Result<Response<F::Output>>
	where
		F: PayloadFormat,
	{
		let request_id = format!("{:016x}", rand::random::<u64>());
		let span = CallSpan::new(CallKind::Fetch, "pipeline.fetch");

		span.record_request_id(&request_id);
		obs::record_call_outcome(CallKind::Fetch, CallOutcome::Attempt);

		let result = span
			.instrument(self.fetch_within_deadline::<F>(credential, request, &request_id))
			.await;

		obs::record_call_outcome(CallKind::Fetch, CallOutcome::of(&result));

		result
	}

	async fn fetch_within_deadline<F>(
		&self,
		credential: &Credential,
		request: &Request,
		request_id: &str,
	) -> Result<Response<F::Output>>
	where
		F: PayloadFormat,
	{
		if request.cache.is_some() && request.method != Method::GET {
			let method = request.method.to_string();

			return Err(RequestError::ConditionalNonGet { method }.into());
		}
		if let Some(timeout) = request.timeout.filter(|timeout| !timeout.is_positive()) {
			return Err(RequestError::NonPositiveTimeout { timeout: timeout.to_string() }.into());
		}

		let uri = request.uri(&self.base)?;
		let deadline = self.config.pipeline_deadline(request.timeout);

		match tokio::time::timeout(
			deadline.unsigned_abs(),
			self.follow_redirects::<F>(credential, request, request_id, uri.clone()),
		)
		.await
		{
			Ok(result) => result,
			Err(_) => {
				obs::call_timed_out(&credential.id, &uri, deadline);

				Err(Error::Timeout { after: deadline })
			},
		}
	}

	async fn follow_redirects<F>(
		&self,
		credential: &Credential,
		request: &Request,
		request_id: &str,
		mut uri: Url,
	) -> Result<Response<F::Output>>
	where
		F: PayloadFormat,
	{
		let mut current = request.clone();
		let mut chain: Option<Arc<RedirectLink>> = None;

		loop {
			let raw = self.send_with_retry::<F>(credential, &current, request_id, &uri).await?;
			let Some(target) = redirect_target(&raw, &uri) else {
				return self.finish::<F>(credential, request, raw, &uri, chain);
			};
			let hops = chain.as_ref().map_or(0, |link| link.hops());

			if hops >= self.config.max_redirects {
				return Err(Error::RedirectLimit { hops, location: target.to_string() });
			}

			obs::redirect_followed(raw.status().as_u16(), &target, hops + 1);

			if matches!(raw.status(), StatusCode::FOUND | StatusCode::SEE_OTHER) {
				current.method = Method::GET;
				current.body = None;
			}

			current = current.with_uri(&target);
			chain = Some(Arc::new(RedirectLink {
				status: raw.status(),
				original: uri,
				resolved: target.clone(),
				previous: chain,
			}));
			uri = target;
		}
	}

	async fn send_with_retry<F>(
		&self,
		credential: &Credential,
		request: &Request,
		request_id: &str,
		uri: &Url,
	) -> Result<HttpResponse>
	where
		F: PayloadFormat,
	{
		let policy = RetryPolicy::from_config(&self.config);
		let accept = request
			.accept
			.as_deref()
			.or_else(|| F::accept(&self.config))
			.unwrap_or(&self.config.accept)
			.to_owned();
		let mut attempt = 0;

		loop {
			if attempt > 0 {
				tokio::time::sleep(policy.delay_before(attempt).unsigned_abs()).await;
			}

			let http_request =
				self.build_http_request(credential, request, request_id, uri, &accept)?;
			let cause = match self.http.execute(http_request).await {
				Ok(response)
					if RetryPolicy::retries_status(response.status()) && !policy.is_last(attempt) =>
					format!("HTTP {}", response.status().as_u16()),
				Ok(response) => return Ok(response),
				Err(e) if !policy.is_last(attempt) => e.to_string(),
				Err(e) => return Err(e.into()),
			};

			attempt += 1;

			obs::retry_scheduled(&credential.id, attempt, policy.delay_before(attempt), &cause);
		}
	}

	fn build_http_request(
		&self,
		credential: &Credential,
		request: &Request,
		request_id: &str,
		uri: &Url,
		accept: &str,
	) -> Result<HttpRequest> {
		let mut headers = HeaderMap::new();

		headers.insert(ACCEPT, header_value(accept)?);
		headers.insert(
			AUTHORIZATION,
			header_value(&format!("bearer {}", credential.token.expose()))?,
		);
		headers.insert(USER_AGENT, header_value(&self.config.user_agent)?);
		headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), header_value(request_id)?);

		if let Some(now) = date::format_http_date(OffsetDateTime::now_utc()) {
			headers.insert(DATE, header_value(&now)?);
		}
		if request.body.is_some() {
			headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		}
		// Validators are scoped to the token that produced them.
		let validators = request.cache.as_ref().filter(|cache| cache.is_owned_by(&credential.id));

		if let Some(cache) = validators {
			if let Some(etag) = cache.etag.as_deref() {
				headers.insert(IF_NONE_MATCH, header_value(etag)?);
			}
			if let Some(modified) = cache.last_modified.and_then(date::format_http_date) {
				headers.insert(IF_MODIFIED_SINCE, header_value(&modified)?);
			}
		}

		let mut http_request = http::Request::builder()
			.method(request.method.clone())
			.uri(uri.as_str())
			.body(request.body.clone().unwrap_or_default())
			.map_err(TransportError::from)?;

		*http_request.headers_mut() = headers;

		Ok(http_request)
	}

	fn finish<F>(
		&self,
		credential: &Credential,
		request: &Request,
		raw: HttpResponse,
		uri: &Url,
		chain: Option<Arc<RedirectLink>>,
	) -> Result<Response<F::Output>>
	where
		F: PayloadFormat,
	{
		let (parts, body) = raw.into_parts();
		let mut response = Response::new(request.clone(), parts.status);

		response.redirect = chain;
		metadata::apply(&mut response, credential, &parts.headers, uri, OffsetDateTime::now_utc());

		if response.is_not_modified() {
			return Ok(response);
		}
		if response.succeeded() {
			let decoded = F::decode(parts.status, &body)?;

			response.payload = decoded.payload;
			response.error = decoded.error;

			return Ok(response);
		}

		let content_type = parts.headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok());

		response.error = content_type
			.filter(|content_type| content_type.contains("json"))
			.and_then(|_| serde_json::from_slice(&body).ok());

		if response.error.is_none() && !body.is_empty() {
			let preview = String::from_utf8_lossy(&body);
			let preview = preview.chars().take(BODY_PREVIEW_CHARS).collect::<String>();

			obs::unexpected_error_body(parts.status.as_u16(), content_type, &preview);
		}

		Ok(response)
	}
}
impl Debug for Pipeline {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Pipeline").field("base", &self.base.as_str()).finish_non_exhaustive()
	}
}

fn redirect_target(response: &HttpResponse, uri: &Url) -> Option<Url> {
	if !matches!(
		response.status(),
		StatusCode::MOVED_PERMANENTLY
			| StatusCode::FOUND
			| StatusCode::SEE_OTHER
			| StatusCode::TEMPORARY_REDIRECT
			| StatusCode::PERMANENT_REDIRECT
	) {
		return None;
	}

	let location = response.headers().get(LOCATION)?.to_str().ok()?;

	uri.join(location.trim()).ok()
}

fn header_value(value: &str) -> Result<HeaderValue> {
	HeaderValue::from_str(value)
		.map_err(|e| Error::Transport(TransportError::Http(http::Error::from(e))))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn response(status: u16, location: Option<&'static str>) -> HttpResponse {
		let mut response = HttpResponse::new(Vec::new());

		*response.status_mut() =
			StatusCode::from_u16(status).expect("Status fixture should be valid.");

		if let Some(location) = location {
			response.headers_mut().insert(LOCATION, HeaderValue::from_static(location));
		}

		response
	}

	#[test]
	fn redirect_targets_resolve_against_the_current_uri() {
		let uri = Url::parse("https://api.github.com/repos/old/name").expect("URI should parse.");

		assert_eq!(
			redirect_target(&response(301, Some("/repositories/7")), &uri).map(String::from),
			Some("https://api.github.com/repositories/7".to_owned())
		);
		assert!(redirect_target(&response(301, None), &uri).is_none());
		assert!(redirect_target(&response(304, Some("/elsewhere")), &uri).is_none());
	}
}
