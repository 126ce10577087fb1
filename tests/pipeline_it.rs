// std
use std::sync::atomic::{AtomicUsize, Ordering};
// crates.io
use http::{Method, StatusCode, header::LOCATION};
use httpmock::prelude::*;
// self
use github_gateway::{
	_preludet::*,
	api::CallOptions,
	auth::{Credential, CredentialId},
	config::GatewayConfig,
	error::TransportError,
	gateway::Gateway,
	pipeline::{Json, REQUEST_ID_HEADER},
	rate_limit::RateLimit,
	request::{Request, RequestError},
	store::{CredentialStore, MemoryStore},
	transport::{GatewayHttpClient, HttpRequest, HttpResponse, TransportFuture},
};

const ISSUE_BODY: &str = r#"{
	"id": 1,
	"number": 1,
	"title": "Found a bug",
	"state": "open",
	"user": {"id": 7, "login": "octocat"},
	"labels": [],
	"updated_at": "2025-01-02T03:04:05Z"
}"#;

fn id(raw: &str) -> CredentialId {
	CredentialId::new(raw).expect("Credential fixture should be valid.")
}

async fn gateway_for(server: &MockServer) -> Gateway {
	let (gateway, store) = build_test_gateway(&server.url("/"));

	seed_credentials(&store, &["1", "2"]).await;

	gateway
}

/// Transport answering every exchange with a fixed status, counting calls.
#[derive(Default)]
struct ScriptedTransport {
	calls: Arc<AtomicUsize>,
	status: u16,
	fail: bool,
	stall: bool,
}
impl ScriptedTransport {
	fn status(status: u16) -> Self {
		Self { status, ..Default::default() }
	}

	fn failing() -> Self {
		Self { fail: true, ..Default::default() }
	}

	fn stalling() -> Self {
		Self { stall: true, status: 200, ..Default::default() }
	}
}
impl GatewayHttpClient for ScriptedTransport {
	fn execute(&self, _request: HttpRequest) -> TransportFuture<'_> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			if self.stall {
				tokio::time::sleep(std::time::Duration::from_secs(5)).await;
			}
			if self.fail {
				return Err(TransportError::Io(std::io::Error::new(
					std::io::ErrorKind::ConnectionReset,
					"connection reset by peer",
				)));
			}

			let mut response = HttpResponse::new(Vec::new());

			*response.status_mut() =
				StatusCode::from_u16(self.status).expect("Scripted status should be valid.");

			Ok(response)
		})
	}
}

/// One exchange as the transport saw it.
#[derive(Clone, Debug)]
struct Seen {
	method: Method,
	path: String,
	body: Vec<u8>,
	content_type: bool,
	request_id: Option<String>,
}

/// Transport that redirects `/old` to `/new` with a fixed status and records every exchange.
struct RedirectingTransport {
	status: u16,
	seen: Mutex<Vec<Seen>>,
}
impl RedirectingTransport {
	fn new(status: u16) -> Self {
		Self { status, seen: Mutex::new(Vec::new()) }
	}

	fn seen(&self) -> Vec<Seen> {
		self.seen.lock().clone()
	}
}
impl GatewayHttpClient for RedirectingTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let header = |name: &str| {
			request.headers().get(name).and_then(|value| value.to_str().ok()).map(str::to_owned)
		};
		let seen = Seen {
			method: request.method().clone(),
			path: request.uri().path().to_owned(),
			body: request.body().clone(),
			content_type: header("content-type").is_some(),
			request_id: header(REQUEST_ID_HEADER),
		};
		let redirect = seen.path == "/old";

		self.seen.lock().push(seen);

		Box::pin(async move {
			let mut response = HttpResponse::new(b"{}".to_vec());

			if redirect {
				*response.status_mut() =
					StatusCode::from_u16(self.status).expect("Redirect status should be valid.");
				response.headers_mut().insert(LOCATION, http::HeaderValue::from_static("/new"));
			}

			Ok(response)
		})
	}
}

/// Transport that holds every exchange open briefly and records the peak concurrency.
#[derive(Default)]
struct GatedTransport {
	in_flight: AtomicUsize,
	peak: AtomicUsize,
	calls: AtomicUsize,
}
impl GatewayHttpClient for GatedTransport {
	fn execute(&self, _request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;

			self.peak.fetch_max(now, Ordering::SeqCst);
			tokio::time::sleep(std::time::Duration::from_millis(30)).await;
			self.in_flight.fetch_sub(1, Ordering::SeqCst);
			self.calls.fetch_add(1, Ordering::SeqCst);

			Ok(HttpResponse::new(b"{}".to_vec()))
		})
	}
}

fn gateway_over(
	http: Arc<dyn GatewayHttpClient>,
	config: GatewayConfig,
) -> (Gateway, Arc<MemoryStore>) {
	let store_backend = Arc::new(MemoryStore::default());
	let store: Arc<dyn CredentialStore> = store_backend.clone();
	let gateway =
		Gateway::with_http_client(http, store, config).expect("Scripted gateway should build.");

	(gateway, store_backend)
}

fn scripted_gateway(transport: ScriptedTransport) -> (Gateway, Arc<MemoryStore>) {
	gateway_over(Arc::new(transport), test_config(UNREACHABLE_API_BASE))
}

async fn redirected_post(status: u16) -> (Vec<Seen>, StatusCode) {
	let transport = Arc::new(RedirectingTransport::new(status));
	let (gateway, store) = gateway_over(transport.clone(), test_config(UNREACHABLE_API_BASE));

	seed_credentials(&store, &["1"]).await;

	let client = gateway.client(&id("1")).await.expect("Credential should activate.");
	let request = Request::json(Method::POST, "old", &serde_json::json!({ "title": "moved" }))
		.expect("Request should build.");
	let response = client
		.fetch::<Json<serde_json::Value>>(&request)
		.await
		.expect("Redirected write should succeed.");
	let hop = response.redirect.as_ref().expect("Redirect should be recorded.").status;

	(transport.seen(), hop)
}

#[tokio::test]
async fn conditional_get_reuses_validators_and_skips_decoding_304() {
	let server = MockServer::start_async().await;
	let gateway = gateway_for(&server).await;
	let client = gateway.client(&id("1")).await.expect("Credential should activate.");
	let mut fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/repos/o/r/issues/1");
			then.status(200)
				.header("content-type", "application/json")
				.header("etag", "\"v1\"")
				.body(ISSUE_BODY);
		})
		.await;
	let first = client
		.get_issue("o", "r", 1, CallOptions::default())
		.await
		.expect("First fetch should succeed.");

	fresh.assert_async().await;
	fresh.delete_async().await;

	let cache = first.cache.clone().expect("Response should carry validators.");

	assert_eq!(cache.etag.as_deref(), Some("\"v1\""));
	assert_eq!(cache.owner, id("1"));
	assert_eq!(first.payload.map(|issue| issue.title), Some("Found a bug".to_owned()));

	let not_modified = server
		.mock_async(|when, then| {
			when.method(GET).path("/repos/o/r/issues/1").header("if-none-match", "\"v1\"");
			then.status(304).header("etag", "\"v1\"");
		})
		.await;
	let second = client
		.get_issue("o", "r", 1, CallOptions::default().with_cache(cache))
		.await
		.expect("Conditional fetch should succeed.");

	not_modified.assert_async().await;

	assert!(second.is_not_modified());
	assert!(second.succeeded());
	assert!(second.payload.is_none());
	assert!(second.error.is_none());
}

#[tokio::test]
async fn validators_owned_by_another_credential_are_not_sent() {
	let server = MockServer::start_async().await;
	let gateway = gateway_for(&server).await;
	let owner = gateway.client(&id("1")).await.expect("Owner should activate.");
	let other = gateway.client(&id("2")).await.expect("Other credential should activate.");
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/repos/o/r/issues/1");
			then.status(200)
				.header("content-type", "application/json")
				.header("etag", "\"v1\"")
				.body(ISSUE_BODY);
		})
		.await;
	let cache = owner
		.get_issue("o", "r", 1, CallOptions::default())
		.await
		.expect("Owner fetch should succeed.")
		.cache
		.expect("Response should carry validators.");
	let response = other
		.get_issue("o", "r", 1, CallOptions::default().with_cache(cache))
		.await
		.expect("Fetch with foreign validators should succeed.");

	// Without the conditional header the upstream answers 200 again.
	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(response.cache.map(|cache| cache.owner), Some(id("2")));

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn requests_carry_credential_headers_and_responses_carry_metadata() {
	let server = MockServer::start_async().await;
	let gateway = gateway_for(&server).await;
	let client = gateway.client(&id("1")).await.expect("Credential should activate.");
	let reset = OffsetDateTime::now_utc().unix_timestamp() + 3_600;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/repos/o/r/issues/1")
				.header("authorization", "bearer ghp_1")
				.header("accept", "application/vnd.github.v3+json")
				.header_exists(REQUEST_ID_HEADER);
			then.status(200)
				.header("content-type", "application/json")
				.header("x-ratelimit-limit", "5000")
				.header("x-ratelimit-remaining", "4321")
				.header("x-ratelimit-reset", reset.to_string())
				.header("x-oauth-scopes", "repo, read:org")
				.header("retry-after", "30")
				.body(ISSUE_BODY);
		})
		.await;
	let response = client
		.get_issue("o", "r", 1, CallOptions::default())
		.await
		.expect("Fetch should succeed.");

	mock.assert_async().await;

	let snapshot = response.rate_limit.clone().expect("Rate-limit headers should be captured.");

	assert_eq!(snapshot.limit, 5000);
	assert_eq!(snapshot.remaining, 4321);
	assert_eq!(snapshot.reset.unix_timestamp(), reset);
	assert!(response.scopes.contains("repo"));
	assert!(response.scopes.contains("read:org"));
	assert!(response.retry_after.is_some_and(|at| at > OffsetDateTime::now_utc()));
	assert_eq!(client.rate_limit().map(|limit| limit.remaining), Some(4321));
}

#[tokio::test]
async fn redirects_are_followed_and_recorded() {
	let server = MockServer::start_async().await;
	let gateway = gateway_for(&server).await;
	let client = gateway.client(&id("1")).await.expect("Credential should activate.");
	let moved = server
		.mock_async(|when, then| {
			when.method(GET).path("/repos/old/r/issues/1");
			then.status(301).header("location", "/repos/new/r/issues/1");
		})
		.await;
	let target = server
		.mock_async(|when, then| {
			when.method(GET).path("/repos/new/r/issues/1").header("authorization", "bearer ghp_1");
			then.status(200).header("content-type", "application/json").body(ISSUE_BODY);
		})
		.await;
	let response = client
		.get_issue("old", "r", 1, CallOptions::default())
		.await
		.expect("Redirected fetch should succeed.");

	moved.assert_async().await;
	target.assert_async().await;

	let link = response.redirect.clone().expect("Redirect chain should be recorded.");

	assert_eq!(link.hops(), 1);
	assert_eq!(link.status, StatusCode::MOVED_PERMANENTLY);
	assert!(link.original.path().ends_with("/repos/old/r/issues/1"));
	assert!(link.resolved.path().ends_with("/repos/new/r/issues/1"));
	assert_eq!(response.payload.map(|issue| issue.number), Some(1));
}

#[tokio::test]
async fn redirect_loops_stop_at_the_hop_limit() {
	let server = MockServer::start_async().await;
	let gateway = gateway_for(&server).await;
	let client = gateway.client(&id("1")).await.expect("Credential should activate.");
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/loop");
			then.status(302).header("location", "/loop");
		})
		.await;
	let request = Request::get("loop").expect("Request should build.");
	let err = client
		.fetch::<Json<serde_json::Value>>(&request)
		.await
		.expect_err("A redirect loop should fail.");

	assert!(matches!(err, Error::RedirectLimit { hops: 5, .. }));

	mock.assert_calls_async(6).await;
}

#[tokio::test]
async fn see_other_reissues_a_post_as_a_get_without_body() {
	let (seen, hop) = redirected_post(303).await;

	assert_eq!(hop, StatusCode::SEE_OTHER);
	assert_eq!(seen.len(), 2);
	assert_eq!((seen[0].method.clone(), seen[0].path.as_str()), (Method::POST, "/old"));
	assert!(!seen[0].body.is_empty());
	assert!(seen[0].content_type);
	assert_eq!((seen[1].method.clone(), seen[1].path.as_str()), (Method::GET, "/new"));
	assert!(seen[1].body.is_empty());
	assert!(!seen[1].content_type);
}

#[tokio::test]
async fn temporary_redirects_keep_the_method_and_body() {
	let (seen, hop) = redirected_post(307).await;

	assert_eq!(hop, StatusCode::TEMPORARY_REDIRECT);
	assert_eq!(seen.len(), 2);
	assert_eq!((seen[1].method.clone(), seen[1].path.as_str()), (Method::POST, "/new"));
	assert_eq!(seen[1].body, seen[0].body);
	assert!(seen[1].content_type);
}

#[tokio::test]
async fn one_correlation_id_spans_every_hop_of_a_fetch() {
	let (seen, _) = redirected_post(301).await;
	let first = seen[0].request_id.clone().expect("Correlation id should be sent.");

	assert_eq!(first.len(), 16);
	assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
	assert_eq!(seen[1].request_id.as_deref(), Some(first.as_str()));

	// A second fetch gets its own id.
	let (again, _) = redirected_post(301).await;

	assert_ne!(again[0].request_id.as_deref(), Some(first.as_str()));
}

#[tokio::test]
async fn non_positive_request_timeouts_are_rejected() {
	let transport = ScriptedTransport::status(200);
	let calls = transport.calls.clone();
	let (gateway, store) = scripted_gateway(transport);

	seed_credentials(&store, &["1"]).await;

	let client = gateway.client(&id("1")).await.expect("Credential should activate.");

	for timeout in [Duration::ZERO, Duration::milliseconds(-5)] {
		let request =
			Request::get("rate_limit").expect("Request should build.").with_timeout(timeout);
		let err = client
			.fetch::<Json<serde_json::Value>>(&request)
			.await
			.expect_err("A timeout with no time left should be rejected.");

		assert!(matches!(err, Error::InvalidRequest(RequestError::NonPositiveTimeout { .. })));
	}

	assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_calls_on_one_credential_queue_behind_the_gate() {
	let transport = Arc::new(GatedTransport::default());
	let config = GatewayConfig::builder()
		.api_base(UNREACHABLE_API_BASE)
		.retry_delay(Duration::milliseconds(1))
		.client_concurrency(2)
		.build()
		.expect("Config should validate.");
	let (gateway, store) = gateway_over(transport.clone(), config);

	seed_credentials(&store, &["1"]).await;

	let client = gateway.client(&id("1")).await.expect("Credential should activate.");
	let tasks = (0..6)
		.map(|_| {
			let client = client.clone();

			tokio::spawn(async move {
				let request = Request::get("rate_limit").expect("Request should build.");

				client.fetch::<Json<serde_json::Value>>(&request).await
			})
		})
		.collect::<Vec<_>>();

	for task in tasks {
		let response = task
			.await
			.expect("Queued call should not panic.")
			.expect("Queued call should complete.");

		assert_eq!(response.status, StatusCode::OK);
	}

	assert_eq!(transport.calls.load(Ordering::SeqCst), 6);
	assert_eq!(transport.peak.load(Ordering::SeqCst), 2);
	assert_eq!(transport.in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn server_errors_are_retried_until_the_attempt_cap() {
	let transport = ScriptedTransport::status(503);
	let calls = transport.calls.clone();
	let (gateway, store) = scripted_gateway(transport);

	seed_credentials(&store, &["1"]).await;

	let client = gateway.client(&id("1")).await.expect("Credential should activate.");
	let request = Request::get("rate_limit").expect("Request should build.");
	let response = client
		.fetch::<Json<serde_json::Value>>(&request)
		.await
		.expect("Exhausted retries should surface as a response.");

	assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
	assert!(!response.succeeded());
	assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
	let transport = ScriptedTransport::status(404);
	let calls = transport.calls.clone();
	let (gateway, store) = scripted_gateway(transport);

	seed_credentials(&store, &["1"]).await;

	let client = gateway.client(&id("1")).await.expect("Credential should activate.");
	let response = client
		.get_issue("o", "r", 404, CallOptions::default())
		.await
		.expect("A 404 is a response, not an error.");

	assert_eq!(response.status, StatusCode::NOT_FOUND);
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn final_transport_failure_propagates() {
	let transport = ScriptedTransport::failing();
	let calls = transport.calls.clone();
	let (gateway, store) = scripted_gateway(transport);

	seed_credentials(&store, &["1"]).await;

	let client = gateway.client(&id("1")).await.expect("Credential should activate.");
	let err = client
		.get_issue("o", "r", 1, CallOptions::default())
		.await
		.expect_err("Transport failure on the last attempt should propagate.");

	assert!(matches!(err, Error::Transport(TransportError::Io(_))));
	assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn slow_exchanges_time_out_at_the_caller_deadline() {
	let (gateway, store) = scripted_gateway(ScriptedTransport::stalling());

	seed_credentials(&store, &["1"]).await;

	let client = gateway.client(&id("1")).await.expect("Credential should activate.");
	let request = Request::get("rate_limit")
		.expect("Request should build.")
		.with_timeout(Duration::milliseconds(50));
	let err = client
		.fetch::<Json<serde_json::Value>>(&request)
		.await
		.expect_err("Stalled exchange should time out.");

	assert!(matches!(err, Error::Timeout { after } if after == Duration::milliseconds(50)));
}

#[tokio::test]
async fn structured_and_unstructured_error_bodies() {
	let server = MockServer::start_async().await;
	let gateway = gateway_for(&server).await;
	let client = gateway.client(&id("1")).await.expect("Credential should activate.");
	let structured = server
		.mock_async(|when, then| {
			when.method(GET).path("/repos/o/r/issues/1");
			then.status(422).header("content-type", "application/json; charset=utf-8").body(
				r#"{"message": "Validation Failed", "errors": [{"resource": "Issue", "field": "title", "code": "missing_field"}], "documentation_url": "https://docs.github.com"}"#,
			);
		})
		.await;
	let proxy_page = server
		.mock_async(|when, then| {
			when.method(GET).path("/repos/o/r/issues/2");
			then.status(404).header("content-type", "text/html").body("<html>Not here</html>");
		})
		.await;
	let failed = client
		.get_issue("o", "r", 1, CallOptions::default())
		.await
		.expect("A 422 is a response, not an error.");
	let error = failed.error.as_ref().expect("JSON error body should be decoded.");

	assert!(!failed.succeeded());
	assert_eq!(error.message, "Validation Failed");
	assert_eq!(error.errors.len(), 1);

	let html = client
		.get_issue("o", "r", 2, CallOptions::default())
		.await
		.expect("A 404 is a response, not an error.");

	assert!(!html.succeeded());
	assert!(html.error.is_none());
	assert!(html.payload.is_none());

	structured.assert_async().await;
	proxy_page.assert_async().await;
}

#[tokio::test]
async fn existence_checks_map_204_and_404() {
	let server = MockServer::start_async().await;
	let gateway = gateway_for(&server).await;
	let client = gateway.client(&id("1")).await.expect("Credential should activate.");
	let present = server
		.mock_async(|when, then| {
			when.method(GET).path("/repos/o/r/assignees/octocat");
			then.status(204);
		})
		.await;
	let absent = server
		.mock_async(|when, then| {
			when.method(GET).path("/repos/o/r/assignees/ghost");
			then.status(404)
				.header("content-type", "application/json")
				.body(r#"{"message": "Not Found"}"#);
		})
		.await;

	assert_eq!(
		client
			.check_assignee("o", "r", "octocat", CallOptions::default())
			.await
			.expect("Existence check should succeed.")
			.payload,
		Some(true)
	);
	assert_eq!(
		client
			.check_assignee("o", "r", "ghost", CallOptions::default())
			.await
			.expect("Existence check should succeed.")
			.payload,
		Some(false)
	);

	present.assert_async().await;
	absent.assert_async().await;
}

#[tokio::test]
async fn raw_contents_use_the_raw_media_type() {
	let server = MockServer::start_async().await;
	let gateway = gateway_for(&server).await;
	let client = gateway.client(&id("1")).await.expect("Credential should activate.");
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/repos/o/r/contents/docs/README.md")
				.query_param("ref", "main")
				.header("accept", "application/vnd.github.v3.raw");
			then.status(200).header("content-type", "text/plain").body("# Title\n");
		})
		.await;
	let response = client
		.get_raw_contents("o", "r", "/docs/README.md", Some("main"), CallOptions::default())
		.await
		.expect("Raw fetch should succeed.");

	mock.assert_async().await;

	assert_eq!(response.payload.as_deref(), Some(b"# Title\n".as_slice()));
}

#[tokio::test]
async fn graphql_errors_surface_next_to_partial_data() {
	let server = MockServer::start_async().await;
	let gateway = gateway_for(&server).await;
	let client = gateway.client(&id("1")).await.expect("Credential should activate.");
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/graphql").header("content-type", "application/json");
			then.status(200).header("content-type", "application/json").body(
				r#"{"data": {"viewer": null}, "errors": [{"message": "Field 'nope' doesn't exist on type 'User'", "type": "undefinedField", "path": ["viewer", "nope"]}]}"#,
			);
		})
		.await;
	let response = client
		.graphql::<serde_json::Value>("query { viewer { nope } }", None, Default::default())
		.await
		.expect("GraphQL call should succeed.");

	mock.assert_async().await;

	assert!(response.succeeded());
	assert!(response.payload.is_some());
	assert!(
		response
			.error
			.expect("GraphQL errors should become an API error.")
			.message
			.contains("doesn't exist")
	);
}

#[tokio::test]
async fn exhausted_quota_rejects_before_dispatch() {
	let transport = ScriptedTransport::status(200);
	let calls = transport.calls.clone();
	let (gateway, store) = scripted_gateway(transport);
	let snapshot = RateLimit {
		token: "fp".into(),
		limit: 5000,
		remaining: 0,
		reset: OffsetDateTime::now_utc() + Duration::minutes(30),
	};

	store
		.save_credential(Credential::new(id("1"), "ghp_1").with_rate_limit(snapshot.clone()))
		.await
		.expect("Seeding should succeed.");

	let client = gateway.client(&id("1")).await.expect("Credential should activate.");
	let err = client
		.get_issue("o", "r", 1, CallOptions::default())
		.await
		.expect_err("Exhausted quota should reject.");

	assert!(matches!(
		err,
		Error::RateLimited { credential, reset_at }
			if credential == id("1") && reset_at == snapshot.reset
	));
	assert_eq!(calls.load(Ordering::SeqCst), 0);
}
