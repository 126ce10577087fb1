// std
use std::num::NonZeroU32;
// crates.io
use http::{Method, StatusCode};
use httpmock::{Mock, prelude::*};
// self
use github_gateway::{
	_preludet::*,
	api::{CallOptions, IssueComment},
	auth::CredentialId,
	client::CredentialClient,
	pagination::PageLimits,
	request::{Request, RequestError},
};

const FIRST_PAGE: &str = "/repos/o/r/issues/1/comments";

fn comments(ids: &[u64]) -> String {
	let items = ids
		.iter()
		.map(|id| {
			format!(
				r#"{{"id": {id}, "body": "comment {id}", "user": {{"id": 1, "login": "octocat"}}, "created_at": "2025-01-01T00:00:00Z"}}"#
			)
		})
		.collect::<Vec<_>>();

	format!("[{}]", items.join(","))
}

fn links(next: Option<u32>, last: u32) -> String {
	let last = format!(r#"</pages?page={last}&per_page=100>; rel="last""#);

	match next {
		Some(next) => format!(r#"</pages?page={next}&per_page=100>; rel="next", {last}"#),
		None => last,
	}
}

fn pages(pages: u32) -> NonZeroU32 {
	NonZeroU32::new(pages).expect("Page limit fixture should be non-zero.")
}

fn ids(comments: &[IssueComment]) -> Vec<u64> {
	comments.iter().map(|comment| comment.id).collect()
}

async fn client_for(server: &MockServer) -> Arc<CredentialClient> {
	let (gateway, store) = build_test_gateway(&server.url("/"));

	seed_credentials(&store, &["1"]).await;

	gateway
		.client(&CredentialId::new("1").expect("Credential fixture should be valid."))
		.await
		.expect("Credential should activate.")
}

async fn mock_page(server: &MockServer, page: u32, body: String, link: Option<String>) -> Mock<'_> {
	server
		.mock_async(|when, then| {
			if page == 1 {
				when.method(GET).path(FIRST_PAGE).query_param("per_page", "100");
			} else {
				when.method(GET).path("/pages").query_param("page", page.to_string());
			}

			let then = then
				.status(200)
				.header("content-type", "application/json")
				.header("etag", format!("\"p{page}\""));

			match link {
				Some(link) => then.header("link", link).body(body),
				None => then.body(body),
			};
		})
		.await
}

#[tokio::test]
async fn items_repeated_across_pages_are_kept_once() {
	let server = MockServer::start_async().await;
	let client = client_for(&server).await;
	let first = mock_page(&server, 1, comments(&[41, 42]), Some(links(Some(2), 2))).await;
	let second = mock_page(&server, 2, comments(&[42, 43]), None).await;
	let response = client
		.list_issue_comments("o", "r", 1, PageLimits::default(), CallOptions::default())
		.await
		.expect("Walk should succeed.");

	first.assert_async().await;
	second.assert_async().await;

	let items = response.payload.as_deref().expect("Walk should yield items.");

	assert!(response.succeeded());
	assert_eq!(response.page_count, 2);
	assert_eq!(ids(items), vec![41, 42, 43]);
	assert_eq!(response.first_page_cache.and_then(|cache| cache.etag), Some("\"p1\"".to_owned()));
	assert_eq!(response.cache.and_then(|cache| cache.etag), Some("\"p2\"".to_owned()));
}

#[tokio::test]
async fn oversized_resources_yield_an_empty_result_with_page_one_validators() {
	let server = MockServer::start_async().await;
	let client = client_for(&server).await;
	let first = mock_page(&server, 1, comments(&[1, 2]), Some(links(Some(2), 10))).await;
	let second = mock_page(&server, 2, comments(&[3, 4]), None).await;
	let response = client
		.list_issue_comments(
			"o",
			"r",
			1,
			PageLimits::default().with_hard_limit(pages(5)),
			CallOptions::default(),
		)
		.await
		.expect("Abandoned walk should still succeed.");

	first.assert_async().await;
	second.assert_calls_async(0).await;

	assert!(response.succeeded());
	assert_eq!(response.payload.as_deref().map(<[_]>::len), Some(0));
	assert!(response.pagination.is_none());
	assert_eq!(response.cache.and_then(|cache| cache.etag), Some("\"p1\"".to_owned()));
}

#[tokio::test]
async fn skipping_past_a_single_page_yields_nothing() {
	let server = MockServer::start_async().await;
	let client = client_for(&server).await;
	let first = mock_page(&server, 1, comments(&[1, 2]), None).await;
	let response = client
		.list_issue_comments(
			"o",
			"r",
			1,
			PageLimits::default().with_skip(1),
			CallOptions::default(),
		)
		.await
		.expect("Skipping should not fail.");

	first.assert_async().await;

	assert!(response.succeeded());
	assert_eq!(response.payload.as_deref().map(<[_]>::len), Some(0));
}

#[tokio::test]
async fn skipping_beyond_the_last_page_yields_nothing() {
	let server = MockServer::start_async().await;
	let client = client_for(&server).await;
	let first = mock_page(&server, 1, comments(&[1, 2]), Some(links(Some(2), 2))).await;
	let second = mock_page(&server, 2, comments(&[3]), None).await;
	let response = client
		.list_issue_comments(
			"o",
			"r",
			1,
			PageLimits::default().with_skip(3),
			CallOptions::default(),
		)
		.await
		.expect("Skipping should not fail.");

	first.assert_async().await;
	second.assert_calls_async(0).await;

	assert_eq!(response.payload.as_deref().map(<[_]>::len), Some(0));
	assert!(response.pagination.is_none());
}

#[tokio::test]
async fn numbered_pages_are_jumped_to_directly() {
	let server = MockServer::start_async().await;
	let client = client_for(&server).await;
	let first = mock_page(&server, 1, comments(&[1]), Some(links(Some(2), 3))).await;
	let second = mock_page(&server, 2, comments(&[2]), Some(links(Some(3), 3))).await;
	let third = mock_page(&server, 3, comments(&[3]), None).await;
	let response = client
		.list_issue_comments(
			"o",
			"r",
			1,
			PageLimits::default().with_skip(2),
			CallOptions::default(),
		)
		.await
		.expect("Jump should succeed.");

	first.assert_async().await;
	second.assert_calls_async(0).await;
	third.assert_async().await;

	assert_eq!(ids(response.payload.as_deref().expect("Jump should yield items.")), vec![3]);
	assert_eq!(response.first_page_cache.and_then(|cache| cache.etag), Some("\"p1\"".to_owned()));
}

#[tokio::test]
async fn soft_limit_stops_the_walk() {
	let server = MockServer::start_async().await;
	let client = client_for(&server).await;
	let first = mock_page(&server, 1, comments(&[1]), Some(links(Some(2), 3))).await;
	let second = mock_page(&server, 2, comments(&[2]), Some(links(Some(3), 3))).await;
	let third = mock_page(&server, 3, comments(&[3]), None).await;
	let response = client
		.list_issue_comments(
			"o",
			"r",
			1,
			PageLimits::default().with_soft_limit(pages(2)),
			CallOptions::default(),
		)
		.await
		.expect("Walk should succeed.");

	first.assert_async().await;
	second.assert_async().await;
	third.assert_calls_async(0).await;

	assert_eq!(ids(response.payload.as_deref().expect("Walk should yield items.")), vec![1, 2]);
	assert_eq!(response.page_count, 2);
}

#[tokio::test]
async fn bounded_walks_keep_partial_results_without_validators() {
	let server = MockServer::start_async().await;
	let client = client_for(&server).await;
	let first = mock_page(&server, 1, comments(&[1, 2]), Some(links(Some(2), 3))).await;
	let broken = server
		.mock_async(|when, then| {
			when.method(GET).path("/pages").query_param("page", "2");
			then.status(404)
				.header("content-type", "application/json")
				.body(r#"{"message": "Not Found"}"#);
		})
		.await;
	let response = client
		.list_issue_comments(
			"o",
			"r",
			1,
			PageLimits::default().with_soft_limit(pages(3)),
			CallOptions::default(),
		)
		.await
		.expect("Bounded walk should keep partial results.");

	first.assert_async().await;
	broken.assert_async().await;

	assert!(response.succeeded());
	assert_eq!(ids(response.payload.as_deref().expect("Partial items should remain.")), vec![1, 2]);
	assert!(response.cache.is_none());
	assert!(response.first_page_cache.is_some());
}

#[tokio::test]
async fn unbounded_walks_return_the_failed_page() {
	let server = MockServer::start_async().await;
	let client = client_for(&server).await;
	let _first = mock_page(&server, 1, comments(&[1, 2]), Some(links(Some(2), 3))).await;
	let _broken = server
		.mock_async(|when, then| {
			when.method(GET).path("/pages").query_param("page", "2");
			then.status(404)
				.header("content-type", "application/json")
				.body(r#"{"message": "Not Found"}"#);
		})
		.await;
	let response = client
		.list_issue_comments("o", "r", 1, PageLimits::default(), CallOptions::default())
		.await
		.expect("A failed page is a response, not an error.");

	assert_eq!(response.status, StatusCode::NOT_FOUND);
	assert!(response.payload.is_none());
	assert_eq!(response.error.map(|error| error.message), Some("Not Found".to_owned()));
}

#[tokio::test]
async fn only_get_requests_can_be_paged() {
	let server = MockServer::start_async().await;
	let client = client_for(&server).await;
	let request = Request::new(Method::POST, "repos/o/r/labels").expect("Request should build.");
	let err = client
		.fetch_paged(request, |comment: &IssueComment| comment.id, PageLimits::default())
		.await
		.expect_err("POST should be rejected.");

	assert!(matches!(err, Error::InvalidRequest(RequestError::PagedNonGet { .. })));
}
