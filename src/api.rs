//! Resource wrappers over the pipeline and the pagination walker.
//!
//! Each wrapper builds one request and funnels it through [`CredentialClient::fetch`] or
//! [`CredentialClient::fetch_paged`]; to spread calls across credentials, invoke them inside
//! [`pool::execute`](crate::pool::execute).

pub mod models;

pub use models::*;

// crates.io
use http::StatusCode;
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	client::CredentialClient,
	pagination::PageLimits,
	pipeline::{Exists, GraphQl, Json, Raw},
	request::{Priority, Request},
	response::{CacheMetadata, Response},
};

/// Per-call options shared by every wrapper.
#[derive(Clone, Debug, Default)]
pub struct CallOptions {
	/// Validators from a previous response; only honored by GET wrappers.
	pub cache: Option<CacheMetadata>,
	/// Scheduling hint.
	pub priority: Priority,
}
impl CallOptions {
	/// Sends conditional headers built from `cache`.
	pub fn with_cache(mut self, cache: CacheMetadata) -> Self {
		self.cache = Some(cache);

		self
	}

	/// Overrides the priority.
	pub fn with_priority(mut self, priority: Priority) -> Self {
		self.priority = priority;

		self
	}

	fn apply(self, request: Request) -> Request {
		let request = request.with_priority(self.priority);

		match self.cache {
			Some(cache) => request.with_cache(cache),
			None => request,
		}
	}
}

impl CredentialClient {
	/// `GET /repos/{owner}/{repo}/issues/{number}`.
	pub async fn get_issue(
		&self,
		owner: &str,
		repo: &str,
		number: u64,
		options: CallOptions,
	) -> Result<Response<Issue>> {
		let request = options.apply(Request::get(format!("repos/{owner}/{repo}/issues/{number}"))?);

		self.fetch::<Json<Issue>>(&request).await
	}

	/// `GET /repos/{owner}/{repo}/issues/{number}/comments`, every page, deduplicated by id.
	pub async fn list_issue_comments(
		&self,
		owner: &str,
		repo: &str,
		number: u64,
		limits: PageLimits,
		options: CallOptions,
	) -> Result<Response<Vec<IssueComment>>> {
		let request = options
			.apply(Request::get(format!("repos/{owner}/{repo}/issues/{number}/comments"))?);

		self.fetch_paged(request, |comment: &IssueComment| comment.id, limits).await
	}

	/// `GET /repos/{owner}/{repo}/labels`, deduplicated by name.
	pub async fn list_repo_labels(
		&self,
		owner: &str,
		repo: &str,
		limits: PageLimits,
		options: CallOptions,
	) -> Result<Response<Vec<Label>>> {
		let request = options.apply(Request::get(format!("repos/{owner}/{repo}/labels"))?);

		self.fetch_paged(request, |label: &Label| label.name.clone(), limits).await
	}

	/// `GET /repos/{owner}/{repo}/assignees/{login}`.
	///
	/// The payload is `true` on 204 and `false` on 404; other statuses leave it unset.
	pub async fn check_assignee(
		&self,
		owner: &str,
		repo: &str,
		login: &str,
		options: CallOptions,
	) -> Result<Response<bool>> {
		let request =
			options.apply(Request::get(format!("repos/{owner}/{repo}/assignees/{login}"))?);
		let mut response = self.fetch::<Exists>(&request).await?;

		if response.status == StatusCode::NOT_FOUND {
			response.payload = Some(false);
		}

		Ok(response)
	}

	/// `GET /repos/{owner}/{repo}/contents/{path}` as raw bytes, optionally at `reference`.
	pub async fn get_raw_contents(
		&self,
		owner: &str,
		repo: &str,
		path: &str,
		reference: Option<&str>,
		options: CallOptions,
	) -> Result<Response<Vec<u8>>> {
		let path = path.trim_start_matches('/');
		let mut request = Request::get(format!("repos/{owner}/{repo}/contents/{path}"))?;

		if let Some(reference) = reference {
			request = request.with_query("ref", reference);
		}

		self.fetch::<Raw>(&options.apply(request)).await
	}

	/// POSTs a GraphQL query to the configured endpoint.
	///
	/// Errors reported inside a 200 envelope land in [`Response::error`] next to any partial
	/// `data`.
	pub async fn graphql<T>(
		&self,
		query: &str,
		variables: Option<serde_json::Value>,
		priority: Priority,
	) -> Result<Response<T>>
	where
		T: 'static + Send + DeserializeOwned,
	{
		let endpoint = self.pipeline().config().graphql_uri()?;
		let request =
			Request::graphql(endpoint.as_str(), query, variables)?.with_priority(priority);

		self.fetch::<GraphQl<T>>(&request).await
	}
}
