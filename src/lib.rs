//! Multi-tenant GitHub API gateway: credential pools that evict and fall back, a retrying,
//! cache-aware request pipeline, and a deduplicating pagination walker in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod ext;
pub mod gateway;
pub mod obs;
pub mod pagination;
pub mod pipeline;
pub mod pool;
pub mod rate_limit;
pub mod request;
pub mod response;
pub mod store;
pub mod transport;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// crates.io
	use reqwest::redirect::Policy;
	// self
	use crate::{
		auth::{Credential, CredentialId},
		client::ClientDirectory,
		config::GatewayConfig,
		ext::ExhaustionPolicy,
		gateway::Gateway,
		pipeline::Pipeline,
		store::{CredentialStore, MemoryStore},
		transport::ReqwestHttpClient,
	};

	/// Base URL for tests that never reach the network.
	pub const UNREACHABLE_API_BASE: &str = "https://api.github.invalid/";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests and leaves redirects to the pipeline.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(Policy::none())
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Configuration pointing at `api_base` with millisecond retry delays.
	pub fn test_config(api_base: &str) -> GatewayConfig {
		GatewayConfig::builder()
			.api_base(api_base)
			.retry_delay(Duration::milliseconds(1))
			.build()
			.expect("Test configuration should be valid.")
	}

	/// Pipeline over the insecure test transport.
	pub fn build_test_pipeline(api_base: &str) -> Arc<Pipeline> {
		let pipeline = Pipeline::new(Arc::new(test_reqwest_http_client()), test_config(api_base))
			.expect("Test pipeline should build.");

		Arc::new(pipeline)
	}

	/// Directory over `store` whose pipeline never reaches the network.
	pub fn build_test_directory(store: Arc<MemoryStore>) -> Arc<ClientDirectory> {
		let store: Arc<dyn CredentialStore> = store;

		Arc::new(ClientDirectory::new(
			build_test_pipeline(UNREACHABLE_API_BASE),
			store,
			Arc::new(ExhaustionPolicy::default()),
		))
	}

	/// Saves one credential per id, with token `ghp_<id>`.
	pub async fn seed_credentials(store: &Arc<MemoryStore>, ids: &[&str]) {
		for raw in ids {
			let id = CredentialId::new(raw).expect("Credential fixture should be valid.");

			store
				.save_credential(Credential::new(id, format!("ghp_{raw}")))
				.await
				.expect("Seeding the memory store should succeed.");
		}
	}

	/// Gateway against `api_base` backed by a fresh in-memory store.
	pub fn build_test_gateway(api_base: &str) -> (Gateway, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn CredentialStore> = store_backend.clone();
		let gateway = Gateway::with_http_client(
			Arc::new(test_reqwest_http_client()),
			store,
			test_config(api_base),
		)
		.expect("Test gateway should build.");

		(gateway, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, HashSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::Hash,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
