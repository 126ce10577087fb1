//! Gateway configuration with validated defaults.

// crates.io
use http::HeaderValue;
use serde::{Deserializer, Serializer};
// self
use crate::{_prelude::*, error::ConfigError};

/// Largest `per_page` the upstream API accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Runtime settings shared by the pipeline, clients, and pools.
///
/// Deserializing fills missing fields with defaults; call [`validate`](Self::validate)
/// afterwards (the builder does so on [`build`](GatewayConfigBuilder::build)). Durations are
/// expressed in milliseconds on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
	/// REST base URL; normalized to end with `/`.
	pub api_base: String,
	/// GraphQL endpoint path relative to `api_base`.
	pub graphql_path: String,
	/// `User-Agent` sent with every request.
	pub user_agent: String,
	/// Default `Accept` for JSON endpoints.
	pub accept: String,
	/// `Accept` used for raw byte payloads.
	pub raw_accept: String,
	/// Total attempts per exchange (first try included).
	pub max_attempts: u32,
	/// Base retry delay; attempt `n` waits `n * retry_delay`.
	#[serde(with = "millis")]
	pub retry_delay: Duration,
	/// Redirect hops followed before giving up.
	pub max_redirects: usize,
	/// `per_page` forced onto paged fetches.
	pub max_page_size: u32,
	/// Requests allowed in flight per credential.
	pub client_concurrency: usize,
	/// Idle period after which a credential client is deactivated.
	#[serde(with = "millis")]
	pub client_idle_timeout: Duration,
	/// Caller deadline applied when a request carries none.
	#[serde(with = "millis")]
	pub call_timeout: Duration,
	/// Head start the pipeline deadline keeps over the caller deadline.
	#[serde(with = "millis")]
	pub deadline_margin: Duration,
	/// Public-pool calls between two membership reloads.
	pub public_reload_every: u64,
}
impl GatewayConfig {
	/// Starts a builder seeded with defaults.
	pub fn builder() -> GatewayConfigBuilder {
		GatewayConfigBuilder::default()
	}

	/// Checks every setting and normalizes the API base.
	pub fn validate(mut self) -> Result<Self, ConfigError> {
		let mut base = Url::parse(&self.api_base)
			.map_err(|source| ConfigError::InvalidApiBase { source })?;

		if base.cannot_be_a_base() {
			return Err(ConfigError::ApiBaseNotABase { url: self.api_base });
		}
		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		self.api_base = base.into();

		for (setting, zero) in [
			("max_attempts", self.max_attempts == 0),
			("max_page_size", self.max_page_size == 0),
			("client_concurrency", self.client_concurrency == 0),
			("public_reload_every", self.public_reload_every == 0),
			("call_timeout", !self.call_timeout.is_positive()),
			("client_idle_timeout", !self.client_idle_timeout.is_positive()),
		] {
			if zero {
				return Err(ConfigError::Zero { setting });
			}
		}

		if self.retry_delay.is_negative() {
			return Err(ConfigError::Negative { setting: "retry_delay" });
		}
		if self.max_page_size > MAX_PAGE_SIZE {
			return Err(ConfigError::PageSizeTooLarge { max: MAX_PAGE_SIZE });
		}
		if self.deadline_margin.is_negative() || self.deadline_margin >= self.call_timeout {
			return Err(ConfigError::DeadlineMarginTooLarge);
		}

		for (setting, value) in [
			("user_agent", &self.user_agent),
			("accept", &self.accept),
			("raw_accept", &self.raw_accept),
		] {
			if HeaderValue::from_str(value).is_err() {
				return Err(ConfigError::InvalidHeaderValue { setting });
			}
		}

		Ok(self)
	}

	/// Deadline the pipeline enforces for a caller deadline of `caller`.
	pub fn pipeline_deadline(&self, caller: Option<Duration>) -> Duration {
		let caller = caller.unwrap_or(self.call_timeout);
		let deadline = caller - self.deadline_margin;

		if deadline.is_positive() { deadline } else { caller }
	}

	/// Parsed REST base URL.
	pub fn api_base_url(&self) -> Result<Url, ConfigError> {
		Url::parse(&self.api_base).map_err(|source| ConfigError::InvalidApiBase { source })
	}

	/// Absolute GraphQL endpoint.
	pub fn graphql_uri(&self) -> Result<Url, ConfigError> {
		self.api_base_url()?
			.join(self.graphql_path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidApiBase { source })
	}
}
impl Default for GatewayConfig {
	fn default() -> Self {
		Self {
			api_base: "https://api.github.com/".into(),
			graphql_path: "graphql".into(),
			user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into(),
			accept: "application/vnd.github.v3+json".into(),
			raw_accept: "application/vnd.github.v3.raw".into(),
			max_attempts: 3,
			retry_delay: Duration::milliseconds(1_000),
			max_redirects: 5,
			max_page_size: MAX_PAGE_SIZE,
			client_concurrency: 4,
			client_idle_timeout: Duration::minutes(10),
			call_timeout: Duration::seconds(60),
			deadline_margin: Duration::seconds(1),
			public_reload_every: 1_000,
		}
	}
}

/// Builder for [`GatewayConfig`] values.
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
	config: GatewayConfig,
}
impl GatewayConfigBuilder {
	/// Overrides the REST base URL (parsed on [`build`](Self::build)).
	pub fn api_base(mut self, url: impl Into<String>) -> Self {
		self.config.api_base = url.into();

		self
	}

	/// Overrides the GraphQL path.
	pub fn graphql_path(mut self, path: impl Into<String>) -> Self {
		self.config.graphql_path = path.into();

		self
	}

	/// Overrides the `User-Agent`.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.config.user_agent = user_agent.into();

		self
	}

	/// Overrides the default JSON `Accept`.
	pub fn accept(mut self, accept: impl Into<String>) -> Self {
		self.config.accept = accept.into();

		self
	}

	/// Overrides the raw-bytes `Accept`.
	pub fn raw_accept(mut self, accept: impl Into<String>) -> Self {
		self.config.raw_accept = accept.into();

		self
	}

	/// Sets the total attempts per exchange.
	pub fn max_attempts(mut self, attempts: u32) -> Self {
		self.config.max_attempts = attempts;

		self
	}

	/// Sets the base retry delay.
	pub fn retry_delay(mut self, delay: Duration) -> Self {
		self.config.retry_delay = delay;

		self
	}

	/// Sets the redirect hop limit.
	pub fn max_redirects(mut self, hops: usize) -> Self {
		self.config.max_redirects = hops;

		self
	}

	/// Sets the forced page size.
	pub fn max_page_size(mut self, size: u32) -> Self {
		self.config.max_page_size = size;

		self
	}

	/// Sets the per-credential concurrency bound.
	pub fn client_concurrency(mut self, permits: usize) -> Self {
		self.config.client_concurrency = permits;

		self
	}

	/// Sets the idle deactivation period.
	pub fn client_idle_timeout(mut self, timeout: Duration) -> Self {
		self.config.client_idle_timeout = timeout;

		self
	}

	/// Sets the default caller deadline.
	pub fn call_timeout(mut self, timeout: Duration) -> Self {
		self.config.call_timeout = timeout;

		self
	}

	/// Sets the margin kept between the caller deadline and the pipeline deadline.
	pub fn deadline_margin(mut self, margin: Duration) -> Self {
		self.config.deadline_margin = margin;

		self
	}

	/// Sets how many public-pool calls pass between membership reloads.
	pub fn public_reload_every(mut self, calls: u64) -> Self {
		self.config.public_reload_every = calls;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<GatewayConfig, ConfigError> {
		self.config.validate()
	}
}

mod millis {
	// self
	use super::*;

	pub(super) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(value.whole_milliseconds() as i64)
	}

	pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		i64::deserialize(deserializer).map(Duration::milliseconds)
	}
}
