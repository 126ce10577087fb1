//! Gateway-level error types shared by the pipeline, pools, and stores.
//!
//! Ordinary API failures (4xx, exhausted 5xx retries) are not errors: they come back as a
//! [`Response`](crate::response::Response) whose `succeeded()` is `false`. The variants here
//! cover what cannot be expressed as response data.

// self
use crate::{_prelude::*, auth::CredentialId, request::RequestError};

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS) on the final attempt.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Request was malformed; a programming error rather than a runtime condition.
	#[error(transparent)]
	InvalidRequest(#[from] RequestError),
	/// A successful response carried a body that could not be decoded.
	#[error("Response body for HTTP {status} could not be decoded.")]
	Decode {
		/// HTTP status of the undecodable response.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},

	/// Credential quota is exhausted; pools evict the credential and try another.
	#[error("Credential {credential} is rate limited until {reset_at}.")]
	RateLimited {
		/// Credential whose quota ran out.
		credential: CredentialId,
		/// Instant the upstream quota resets.
		reset_at: OffsetDateTime,
	},
	/// Credential client could not be activated or was already deactivated.
	#[error("Credential {credential} could not be activated: {reason}.")]
	ClientActivation {
		/// Credential that failed activation.
		credential: CredentialId,
		/// Human-readable reason.
		reason: String,
	},
	/// The client was retired (idle sweep, revocation, shutdown) after being handed out.
	///
	/// The credential itself may be healthy; pools activate it again instead of evicting it.
	#[error("Client for credential {credential} was retired before the call started.")]
	ClientRetired {
		/// Credential whose client was retired.
		credential: CredentialId,
	},
	/// No eligible credential remains in the pool.
	#[error("Credential pool has no eligible members.")]
	PoolEmpty,
	/// The pipeline deadline elapsed before the exchange completed.
	#[error("Upstream call timed out after {after}.")]
	Timeout {
		/// Deadline that elapsed.
		after: Duration,
	},
	/// Upstream redirected more times than the configured hop limit.
	#[error("Gave up after {hops} redirects; last location was {location}.")]
	RedirectLimit {
		/// Number of redirects already followed.
		hops: usize,
		/// Location header of the redirect that was refused.
		location: String,
	},
}
impl Error {
	/// Wraps an activation failure for `credential`.
	pub fn activation(credential: &CredentialId, reason: impl Into<String>) -> Self {
		Self::ClientActivation { credential: credential.clone(), reason: reason.into() }
	}
}

/// Configuration and validation failures raised while building the gateway.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// API base URL cannot be parsed.
	#[error("API base URL is invalid.")]
	InvalidApiBase {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// API base URL cannot carry a path to join against.
	#[error("API base URL `{url}` cannot be used as a base.")]
	ApiBaseNotABase {
		/// Offending URL.
		url: String,
	},
	/// A count-like setting was zero.
	#[error("The {setting} setting must be greater than zero.")]
	Zero {
		/// Setting name.
		setting: &'static str,
	},
	/// Page size exceeds what the upstream API accepts.
	#[error("The max_page_size setting cannot exceed {max}.")]
	PageSizeTooLarge {
		/// Upstream maximum.
		max: u32,
	},
	/// A duration setting was negative.
	#[error("The {setting} setting cannot be negative.")]
	Negative {
		/// Setting name.
		setting: &'static str,
	},
	/// Deadline margin would leave no time for the call itself.
	#[error("The deadline_margin setting must be shorter than call_timeout.")]
	DeadlineMarginTooLarge,
	/// A header value contains characters HTTP forbids.
	#[error("The {setting} setting is not a valid header value.")]
	InvalidHeaderValue {
		/// Setting name.
		setting: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the upstream API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the upstream API.")]
	Io(#[from] std::io::Error),
	/// Request could not be converted into the transport's native type.
	#[error("HTTP request could not be built.")]
	Http(#[from] http::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
