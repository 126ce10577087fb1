//! Payload formats the pipeline knows how to decode.
//!
//! A format is a zero-sized marker chosen per call: [`Json`] for ordinary REST payloads,
//! [`Raw`] for byte blobs, [`Exists`] for endpoints that answer with 204/404, and
//! [`GraphQl`] for the `{data, errors}` envelope.

// std
use std::marker::PhantomData;
// crates.io
use http::StatusCode;
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	config::GatewayConfig,
	response::{ApiError, GraphQlError},
};

/// Decoded body of a successful response.
#[derive(Debug)]
pub struct Decoded<T> {
	/// Typed payload, if the body carried one.
	pub payload: Option<T>,
	/// Error synthesized from a successful envelope (GraphQL `errors`).
	pub error: Option<ApiError>,
}
impl<T> Decoded<T> {
	fn payload(payload: T) -> Self {
		Self { payload: Some(payload), error: None }
	}

	fn empty() -> Self {
		Self { payload: None, error: None }
	}
}

/// How a successful response body becomes a typed payload.
pub trait PayloadFormat {
	/// Payload type exposed on the response.
	type Output: 'static + Send;

	/// `Accept` header the format needs, overriding the configured JSON default.
	fn accept(config: &GatewayConfig) -> Option<&str> {
		let _ = config;

		None
	}

	/// Decodes the body of a successful, non-304 response.
	fn decode(status: StatusCode, body: &[u8]) -> Result<Decoded<Self::Output>>;
}

/// Generic JSON payload.
#[derive(Debug)]
pub struct Json<T>(PhantomData<fn() -> T>);
impl<T> PayloadFormat for Json<T>
where
	T: 'static + Send + DeserializeOwned,
{
	type Output = T;

	fn decode(status: StatusCode, body: &[u8]) -> Result<Decoded<T>> {
		if body.iter().all(u8::is_ascii_whitespace) {
			return Ok(Decoded::empty());
		}

		decode_json(status, body).map(Decoded::payload)
	}
}

/// Raw byte payload (file contents, archives).
#[derive(Debug)]
pub struct Raw;
impl PayloadFormat for Raw {
	type Output = Vec<u8>;

	fn accept(config: &GatewayConfig) -> Option<&str> {
		Some(&config.raw_accept)
	}

	fn decode(_: StatusCode, body: &[u8]) -> Result<Decoded<Vec<u8>>> {
		Ok(Decoded::payload(body.to_vec()))
	}
}

/// Existence check: a successful response (typically `204 No Content`) means `true`.
///
/// A 404 is an ordinary failed response; callers read a missing payload as `false`.
#[derive(Debug)]
pub struct Exists;
impl PayloadFormat for Exists {
	type Output = bool;

	fn decode(status: StatusCode, _: &[u8]) -> Result<Decoded<bool>> {
		Ok(Decoded::payload(status.is_success()))
	}
}

/// GraphQL `{data, errors}` envelope.
///
/// Errors inside a 200 response become [`ApiError`] detail while `data` (often partial) is
/// still decoded.
#[derive(Debug)]
pub struct GraphQl<T>(PhantomData<fn() -> T>);
impl<T> PayloadFormat for GraphQl<T>
where
	T: 'static + Send + DeserializeOwned,
{
	type Output = T;

	fn decode(status: StatusCode, body: &[u8]) -> Result<Decoded<T>> {
		#[derive(Deserialize)]
		#[serde(bound = "T: DeserializeOwned")]
		struct Envelope<T> {
			#[serde(default)]
			data: Option<T>,
			#[serde(default)]
			errors: Option<Vec<GraphQlError>>,
		}

		let envelope = decode_json::<Envelope<T>>(status, body)?;
		let error = envelope.errors.filter(|errors| !errors.is_empty()).map(ApiError::from_graphql);

		Ok(Decoded { payload: envelope.data, error })
	}
}

fn decode_json<T>(status: StatusCode, body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::Decode { status: status.as_u16(), source })
}
