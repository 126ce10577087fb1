//! Structured API errors (REST error bodies and GraphQL `errors` arrays).

// self
use crate::_prelude::*;

/// Decoded error body returned by the upstream API.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
	/// Top-level message.
	#[serde(default)]
	pub message: String,
	/// Link to the relevant documentation page.
	#[serde(default)]
	pub documentation_url: Option<String>,
	/// Field-level details.
	#[serde(default)]
	pub errors: Vec<ApiErrorDetail>,
}
impl ApiError {
	/// Synthesizes an error from a GraphQL `errors` array.
	///
	/// GraphQL reports failures inside an HTTP 200, so the envelope decoder turns them into
	/// the same shape REST errors use.
	pub fn from_graphql(errors: Vec<GraphQlError>) -> Self {
		let message =
			errors.iter().map(|error| error.message.as_str()).collect::<Vec<_>>().join("; ");
		let errors = errors
			.into_iter()
			.map(|error| ApiErrorDetail {
				resource: None,
				field: error.path.map(|path| {
					path.iter()
						.map(|segment| match segment {
							serde_json::Value::String(s) => s.clone(),
							other => other.to_string(),
						})
						.collect::<Vec<_>>()
						.join(".")
				}),
				code: error.kind,
				message: Some(error.message),
			})
			.collect();

		Self { message, documentation_url: None, errors }
	}
}
impl Display for ApiError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.message)
	}
}

/// One entry of an error body's `errors` array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDetail")]
pub struct ApiErrorDetail {
	/// Resource type the error refers to.
	pub resource: Option<String>,
	/// Offending field (or GraphQL path).
	pub field: Option<String>,
	/// Machine-readable code (`missing_field`, `already_exists`, GraphQL `type`).
	pub code: Option<String>,
	/// Human-readable message.
	pub message: Option<String>,
}

// Some endpoints return plain strings in `errors` instead of objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDetail {
	Text(String),
	Object {
		#[serde(default)]
		resource: Option<String>,
		#[serde(default)]
		field: Option<String>,
		#[serde(default)]
		code: Option<String>,
		#[serde(default)]
		message: Option<String>,
	},
}
impl From<RawDetail> for ApiErrorDetail {
	fn from(raw: RawDetail) -> Self {
		match raw {
			RawDetail::Text(message) => Self { message: Some(message), ..Self::default() },
			RawDetail::Object { resource, field, code, message } =>
				Self { resource, field, code, message },
		}
	}
}

/// One entry of a GraphQL `errors` array.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQlError {
	/// Error message.
	pub message: String,
	/// GraphQL error type (`NOT_FOUND`, `FORBIDDEN`, ...).
	#[serde(default, rename = "type")]
	pub kind: Option<String>,
	/// Path into the response data.
	#[serde(default)]
	pub path: Option<Vec<serde_json::Value>>,
}
