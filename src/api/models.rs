//! Wire models for the resource wrappers.
//!
//! Only the fields the gateway's callers read are modeled; unknown fields are ignored.

// self
use crate::_prelude::*;

/// Account reference embedded in most payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	/// Numeric account id.
	pub id: u64,
	/// Login name.
	pub login: String,
}

/// Repository label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
	/// Numeric label id.
	pub id: u64,
	/// Display name; unique per repository.
	pub name: String,
	/// Hex color without the leading `#`.
	pub color: String,
	/// Optional description.
	#[serde(default)]
	pub description: Option<String>,
}

/// Issue state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
	#[allow(missing_docs)]
	Open,
	#[allow(missing_docs)]
	Closed,
}

/// Issue or pull request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
	/// Global id.
	pub id: u64,
	/// Repository-scoped number.
	pub number: u64,
	/// Title.
	pub title: String,
	/// Open or closed.
	pub state: IssueState,
	/// Markdown body.
	#[serde(default)]
	pub body: Option<String>,
	/// Author; `None` for deleted accounts.
	#[serde(default)]
	pub user: Option<User>,
	/// Applied labels.
	#[serde(default)]
	pub labels: Vec<Label>,
	/// Last update.
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}

/// Comment on an issue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueComment {
	/// Comment id; stable across edits.
	pub id: u64,
	/// Markdown body.
	#[serde(default)]
	pub body: Option<String>,
	/// Author; `None` for deleted accounts.
	#[serde(default)]
	pub user: Option<User>,
	/// Creation instant.
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}
