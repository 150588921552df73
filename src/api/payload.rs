//! Untyped JSON response documents with scalar-as-text field access.

// std
use std::borrow::Cow;
// crates.io
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, api::ErrorSignal};

/// Untyped JSON object returned by API endpoints.
///
/// Field lookups mirror how the API is consumed: scalar fields are read as text regardless of
/// whether the server encoded them as strings, numbers, or booleans.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);
impl Payload {
	/// Parses a response body, requiring a top-level JSON object.
	pub fn parse(bytes: &[u8]) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
		let mut de = serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(&mut de)
	}

	/// Returns the raw JSON value stored under `key`.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	/// Reads a scalar field as text; `null`, arrays, and objects yield `None`.
	pub fn text(&self, key: &str) -> Option<Cow<'_, str>> {
		match self.0.get(key)? {
			Value::String(value) => Some(Cow::Borrowed(value.as_str())),
			Value::Number(value) => Some(Cow::Owned(value.to_string())),
			Value::Bool(value) => Some(Cow::Owned(value.to_string())),
			_ => None,
		}
	}

	/// Returns the non-empty `error` field, if present.
	pub fn error(&self) -> Option<&str> {
		match self.0.get("error") {
			Some(Value::String(value)) if !value.is_empty() => Some(value.as_str()),
			_ => None,
		}
	}

	/// Returns the `status` field, if present.
	pub fn status(&self) -> Option<Cow<'_, str>> {
		self.text("status")
	}

	/// Returns `true` when `status` equals `success` (case-insensitive).
	pub fn is_success(&self) -> bool {
		self.status().is_some_and(|status| status.eq_ignore_ascii_case("success"))
	}

	/// Classifies the `error` field.
	pub fn signal(&self) -> ErrorSignal {
		ErrorSignal::classify(self.error())
	}

	/// Borrows the underlying JSON object.
	pub fn as_map(&self) -> &Map<String, Value> {
		&self.0
	}

	/// Consumes the payload, returning the underlying JSON object.
	pub fn into_inner(self) -> Map<String, Value> {
		self.0
	}
}
impl From<Map<String, Value>> for Payload {
	fn from(map: Map<String, Value>) -> Self {
		Self(map)
	}
}
impl FromStr for Payload {
	type Err = serde_path_to_error::Error<serde_json::Error>;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s.as_bytes())
	}
}
