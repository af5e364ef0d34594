//! Response header bag and the header names relevant to session tracking.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Session token of the range that served the request (`<rangeId>:<token>`).
pub const SESSION_TOKEN: &str = "x-ms-session-token";
/// Full name of the collection that actually served the request.
pub const OWNER_FULL_NAME: &str = "x-ms-alt-content-path";
/// Resource id of the collection that actually served the request.
pub const OWNER_ID: &str = "x-ms-owner-id";
/// Service-specific refinement of the HTTP status.
pub const SUB_STATUS: &str = "x-ms-substatus";

/// Sub-status sent with a 404 when the owning collection no longer exists.
pub const SUB_STATUS_OWNER_RESOURCE_NOT_FOUND: u32 = 1003;

/// Case-insensitive header bag of a response.
///
/// Names are stored lowercased. Empty values read as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct ResponseHeaders {
	entries: BTreeMap<String, String>,
}

impl ResponseHeaders {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a header, replacing any previous value.
	pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
		self.insert(name, value);
		self
	}

	pub fn insert(&mut self, name: &str, value: impl Into<String>) {
		self.entries.insert(name.to_ascii_lowercase(), value.into());
	}

	pub fn remove(&mut self, name: &str) -> Option<String> {
		self.entries.remove(&name.to_ascii_lowercase())
	}

	pub fn get(&self, name: &str) -> Option<&str> {
		self.entries
			.get(&name.to_ascii_lowercase())
			.map(String::as_str)
			.filter(|value| !value.is_empty())
	}

	pub fn session_token(&self) -> Option<&str> {
		self.get(SESSION_TOKEN)
	}

	pub fn owner_full_name(&self) -> Option<&str> {
		self.get(OWNER_FULL_NAME)
	}

	pub fn owner_id(&self) -> Option<&str> {
		self.get(OWNER_ID)
	}

	/// Parsed sub-status; unparseable values read as absent.
	pub fn sub_status(&self) -> Option<u32> {
		self.get(SUB_STATUS).and_then(|value| value.trim().parse().ok())
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().map(|(name, value)| (name.as_str(), value.as_str()))
	}
}

impl From<BTreeMap<String, String>> for ResponseHeaders {
	fn from(entries: BTreeMap<String, String>) -> Self {
		entries.into_iter().collect()
	}
}

impl From<ResponseHeaders> for BTreeMap<String, String> {
	fn from(headers: ResponseHeaders) -> Self {
		headers.entries
	}
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for ResponseHeaders {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut headers = Self::new();
		for (name, value) in iter {
			headers.insert(name.as_ref(), value);
		}
		headers
	}
}
