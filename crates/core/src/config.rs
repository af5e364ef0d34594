//! Construction-time configuration of the session index and adapter.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// Disables capture when set to `0`, `false` or `off`.
pub const CAPTURE_ENV: &str = "DOCSESSION_CAPTURE";
/// Overrides [`SessionConfig::host_name`].
pub const HOST_ENV: &str = "DOCSESSION_HOST";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
	/// Whether responses update the index at all.
	pub capture_enabled: bool,
	/// Endpoint host of the client, attached to log events.
	pub host_name: Option<String>,
	/// Attach session tokens to write requests too (multi-region writes).
	pub attach_to_writes: bool,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			capture_enabled: true,
			host_name: None,
			attach_to_writes: false,
		}
	}
}

impl SessionConfig {
	/// Configuration with capture turned off.
	pub fn capture_disabled() -> Self {
		Self {
			capture_enabled: false,
			..Self::default()
		}
	}

	/// Reads a JSON config file. A missing file yields the defaults.
	pub fn load(path: &Path) -> Result<Self> {
		let content = match fs::read_to_string(path) {
			Ok(content) => content,
			Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
			Err(err) => return Err(err.into()),
		};
		Self::from_json(&content).map_err(|err| SessionError::Config {
			path: path.to_path_buf(),
			message: err.to_string(),
		})
	}

	pub fn from_json(content: &str) -> Result<Self> {
		Ok(serde_json::from_str(content)?)
	}

	/// Applies `DOCSESSION_*` overrides from the process environment.
	pub fn with_env_overrides(self) -> Self {
		self.with_overrides(|key| std::env::var(key).ok())
	}

	/// Applies overrides from an arbitrary variable lookup.
	pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
		if let Some(value) = lookup(CAPTURE_ENV) {
			self.capture_enabled = !matches!(value.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off");
		}
		if let Some(host) = lookup(HOST_ENV).filter(|host| !host.is_empty()) {
			self.host_name = Some(host);
		}
		self
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	#[test]
	fn defaults_capture_on() {
		let config = SessionConfig::default();
		assert!(config.capture_enabled);
		assert!(!config.attach_to_writes);
		assert_eq!(config.host_name, None);
	}

	#[test]
	fn parses_camel_case_with_defaults() {
		let config = SessionConfig::from_json(r#"{"hostName": "acct.documents.example", "attachToWrites": true}"#).unwrap();
		assert!(config.capture_enabled);
		assert!(config.attach_to_writes);
		assert_eq!(config.host_name.as_deref(), Some("acct.documents.example"));
	}

	#[test]
	fn missing_file_yields_defaults() {
		let dir = tempfile::tempdir().unwrap();
		let config = SessionConfig::load(&dir.path().join("absent.json")).unwrap();
		assert_eq!(config, SessionConfig::default());
	}

	#[test]
	fn invalid_file_reports_path() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("session.json");
		fs::write(&path, "{ not json").unwrap();
		let err = SessionConfig::load(&path).unwrap_err();
		assert!(matches!(err, SessionError::Config { path: ref p, .. } if p == &path));
	}

	#[test]
	fn loads_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("session.json");
		fs::write(&path, r#"{"captureEnabled": false}"#).unwrap();
		assert!(!SessionConfig::load(&path).unwrap().capture_enabled);
	}

	#[test]
	fn overrides_toggle_capture_and_host() {
		let vars: HashMap<&str, &str> = [(CAPTURE_ENV, "Off"), (HOST_ENV, "eu.documents.example")].into_iter().collect();
		let config = SessionConfig::default().with_overrides(|key| vars.get(key).map(|v| v.to_string()));
		assert!(!config.capture_enabled);
		assert_eq!(config.host_name.as_deref(), Some("eu.documents.example"));

		let config = SessionConfig::capture_disabled().with_overrides(|key| (key == CAPTURE_ENV).then(|| "1".to_string()));
		assert!(config.capture_enabled);
	}
}
