//! Error type shared by the session index, adapter and configuration.

use std::path::PathBuf;

use docsession_protocol::{ResourceIdError, TokenParseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
	#[error("malformed session token: {0}")]
	Token(#[from] TokenParseError),

	#[error("malformed resource id: {0}")]
	ResourceId(#[from] ResourceIdError),

	#[error("header `{header}` has malformed value `{value}`")]
	MalformedHeader { header: &'static str, value: String },

	#[error("invalid configuration in {}: {message}", path.display())]
	Config { path: PathBuf, message: String },

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
