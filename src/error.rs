//! Error types for note storage and app configuration.
//!
//! Nothing here is fatal: every store failure ends in a degraded view (an empty
//! graph or an inline message), never a panic.

use thiserror::Error;

/// Failures raised by a [`NoteStore`](crate::store::NoteStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
	/// No note with this id.
	#[error("note not found: {0}")]
	NotFound(String),

	/// Stored or received data is not valid JSON of the expected shape.
	#[error("failed to parse note data: {0}")]
	Parse(#[from] serde_json::Error),

	/// The article service reported a failure.
	#[error("remote service returned {code}: {message}")]
	Remote {
		/// Error code from the envelope, or the HTTP status.
		code: String,
		/// Description from the service.
		message: String,
	},

	/// The request never got a usable answer.
	#[error("transport failure: {0}")]
	Transport(#[from] reqwest::Error),

	/// The key-value medium failed or is closed.
	#[error("storage backend error: {0}")]
	Storage(String),

	/// A draft failed validation.
	#[error("invalid note draft: {0}")]
	InvalidDraft(String),

	/// Another note already uses the requested external id.
	#[error("external id already in use: {0}")]
	DuplicateExternalId(String),
}

impl StoreError {
	/// True for errors that mean "this note does not exist".
	pub fn is_not_found(&self) -> bool {
		matches!(self, StoreError::NotFound(_))
	}

	/// True for local read failures that should degrade to an empty
	/// collection. Transport and remote failures are surfaced instead, so an
	/// unreachable service never looks like an empty one.
	pub fn is_read_failure(&self) -> bool {
		matches!(self, StoreError::Parse(_) | StoreError::Storage(_))
	}
}

/// Failures while reading the embedded app configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
	/// The config element is not valid JSON.
	#[error("failed to parse config: {0}")]
	Parse(#[from] serde_json::Error),

	/// The config parsed but holds an unusable value.
	#[error("invalid configuration: {0}")]
	Invalid(String),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_local_read_failures_degrade() {
		let parse = serde_json::from_str::<Vec<u8>>("not json").unwrap_err();
		assert!(StoreError::Parse(parse).is_read_failure());
		assert!(StoreError::Storage("quota".into()).is_read_failure());

		let remote = StoreError::Remote {
			code: "E500".into(),
			message: "boom".into(),
		};
		assert!(!remote.is_read_failure());

		let transport = reqwest::Client::new().get("not a url").build().unwrap_err();
		assert!(!StoreError::Transport(transport).is_read_failure());
	}
}
