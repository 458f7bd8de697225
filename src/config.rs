//! App configuration embedded in the host page.
//!
//! The page may carry a `<script type="application/json" id="rhizome-config">`
//! element. Every field is optional; a missing element yields the defaults.
//!
//! ```json
//! {
//!   "backend": { "kind": "remote", "baseUrl": "http://localhost:8080/api" },
//!   "linkMode": "combined",
//!   "logLevel": "info",
//!   "layout": { "settleDelayMs": 1000, "freezeDelayMs": 3000 }
//! }
//! ```

use std::str::FromStr;

use log::Level;
use serde::Deserialize;
use wasm_bindgen::JsCast;
use web_sys::HtmlScriptElement;

use crate::error::ConfigError;
use crate::graph::{ProjectorConfig, StabilizerConfig};
use crate::notes::LinkMode;
use crate::store::DEFAULT_STORAGE_KEY;

/// DOM id of the configuration script element.
pub const CONFIG_ELEMENT_ID: &str = "rhizome-config";

/// Base URL of the article API when none is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

fn default_storage_key() -> String {
	DEFAULT_STORAGE_KEY.to_string()
}

fn default_base_url() -> String {
	DEFAULT_API_BASE_URL.to_string()
}

/// Which [`NoteStore`](crate::store::NoteStore) backs the app.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
	/// Browser `localStorage`.
	Local {
		/// Storage key: `articles` for articles, `memos` for memos.
		#[serde(default = "default_storage_key")]
		key: String,
	},
	/// The HTTP article API.
	Remote {
		/// API root, without `/articles`.
		#[serde(default = "default_base_url", rename = "baseUrl")]
		base_url: String,
	},
}

impl Default for BackendConfig {
	fn default() -> Self {
		BackendConfig::Local {
			key: default_storage_key(),
		}
	}
}

/// Settings embedded in the page as JSON. Every field is optional.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
	/// Note source.
	pub backend: BackendConfig,
	/// Which link encodings become edges.
	pub link_mode: LinkMode,
	/// `log` level name, e.g. `debug`.
	pub log_level: String,
	/// Layout phase timings.
	pub layout: StabilizerConfig,
	/// Node weight constants.
	pub projector: ProjectorConfig,
	/// Document title.
	pub title: String,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			backend: BackendConfig::default(),
			link_mode: LinkMode::default(),
			log_level: "info".into(),
			layout: StabilizerConfig::default(),
			projector: ProjectorConfig::default(),
			title: "Rhizome".into(),
		}
	}
}

impl AppConfig {
	/// Parses and validates a JSON configuration document.
	pub fn from_json(json: &str) -> Result<Self, ConfigError> {
		let config: AppConfig = serde_json::from_str(json)?;
		config.validate()?;
		Ok(config)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		match &self.backend {
			BackendConfig::Local { key } if key.trim().is_empty() => {
				return Err(ConfigError::Invalid("backend.key must not be empty".into()));
			}
			BackendConfig::Remote { base_url } if base_url.trim().is_empty() => {
				return Err(ConfigError::Invalid("backend.baseUrl must not be empty".into()));
			}
			_ => {}
		}
		for (name, value) in [
			("layout.settleDelayMs", self.layout.settle_delay_ms),
			("layout.freezeDelayMs", self.layout.freeze_delay_ms),
		] {
			if !value.is_finite() || value < 0.0 {
				return Err(ConfigError::Invalid(format!(
					"{name} must be a non-negative number of milliseconds"
				)));
			}
		}
		Level::from_str(&self.log_level)
			.map_err(|_| ConfigError::Invalid(format!("unknown log level {:?}", self.log_level)))?;
		Ok(())
	}

	/// The configured log level, `Info` if unparseable.
	pub fn log_level(&self) -> Level {
		Level::from_str(&self.log_level).unwrap_or(Level::Info)
	}

	/// Reads the configuration element from the current document.
	/// `Ok(None)` means the page carries no configuration.
	pub fn read() -> Result<Option<Self>, ConfigError> {
		let Some(element) = web_sys::window()
			.and_then(|window| window.document())
			.and_then(|document| document.get_element_by_id(CONFIG_ELEMENT_ID))
		else {
			return Ok(None);
		};
		let script: HtmlScriptElement = element
			.dyn_into()
			.map_err(|_| ConfigError::Invalid(format!("#{CONFIG_ELEMENT_ID} is not a script element")))?;
		let text = script
			.text()
			.map_err(|err| ConfigError::Invalid(format!("unreadable config element: {err:?}")))?;
		if text.trim().is_empty() {
			return Ok(None);
		}
		Self::from_json(&text).map(Some)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		let config = AppConfig::from_json("{}").unwrap();
		assert_eq!(config, AppConfig::default());
		assert_eq!(
			config.backend,
			BackendConfig::Local {
				key: "articles".into()
			}
		);
		assert_eq!(config.link_mode, LinkMode::Structured);
		assert_eq!(config.layout.settle_delay_ms, 1000.0);
		assert_eq!(config.log_level(), Level::Info);
	}

	#[test]
	fn remote_backend_and_overrides() {
		let config = AppConfig::from_json(
			r#"{
				"backend": {"kind": "remote"},
				"linkMode": "combined",
				"logLevel": "debug",
				"layout": {"freezeDelayMs": 500},
				"projector": {"weightPerLink": 1.0},
				"title": "Articles"
			}"#,
		)
		.unwrap();
		assert_eq!(
			config.backend,
			BackendConfig::Remote {
				base_url: DEFAULT_API_BASE_URL.into()
			}
		);
		assert_eq!(config.link_mode, LinkMode::Combined);
		assert_eq!(config.log_level(), Level::Debug);
		assert_eq!(config.layout.freeze_delay_ms, 500.0);
		assert_eq!(config.layout.settle_delay_ms, 1000.0);
		assert_eq!(config.projector.weight_per_link, 1.0);
		assert_eq!(config.projector.base_weight, 1.0);
		assert_eq!(config.title, "Articles");
	}

	#[test]
	fn custom_remote_url() {
		let config =
			AppConfig::from_json(r#"{"backend": {"kind": "remote", "baseUrl": "https://notes.example/api"}}"#)
				.unwrap();
		assert!(matches!(
			config.backend,
			BackendConfig::Remote { ref base_url } if base_url == "https://notes.example/api"
		));
	}

	#[test]
	fn invalid_documents_are_rejected() {
		assert!(matches!(AppConfig::from_json("nope"), Err(ConfigError::Parse(_))));
		assert!(matches!(
			AppConfig::from_json(r#"{"backend": {"kind": "cloud"}}"#),
			Err(ConfigError::Parse(_))
		));
		assert!(matches!(
			AppConfig::from_json(r#"{"backend": {"kind": "local", "key": " "}}"#),
			Err(ConfigError::Invalid(_))
		));
		assert!(matches!(
			AppConfig::from_json(r#"{"layout": {"settleDelayMs": -5}}"#),
			Err(ConfigError::Invalid(_))
		));
		assert!(matches!(
			AppConfig::from_json(r#"{"logLevel": "loud"}"#),
			Err(ConfigError::Invalid(_))
		));
	}
}
