//! Client entrypoint for the CSR build.

// Bin target reuses lib deps, silence noisy lint.
#![allow(unused_crate_dependencies)]

use leptos::prelude::*;
use log::{info, warn};
use rhizome_graph::{App, AppConfig, init_logging};

fn main() {
	let (config, problem) = match AppConfig::read() {
		Ok(Some(config)) => (config, None),
		Ok(None) => (AppConfig::default(), None),
		Err(err) => (AppConfig::default(), Some(err)),
	};
	init_logging(config.log_level());
	match problem {
		Some(err) => warn!("rhizome: {err}; using default configuration"),
		None => info!("rhizome: using {:?} backend", config.backend),
	}

	mount_to_body(move || {
		view! { <App config=config /> }
	})
}
