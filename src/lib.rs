//! rhizome-graph: a note link graph with a self-stabilizing force layout.
//!
//! Notes come from a [`store::NoteStore`] backend, their links are resolved
//! and projected into a node-link graph, and the graph is laid out by a force
//! simulation that settles and then freezes until the notes change.

use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_meta::*;
use log::{Level, error, info, warn};

pub mod components;
pub mod config;
pub mod error;
pub mod graph;
pub mod notes;
pub mod store;

pub use components::force_graph::ForceGraphCanvas;
pub use components::note_panel::{NotePanel, Selection};
pub use config::{AppConfig, BackendConfig};
pub use error::{ConfigError, StoreError};
pub use notes::{Note, NoteDraft};

use notes::find_by_id;
use store::{BrowserStorage, LocalNoteStore, MemoryStorage, NoteStore, RemoteNoteStore, StorageWatcher};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging(level: Level) {
	let _ = console_log::init_with_level(level);
	console_error_panic_hook::set_once();
	info!("rhizome: logging initialized at {level}");
}

/// Opens the configured backend. When the browser refuses `localStorage` the
/// local backend falls back to memory, so the session works but nothing
/// persists.
pub fn open_store(backend: &BackendConfig) -> Result<Rc<dyn NoteStore>, StoreError> {
	match backend {
		BackendConfig::Local { key } => match LocalNoteStore::open(BrowserStorage::new(), key.as_str()) {
			Ok(store) => Ok(Rc::new(store)),
			Err(err) => {
				warn!("rhizome: {err}; notes will only live in memory");
				Ok(Rc::new(LocalNoteStore::open(MemoryStorage::new(), key.as_str())?))
			}
		},
		BackendConfig::Remote { base_url } => Ok(Rc::new(RemoteNoteStore::new(base_url.as_str()))),
	}
}

/// Progress of the most recent fetch.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadStatus {
	/// A fetch is outstanding.
	Loading,
	/// Notes are shown, possibly none.
	Ready,
	/// The backend answered with an error that is not a plain read failure.
	Failed(String),
}

/// Main application component: loads the notes and shows the graph with a
/// detail panel for the clicked note.
#[component]
pub fn App(#[prop(optional)] config: AppConfig) -> impl IntoView {
	provide_meta_context();

	let notes = RwSignal::new(Vec::<Note>::new());
	let status = RwSignal::new(LoadStatus::Loading);
	let selection = RwSignal::new(Selection::Nothing);

	let store = match open_store(&config.backend) {
		Ok(store) => Some(store),
		Err(err) => {
			error!("rhizome: cannot open note store: {err}");
			status.set(LoadStatus::Failed(err.to_string()));
			None
		}
	};

	let reload = move || {
		let Some(store) = store.clone() else {
			return;
		};
		spawn_local(async move {
			match store.list().await {
				Ok(list) => {
					info!("rhizome: loaded {} notes", list.len());
					notes.set(list);
					status.set(LoadStatus::Ready);
				}
				Err(err) if err.is_read_failure() => {
					warn!("rhizome: failed to read notes, showing none: {err}");
					notes.set(Vec::new());
					status.set(LoadStatus::Ready);
				}
				Err(err) => {
					error!("rhizome: failed to load notes: {err}");
					status.set(LoadStatus::Failed(err.to_string()));
				}
			}
		});
	};

	// Keep the open note in step with the collection.
	Effect::new(move |_| {
		let current = notes.get();
		selection.update(|selected| {
			if let Selection::Note(note) = selected {
				let fresh = find_by_id(&current, &note.id).cloned();
				if fresh.as_ref() != Some(&*note) {
					*selected = Selection::from(fresh);
				}
			}
		});
	});

	if let BackendConfig::Local { key } = &config.backend {
		let on_change = reload.clone();
		match StorageWatcher::subscribe(key.as_str(), on_change) {
			Ok(watcher) => watcher.detach(),
			Err(err) => warn!("rhizome: changes from other tabs will not show: {err}"),
		}
	}
	reload();

	let on_node_click = Callback::new(move |note: Option<Note>| selection.set(Selection::from(note)));
	let on_select = Callback::new(move |selected: Selection| selection.set(selected));
	let title = config.title.clone();

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />
		<Title text=title.clone() />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-graph">
			<ForceGraphCanvas
				notes=notes
				on_node_click=on_node_click
				link_mode=config.link_mode
				projector=config.projector
				layout=config.layout
				fullscreen=true
			/>
			<div class="graph-overlay">
				<h1>{title}</h1>
				<p class="subtitle">"Click a note to open it. Scroll to zoom. Drag the background to pan."</p>
				{move || match status.get() {
					LoadStatus::Loading => Some(view! { <p class="status">"Loading notes…"</p> }.into_any()),
					LoadStatus::Failed(message) => Some(
						view! { <p class="status error">"Failed to load notes: " {message}</p> }.into_any(),
					),
					LoadStatus::Ready => None,
				}}
			</div>
			<NotePanel selection=selection notes=notes on_select=on_select />
		</div>
	}
}
