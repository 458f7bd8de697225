//! Read-only side panel for the note picked in the graph.

use leptos::prelude::*;
use web_sys::MouseEvent;

use crate::notes::{Note, related_notes};

/// What the last node click resolved to.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Selection {
	/// No node clicked yet, or the panel was closed.
	#[default]
	Nothing,
	/// The clicked node's note.
	Note(Note),
	/// The clicked node's note has since disappeared from the collection.
	Missing,
}

impl From<Option<Note>> for Selection {
	fn from(note: Option<Note>) -> Self {
		note.map_or(Selection::Missing, Selection::Note)
	}
}

/// Shows the selected note with its resolved related notes. Clicking a
/// related note selects it; the close button clears the selection.
#[component]
pub fn NotePanel(
	/// What to show.
	#[prop(into)]
	selection: Signal<Selection>,
	/// Collection used to resolve related notes.
	#[prop(into)]
	notes: Signal<Vec<Note>>,
	/// Called when a related note is clicked or the panel is closed.
	#[prop(into)]
	on_select: Callback<Selection>,
) -> impl IntoView {
	let close = move |_: MouseEvent| on_select.run(Selection::Nothing);

	move || match selection.get() {
		Selection::Nothing => ().into_any(),
		Selection::Missing => view! {
			<aside class="note-panel missing">
				<button class="close" on:click=close>"×"</button>
				<p>"This note no longer exists."</p>
			</aside>
		}
		.into_any(),
		Selection::Note(note) => {
			let related: Vec<Note> = notes.with(|all| related_notes(&note, all).into_iter().cloned().collect());
			let related_view = related
				.into_iter()
				.map(|other| {
					let title = other.title.clone();
					view! {
						<li>
							<a href="#" on:click=move |ev| {
								ev.prevent_default();
								on_select.run(Selection::Note(other.clone()));
							}>{title}</a>
						</li>
					}
				})
				.collect_view();
			let updated = (!note.updated_at.is_empty()).then(|| note.updated_at.clone());

			view! {
				<aside class="note-panel">
					<button class="close" on:click=close>"×"</button>
					<h2>{note.title.clone()}</h2>
					{updated.map(|at| view! { <p class="timestamp">"Updated " {at}</p> })}
					<div class="content">{note.content.clone()}</div>
					<h3>"Related"</h3>
					<ul class="related">{related_view}</ul>
				</aside>
			}
			.into_any()
		}
	}
}
