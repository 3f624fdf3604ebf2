use leptos::prelude::*;
use log::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlInputElement;

use crate::api::MemberRow;
use crate::components::family_graph::known_roles;

/// An avatar file picked in the form, already read into memory so the rest
/// of the pipeline never touches JS handles.
#[derive(Clone, Debug, PartialEq)]
pub struct AvatarPick {
	pub file_name: String,
	pub content_type: String,
	pub bytes: Vec<u8>,
}

/// Working copy of a member being added (`id: None`) or edited.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemberDraft {
	pub id: Option<String>,
	pub name: String,
	pub role: String,
	pub father_id: Option<String>,
	pub mother_id: Option<String>,
	pub spouse_id: Option<String>,
	pub avatar: Option<AvatarPick>,
	/// Carried through so an edit does not clear a persisted position or a
	/// kept avatar.
	pub pos_x: Option<f64>,
	pub pos_y: Option<f64>,
	pub avatar_url: Option<String>,
	pub avatar_path: Option<String>,
}

impl MemberDraft {
	pub fn from_row(row: &MemberRow) -> Self {
		Self {
			id: Some(row.id.clone()),
			name: row.name.clone(),
			role: row.role.clone().unwrap_or_default(),
			father_id: row.father_id.clone(),
			mother_id: row.mother_id.clone(),
			spouse_id: row.spouse_id.clone(),
			avatar: None,
			pos_x: row.pos_x,
			pos_y: row.pos_y,
			avatar_url: row.avatar_url.clone(),
			avatar_path: row.avatar_path.clone(),
		}
	}

	/// Client-side validation, run before any network call.
	pub fn validate(&self) -> Result<(), &'static str> {
		if self.name.trim().is_empty() {
			return Err("Name is required");
		}
		if self.role.trim().is_empty() {
			return Err("Role is required");
		}
		Ok(())
	}
}

/// Overlay form for adding and editing members. Hidden while `draft` is
/// `None`; the page owns the draft and the save/delete plumbing.
#[component]
pub fn MemberForm(
	draft: RwSignal<Option<MemberDraft>>,
	#[prop(into)] members: Signal<Vec<MemberRow>>,
	on_save: Callback<MemberDraft>,
	on_delete: Callback<String>,
	on_cancel: Callback<()>,
) -> impl IntoView {
	let field = move |f: fn(&MemberDraft) -> String| {
		move || draft.with(|d| d.as_ref().map(f).unwrap_or_default())
	};

	let on_file_change = move |ev: leptos::ev::Event| {
		let Some(input) = ev
			.target()
			.and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
		else {
			return;
		};
		let Some(file) = input.files().and_then(|files| files.get(0)) else {
			draft.update(|d| {
				if let Some(d) = d {
					d.avatar = None;
				}
			});
			return;
		};
		leptos::task::spawn_local(async move {
			let (file_name, content_type) = (file.name(), file.type_());
			match JsFuture::from(file.array_buffer()).await {
				Ok(buffer) => {
					let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
					draft.update(|d| {
						if let Some(d) = d {
							d.avatar = Some(AvatarPick {
								file_name,
								content_type,
								bytes,
							});
						}
					});
				}
				Err(err) => warn!("Reading avatar file failed: {err:?}"),
			}
		});
	};

	view! {
		<Show when=move || draft.with(|d| d.is_some())>
			<div class="edit-overlay">
				<h3>
					{move || {
						if draft.with(|d| d.as_ref().is_some_and(|d| d.id.is_some())) {
							"Edit member"
						} else {
							"Add member"
						}
					}}
				</h3>
				<label>
					"Name"
					<input
						type="text"
						prop:value=field(|d| d.name.clone())
						on:input=move |ev| {
							let value = event_target_value(&ev);
							draft.update(|d| {
								if let Some(d) = d {
									d.name = value;
								}
							});
						}
					/>
				</label>
				<label>
					"Role"
					<select
						prop:value=field(|d| d.role.clone())
						on:change=move |ev| {
							let value = event_target_value(&ev);
							draft.update(|d| {
								if let Some(d) = d {
									d.role = value;
								}
							});
						}
					>
						<option value="">"Select role"</option>
						{known_roles()
							.map(|role| view! { <option value=role>{role}</option> })
							.collect_view()}
					</select>
				</label>
				<RelationPicker
					label="Father"
					members=members
					draft=draft
					selected=Signal::derive(move || draft.with(|d| d.as_ref().and_then(|d| d.father_id.clone())))
					on_change=Callback::new(move |id| {
						draft.update(|d| {
							if let Some(d) = d {
								d.father_id = id;
							}
						});
					})
				/>
				<RelationPicker
					label="Mother"
					members=members
					draft=draft
					selected=Signal::derive(move || draft.with(|d| d.as_ref().and_then(|d| d.mother_id.clone())))
					on_change=Callback::new(move |id| {
						draft.update(|d| {
							if let Some(d) = d {
								d.mother_id = id;
							}
						});
					})
				/>
				<RelationPicker
					label="Spouse"
					members=members
					draft=draft
					selected=Signal::derive(move || draft.with(|d| d.as_ref().and_then(|d| d.spouse_id.clone())))
					on_change=Callback::new(move |id| {
						draft.update(|d| {
							if let Some(d) = d {
								d.spouse_id = id;
							}
						});
					})
				/>
				<label>
					"Avatar"
					<input type="file" accept="image/*" on:change=on_file_change />
				</label>
				<div class="edit-buttons">
					<button on:click=move |_| on_cancel.run(())>"Cancel"</button>
					<Show when=move || draft.with(|d| d.as_ref().is_some_and(|d| d.id.is_some()))>
						<button
							class="delete"
							on:click=move |_| {
								if let Some(id) = draft.with_untracked(|d| d.as_ref().and_then(|d| d.id.clone())) {
									on_delete.run(id);
								}
							}
						>
							"Delete"
						</button>
					</Show>
					<button
						class="primary"
						on:click=move |_| {
							if let Some(current) = draft.get_untracked() {
								on_save.run(current);
							}
						}
					>
						{move || {
							if draft.with(|d| d.as_ref().is_some_and(|d| d.id.is_some())) {
								"Save"
							} else {
								"Create"
							}
						}}
					</button>
				</div>
			</div>
		</Show>
	}
}

#[component]
fn RelationPicker(
	label: &'static str,
	#[prop(into)] members: Signal<Vec<MemberRow>>,
	draft: RwSignal<Option<MemberDraft>>,
	#[prop(into)] selected: Signal<Option<String>>,
	on_change: Callback<Option<String>>,
) -> impl IntoView {
	// A member cannot be their own relative.
	let candidates = move || {
		let own_id = draft.with(|d| d.as_ref().and_then(|d| d.id.clone()));
		members
			.get()
			.into_iter()
			.filter(|m| own_id.as_deref() != Some(m.id.as_str()))
			.collect::<Vec<_>>()
	};

	view! {
		<label>
			{label}
			<select on:change=move |ev| {
				let value = event_target_value(&ev);
				on_change.run((!value.is_empty()).then_some(value));
			}>
				<option value="" selected=move || selected.get().is_none()>"None"</option>
				<For
					each=candidates
					key=|m| m.id.clone()
					children=move |m| {
						let id = m.id.clone();
						let is_selected =
							move || selected.get().as_deref() == Some(id.as_str());
						view! {
							<option value=m.id.clone() selected=is_selected>{m.name.clone()}</option>
						}
					}
				/>
			</select>
		</label>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn validation_requires_name_and_role() {
		let mut draft = MemberDraft::default();
		assert_eq!(draft.validate(), Err("Name is required"));
		draft.name = "  ".into();
		assert_eq!(draft.validate(), Err("Name is required"));
		draft.name = "Ada".into();
		assert_eq!(draft.validate(), Err("Role is required"));
		draft.role = "mother".into();
		assert_eq!(draft.validate(), Ok(()));
	}

	#[test]
	fn draft_carries_position_and_avatar_through_edit() {
		let row = MemberRow {
			id: "1".into(),
			name: "Ada".into(),
			role: Some("mother".into()),
			pos_x: Some(500.0),
			pos_y: Some(500.0),
			avatar_url: Some("https://cdn/a.png".into()),
			avatar_path: Some("u/a.png".into()),
			..MemberRow::default()
		};
		let draft = MemberDraft::from_row(&row);
		assert_eq!(draft.id.as_deref(), Some("1"));
		assert_eq!((draft.pos_x, draft.pos_y), (Some(500.0), Some(500.0)));
		assert_eq!(draft.avatar_path.as_deref(), Some("u/a.png"));
		assert!(draft.avatar.is_none());
	}
}
