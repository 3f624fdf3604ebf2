use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{debug, error, warn};
use uuid::Uuid;

use crate::api::{
	ApiError, AvatarStore, ChangeEvent, ChangeFeed, MemberRow, MemberStore, PostgrestClient,
	members::MEMBERS_TABLE, merge_saved,
};
use crate::components::family_graph::{FamilyGraphCanvas, PositionCommit};
use crate::components::member_form::{MemberDraft, MemberForm};
use crate::components::toast::{ToastTray, Toasts};
use crate::config::{BackendConfig, Session};
use crate::guard::{EditGuard, EditPass};

async fn save_member(
	store: &MemberStore,
	avatars: &AvatarStore,
	session: &Session,
	draft: MemberDraft,
) -> Result<MemberRow, ApiError> {
	let (avatar_url, avatar_path) = match draft.avatar {
		Some(pick) => {
			let uploaded = avatars
				.upload(session, &pick.file_name, pick.bytes, &pick.content_type)
				.await?;
			(Some(uploaded.url), Some(uploaded.path))
		}
		None => (draft.avatar_url, draft.avatar_path),
	};

	let row = MemberRow {
		id: draft.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
		user_id: session.user_id.clone(),
		name: draft.name.trim().to_string(),
		role: Some(draft.role),
		father_id: draft.father_id,
		mother_id: draft.mother_id,
		spouse_id: draft.spouse_id,
		pos_x: draft.pos_x,
		pos_y: draft.pos_y,
		avatar_url,
		avatar_path,
		created_at: None,
	};
	store.upsert(&row).await
}

/// The family tree page: canvas, member form, and the backend plumbing
/// between them.
#[component]
pub fn Home() -> impl IntoView {
	let session = use_context::<Session>().unwrap_or_default();
	let config = BackendConfig::load();
	let client = PostgrestClient::new(config.clone(), &session);
	let store = MemberStore::new(client.clone());
	let avatars = AvatarStore::new(client);
	let guard = EditGuard::new();
	let toasts = Toasts::new();

	let members = RwSignal::new(Vec::<MemberRow>::new());
	let loading = RwSignal::new(true);
	let draft = RwSignal::new(None::<MemberDraft>);
	// Held while the form is open; realtime reloads wait for it.
	let pass_slot = StoredValue::new(None::<EditPass>);

	let load_members = {
		let store = store.clone();
		move || {
			let store = store.clone();
			spawn_local(async move {
				loading.set(true);
				match store.load().await {
					Ok(rows) => members.set(rows),
					Err(err) => {
						// The view degrades to an empty tree, never crashes.
						error!("Loading members failed: {err}");
						members.set(Vec::new());
						toasts.push("Could not load family members");
					}
				}
				loading.set(false);
			});
		}
	};
	load_members();

	// Remote changes patch the snapshot in place; the open draft is a separate
	// signal, so an incremental change can never clobber it. Only a full
	// resync waits for the edit pass.
	match ChangeFeed::subscribe(&config, MEMBERS_TABLE, {
		let guard = guard.clone();
		let store = store.clone();
		let load_members = load_members.clone();
		move |change| match change {
			ChangeEvent::Upsert(row) => {
				let mut row = *row;
				store.resolve_avatar(&mut row);
				members.update(|rows| merge_saved(rows, row));
			}
			ChangeEvent::Delete(id) => {
				members.update(|rows| rows.retain(|r| r.id != id));
			}
			ChangeEvent::Resync => {
				if guard.is_open() {
					load_members();
				} else {
					debug!("Resync deferred while an edit is open");
				}
			}
		}
	}) {
		// Parked in the reactive arena so the subscription lives until the
		// page is disposed.
		Ok(feed) => {
			let _feed = StoredValue::new_local(feed);
		}
		Err(err) => warn!("Realtime subscription unavailable: {err}"),
	}

	let close_form = move || {
		draft.set(None);
		pass_slot.set_value(None);
	};

	let on_commit = Callback::new({
		let store = store.clone();
		move |commit: PositionCommit| {
			// Pin the node locally so relayout leaves it alone, then fire the
			// single write for this drag.
			members.update(|rows| {
				if let Some(row) = rows.iter_mut().find(|r| r.id == commit.id) {
					row.pos_x = Some(commit.x);
					row.pos_y = Some(commit.y);
				}
			});
			let store = store.clone();
			spawn_local(async move {
				if let Err(err) = store.update_position(&commit.id, commit.x, commit.y).await {
					error!("Position update failed: {err}");
					toasts.push("Saving the new position failed");
				}
			});
		}
	});

	let open_editor = {
		let guard = guard.clone();
		move |d: MemberDraft| {
			pass_slot.set_value(Some(guard.acquire()));
			draft.set(Some(d));
		}
	};

	let on_edit = Callback::new({
		let open_editor = open_editor.clone();
		move |id: String| {
			let row = members.with_untracked(|rows| rows.iter().find(|r| r.id == id).cloned());
			match row {
				Some(row) => open_editor(MemberDraft::from_row(&row)),
				None => warn!("Edit requested for unknown member {id}"),
			}
		}
	});

	let on_add = Callback::new(move |()| open_editor(MemberDraft::default()));

	let on_save = Callback::new({
		let store = store.clone();
		let avatars = avatars.clone();
		let session = session.clone();
		move |current: MemberDraft| {
			if let Err(message) = current.validate() {
				toasts.push(message);
				return;
			}
			let (store, avatars, session) = (store.clone(), avatars.clone(), session.clone());
			spawn_local(async move {
				match save_member(&store, &avatars, &session, current).await {
					Ok(saved) => {
						members.update(|rows| merge_saved(rows, saved));
						close_form();
						toasts.push("Member saved");
					}
					Err(err) => {
						error!("Saving member failed: {err}");
						toasts.push("Saving the member failed");
					}
				}
			});
		}
	});

	let on_delete = Callback::new({
		let store = store.clone();
		let avatars = avatars.clone();
		move |id: String| {
			let confirmed = web_sys::window()
				.map(|w| {
					w.confirm_with_message("Delete this member?")
						.unwrap_or(false)
				})
				.unwrap_or(false);
			if !confirmed {
				return;
			}
			let avatar_path = members.with_untracked(|rows| {
				rows.iter()
					.find(|r| r.id == id)
					.and_then(|r| r.avatar_path.clone())
			});
			let (store, avatars) = (store.clone(), avatars.clone());
			spawn_local(async move {
				match store.remove(&id).await {
					Ok(()) => {
						members.update(|rows| rows.retain(|r| r.id != id));
						close_form();
						toasts.push("Member deleted");
						// Best effort only; the row is already gone.
						if let Some(path) = avatar_path
							&& let Err(err) = avatars.delete(&path).await
						{
							warn!("Avatar cleanup failed after delete: {err}");
						}
					}
					Err(err) => {
						error!("Deleting member failed: {err}");
						toasts.push("Deleting the member failed");
					}
				}
			});
		}
	});

	let on_cancel = Callback::new(move |()| close_form());

	view! {
		<div class="tree-page">
			<FamilyGraphCanvas
				members=members
				loading=loading
				on_commit=on_commit
				on_edit=on_edit
				on_add=on_add
			/>
			<MemberForm
				draft=draft
				members=members
				on_save=on_save
				on_delete=on_delete
				on_cancel=on_cancel
			/>
			<ToastTray toasts=toasts />
		</div>
	}
}
