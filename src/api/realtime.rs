//! Push-based change notifications over the backend's Phoenix-style
//! WebSocket. Change frames carry the affected record, so subscribers can
//! patch their local snapshot in place instead of reloading everything.

use std::cell::Cell;
use std::rc::Rc;

use log::{debug, warn};
use serde_json::json;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, MessageEvent, WebSocket};

use super::error::ApiError;
use super::members::MemberRow;
use crate::config::BackendConfig;

const HEARTBEAT_MS: i32 = 30_000;

fn topic(table: &str) -> String {
	format!("realtime:public:{table}")
}

fn join_message(table: &str) -> String {
	json!({
		"topic": topic(table),
		"event": "phx_join",
		"payload": {
			"config": {
				"postgres_changes": [
					{ "event": "*", "schema": "public", "table": table }
				]
			}
		},
		"ref": "1"
	})
	.to_string()
}

fn heartbeat_message(reference: u64) -> String {
	json!({
		"topic": "phoenix",
		"event": "heartbeat",
		"payload": {},
		"ref": reference.to_string()
	})
	.to_string()
}

/// One row change delivered by the feed.
#[derive(Clone, Debug, PartialEq)]
pub enum ChangeEvent {
	/// A row was inserted or updated; the frame carries the new row.
	Upsert(Box<MemberRow>),
	/// A row was deleted; only its id survives in the frame.
	Delete(String),
	/// A change frame without a usable record; the snapshot must be
	/// re-fetched to catch up.
	Resync,
}

/// Extract the row change from a frame, or `None` for protocol chatter
/// (join replies, heartbeat acks).
fn parse_change(raw: &str) -> Option<ChangeEvent> {
	let frame: serde_json::Value = serde_json::from_str(raw).ok()?;
	if frame.get("event").and_then(|e| e.as_str()) != Some("postgres_changes") {
		return None;
	}
	let data = frame.pointer("/payload/data")?;
	match data.get("type").and_then(|t| t.as_str()) {
		Some("INSERT") | Some("UPDATE") => {
			match data.get("record").cloned().map(serde_json::from_value) {
				Some(Ok(row)) => Some(ChangeEvent::Upsert(Box::new(row))),
				// Replication settings can strip the record down.
				_ => Some(ChangeEvent::Resync),
			}
		}
		// Deletes replicate only the primary key by default.
		Some("DELETE") => Some(
			data.pointer("/old_record/id")
				.and_then(|id| id.as_str())
				.map(|id| ChangeEvent::Delete(id.to_string()))
				.unwrap_or(ChangeEvent::Resync),
		),
		_ => Some(ChangeEvent::Resync),
	}
}

/// Live subscription to one table's change feed.
///
/// Keeps its JS callbacks alive for the lifetime of the subscription and
/// tears the socket down on drop.
pub struct ChangeFeed {
	socket: WebSocket,
	heartbeat_handle: Option<i32>,
	_on_open: Closure<dyn FnMut()>,
	_on_message: Closure<dyn FnMut(MessageEvent)>,
	_on_close: Closure<dyn FnMut(CloseEvent)>,
	_heartbeat: Closure<dyn FnMut()>,
}

impl ChangeFeed {
	/// Open the feed for `table` and invoke `on_change` with every row change.
	pub fn subscribe(
		config: &BackendConfig,
		table: &str,
		on_change: impl Fn(ChangeEvent) + 'static,
	) -> Result<Self, ApiError> {
		let socket = WebSocket::new(&config.realtime_url())
			.map_err(|err| ApiError::Realtime(format!("{err:?}")))?;

		let join = join_message(table);
		let socket_open = socket.clone();
		let on_open: Closure<dyn FnMut()> = Closure::new(move || {
			debug!("Realtime socket open, joining channel");
			if let Err(err) = socket_open.send_with_str(&join) {
				warn!("Realtime join failed: {err:?}");
			}
		});
		socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));

		let on_message: Closure<dyn FnMut(MessageEvent)> = Closure::new(move |ev: MessageEvent| {
			if let Some(raw) = ev.data().as_string()
				&& let Some(change) = parse_change(&raw)
			{
				on_change(change);
			}
		});
		socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

		let on_close: Closure<dyn FnMut(CloseEvent)> = Closure::new(move |ev: CloseEvent| {
			warn!("Realtime socket closed (code {})", ev.code());
		});
		socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));

		// Phoenix drops idle connections without a periodic heartbeat.
		let heartbeat_ref = Rc::new(Cell::new(2u64));
		let socket_beat = socket.clone();
		let heartbeat: Closure<dyn FnMut()> = Closure::new(move || {
			let reference = heartbeat_ref.get();
			heartbeat_ref.set(reference + 1);
			if socket_beat.ready_state() == WebSocket::OPEN {
				let _ = socket_beat.send_with_str(&heartbeat_message(reference));
			}
		});
		let heartbeat_handle = web_sys::window().and_then(|w| {
			w.set_interval_with_callback_and_timeout_and_arguments_0(
				heartbeat.as_ref().unchecked_ref(),
				HEARTBEAT_MS,
			)
			.ok()
		});

		Ok(Self {
			socket,
			heartbeat_handle,
			_on_open: on_open,
			_on_message: on_message,
			_on_close: on_close,
			_heartbeat: heartbeat,
		})
	}
}

impl Drop for ChangeFeed {
	fn drop(&mut self) {
		if let (Some(window), Some(handle)) = (web_sys::window(), self.heartbeat_handle.take()) {
			window.clear_interval_with_handle(handle);
		}
		self.socket.set_onopen(None);
		self.socket.set_onmessage(None);
		self.socket.set_onclose(None);
		let _ = self.socket.close();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn join_targets_the_table_channel() {
		let msg: serde_json::Value = serde_json::from_str(&join_message("family_members")).unwrap();
		assert_eq!(msg["topic"], "realtime:public:family_members");
		assert_eq!(msg["event"], "phx_join");
		assert_eq!(
			msg["payload"]["config"]["postgres_changes"][0]["table"],
			"family_members"
		);
	}

	#[test]
	fn update_frame_yields_the_new_row() {
		let raw = r#"{
			"topic": "realtime:public:family_members",
			"event": "postgres_changes",
			"payload": {
				"data": {
					"type": "UPDATE",
					"record": {
						"id": "7f0c",
						"name": "Ada",
						"role": "mother",
						"father_id": null,
						"mother_id": null,
						"spouse_id": null,
						"pos_x": 500,
						"pos_y": 500,
						"avatar_url": null,
						"avatar_path": null
					}
				}
			}
		}"#;
		match parse_change(raw) {
			Some(ChangeEvent::Upsert(row)) => {
				assert_eq!(row.id, "7f0c");
				assert_eq!(row.pos_x, Some(500.0));
			}
			other => panic!("expected upsert, got {other:?}"),
		}
	}

	#[test]
	fn delete_frame_yields_the_old_id() {
		let raw = r#"{
			"event": "postgres_changes",
			"payload": { "data": { "type": "DELETE", "old_record": { "id": "7f0c" } } }
		}"#;
		assert_eq!(parse_change(raw), Some(ChangeEvent::Delete("7f0c".into())));
	}

	#[test]
	fn unusable_change_frame_requests_resync() {
		let raw = r#"{
			"event": "postgres_changes",
			"payload": { "data": { "type": "UPDATE", "record": { "id": "7f0c" } } }
		}"#;
		assert_eq!(parse_change(raw), Some(ChangeEvent::Resync));
	}

	#[test]
	fn protocol_chatter_is_ignored() {
		assert!(parse_change(r#"{"topic":"phoenix","event":"phx_reply","payload":{}}"#).is_none());
		assert!(parse_change("not json").is_none());
	}
}
