use log::debug;
use serde::{Deserialize, Serialize};

use super::client::PostgrestClient;
use super::error::ApiError;

pub const MEMBERS_TABLE: &str = "family_members";
pub const AVATAR_BUCKET: &str = "avatars";

/// One `family_members` row as it crosses the wire.
///
/// Parent and spouse references are plain ids and may dangle (point at rows
/// outside the loaded snapshot); that is tolerated throughout.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberRow {
	pub id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	pub name: String,
	pub role: Option<String>,
	pub father_id: Option<String>,
	pub mother_id: Option<String>,
	pub spouse_id: Option<String>,
	pub pos_x: Option<f64>,
	pub pos_y: Option<f64>,
	pub avatar_url: Option<String>,
	pub avatar_path: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub created_at: Option<String>,
}

#[derive(Serialize)]
struct PositionPatch {
	pos_x: f64,
	pos_y: f64,
}

/// Mediates reads and writes of the member table for the active tenant.
#[derive(Clone)]
pub struct MemberStore {
	client: PostgrestClient,
}

impl MemberStore {
	pub fn new(client: PostgrestClient) -> Self {
		Self { client }
	}

	/// Fetch the full snapshot ordered by creation time. Rows that only carry
	/// a storage path get a public display URL resolved client-side.
	pub async fn load(&self) -> Result<Vec<MemberRow>, ApiError> {
		let response = self
			.client
			.select(MEMBERS_TABLE, "select=*&order=created_at.asc")
			.await?;
		let mut rows: Vec<MemberRow> = serde_json::from_str(&response.text().await?)?;
		for row in &mut rows {
			self.resolve_avatar(row);
		}
		debug!("Loaded {} members", rows.len());
		Ok(rows)
	}

	/// Fill in a public display URL for a row that only carries a storage
	/// path. Applied to loaded snapshots and to rows arriving off the change
	/// feed.
	pub fn resolve_avatar(&self, row: &mut MemberRow) {
		if row.avatar_url.is_none()
			&& let Some(path) = &row.avatar_path
		{
			row.avatar_url = Some(self.client.storage_public_url(AVATAR_BUCKET, path));
		}
	}

	/// Insert or update by id, returning the saved row as the new
	/// authoritative representation. The caller merges it into the local
	/// snapshot; no automatic re-fetch happens here.
	pub async fn upsert(&self, row: &MemberRow) -> Result<MemberRow, ApiError> {
		let response = self.client.upsert(MEMBERS_TABLE, "id", &[row]).await?;
		let mut saved: Vec<MemberRow> = serde_json::from_str(&response.text().await?)?;
		saved.pop().ok_or(ApiError::NotFound)
	}

	/// Delete the row. Avatar object cleanup is the caller's follow-up and is
	/// deliberately not transactional with this call.
	pub async fn remove(&self, id: &str) -> Result<(), ApiError> {
		self.client
			.delete(MEMBERS_TABLE, &format!("id=eq.{id}"))
			.await?;
		Ok(())
	}

	/// Write just the coordinate pair. Last writer wins; there is no version
	/// check.
	pub async fn update_position(&self, id: &str, x: f64, y: f64) -> Result<(), ApiError> {
		self.client
			.update(
				MEMBERS_TABLE,
				&format!("id=eq.{id}"),
				&PositionPatch { pos_x: x, pos_y: y },
			)
			.await?;
		Ok(())
	}
}

/// Merge a freshly saved row back into the local snapshot.
pub fn merge_saved(snapshot: &mut Vec<MemberRow>, saved: MemberRow) {
	match snapshot.iter_mut().find(|row| row.id == saved.id) {
		Some(existing) => *existing = saved,
		None => snapshot.push(saved),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn row(id: &str, name: &str) -> MemberRow {
		MemberRow {
			id: id.into(),
			name: name.into(),
			..MemberRow::default()
		}
	}

	#[test]
	fn parses_backend_row() {
		let raw = r#"{
			"id": "7f0c",
			"user_id": "u-1",
			"name": "Ada",
			"role": "mother",
			"father_id": null,
			"mother_id": null,
			"spouse_id": "9a1b",
			"pos_x": 500,
			"pos_y": 150.5,
			"avatar_url": null,
			"avatar_path": "u-1/ada.png",
			"created_at": "2025-01-04T10:00:00Z"
		}"#;
		let row: MemberRow = serde_json::from_str(raw).unwrap();
		assert_eq!(row.id, "7f0c");
		assert_eq!(row.pos_x, Some(500.0));
		assert_eq!(row.pos_y, Some(150.5));
		assert_eq!(row.spouse_id.as_deref(), Some("9a1b"));
		assert!(row.avatar_url.is_none());
	}

	#[test]
	fn position_survives_round_trip() {
		let mut member = row("2", "B");
		member.pos_x = Some(500.0);
		member.pos_y = Some(500.0);
		let json = serde_json::to_string(&member).unwrap();
		let back: MemberRow = serde_json::from_str(&json).unwrap();
		assert_eq!(back.pos_x, Some(500.0));
		assert_eq!(back.pos_y, Some(500.0));
	}

	#[test]
	fn upsert_body_omits_unset_created_at() {
		let json = serde_json::to_value(row("1", "A")).unwrap();
		assert!(json.get("created_at").is_none());
		// Cleared relationships serialize as explicit nulls so an edit can
		// detach a parent.
		assert!(json.get("father_id").unwrap().is_null());
	}

	#[test]
	fn merge_replaces_or_appends() {
		let mut snapshot = vec![row("1", "A"), row("2", "B")];
		merge_saved(&mut snapshot, row("2", "B2"));
		assert_eq!(snapshot.len(), 2);
		assert_eq!(snapshot[1].name, "B2");

		merge_saved(&mut snapshot, row("3", "C"));
		assert_eq!(snapshot.len(), 3);
	}
}
