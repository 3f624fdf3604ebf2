use crate::api::MemberRow;

/// Role label to ring color. Roles are free text; anything unrecognized
/// falls through to the default.
const ROLE_COLORS: &[(&str, &str)] = &[
	("grandfather", "#8b5cf6"),
	("grandmother", "#fb7185"),
	("father", "#1e90ff"),
	("mother", "#f59e0b"),
	("son", "#34d399"),
	("daughter", "#60a5fa"),
	("uncle", "#f97316"),
	("aunt", "#ec4899"),
	("brother", "#06b6d4"),
	("sister", "#f472b6"),
	("cousin", "#a78bfa"),
	("nephew", "#60a5fa"),
	("niece", "#faa2c1"),
];

pub const DEFAULT_ROLE_COLOR: &str = "#e2e8f0";

pub fn role_color(role: Option<&str>) -> &'static str {
	let Some(role) = role else {
		return DEFAULT_ROLE_COLOR;
	};
	let role = role.to_ascii_lowercase();
	ROLE_COLORS
		.iter()
		.find(|(name, _)| *name == role)
		.map(|(_, color)| *color)
		.unwrap_or(DEFAULT_ROLE_COLOR)
}

/// Role names offered by the member form, in display order.
pub fn known_roles() -> impl Iterator<Item = &'static str> {
	ROLE_COLORS.iter().map(|(name, _)| *name)
}

/// One drawable node derived from a member row.
#[derive(Clone, Debug, PartialEq)]
pub struct MemberNode {
	pub id: String,
	pub name: String,
	pub role: Option<String>,
	pub avatar_url: Option<String>,
	pub father_id: Option<String>,
	pub mother_id: Option<String>,
	pub spouse_id: Option<String>,
	pub x: f64,
	pub y: f64,
	/// True while the coordinates come from the layout engine rather than a
	/// user drag; cleared on drag release and when the row carries a
	/// persisted position.
	pub auto_positioned: bool,
}

impl MemberNode {
	pub fn from_row(row: &MemberRow) -> Self {
		let persisted = row.pos_x.zip(row.pos_y);
		Self {
			id: row.id.clone(),
			name: row.name.clone(),
			role: row.role.clone(),
			avatar_url: row.avatar_url.clone(),
			father_id: row.father_id.clone(),
			mother_id: row.mother_id.clone(),
			spouse_id: row.spouse_id.clone(),
			x: persisted.map(|(x, _)| x).unwrap_or(0.0),
			y: persisted.map(|(_, y)| y).unwrap_or(0.0),
			auto_positioned: persisted.is_none(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn role_lookup_is_case_insensitive() {
		assert_eq!(role_color(Some("Father")), "#1e90ff");
		assert_eq!(role_color(Some("NIECE")), "#faa2c1");
		assert_eq!(role_color(Some("astronaut")), DEFAULT_ROLE_COLOR);
		assert_eq!(role_color(None), DEFAULT_ROLE_COLOR);
	}

	#[test]
	fn persisted_position_marks_node_manual() {
		let mut row = MemberRow {
			id: "1".into(),
			name: "A".into(),
			..MemberRow::default()
		};
		assert!(MemberNode::from_row(&row).auto_positioned);

		row.pos_x = Some(120.0);
		row.pos_y = Some(80.0);
		let node = MemberNode::from_row(&row);
		assert!(!node.auto_positioned);
		assert_eq!((node.x, node.y), (120.0, 80.0));
	}

	#[test]
	fn half_persisted_position_stays_auto() {
		let row = MemberRow {
			id: "1".into(),
			name: "A".into(),
			pos_x: Some(10.0),
			..MemberRow::default()
		};
		assert!(MemberNode::from_row(&row).auto_positioned);
	}
}
