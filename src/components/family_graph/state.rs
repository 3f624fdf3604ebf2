use crate::api::MemberRow;

use super::layout::apply_layout;
use super::types::MemberNode;

pub const NODE_RADIUS: f64 = 36.0;

pub const MIN_ZOOM: f64 = 0.25;
pub const MAX_ZOOM: f64 = 3.0;
pub const ZOOM_STEP: f64 = 1.08;

/// Two taps on the same node within this window open the editor.
pub const DOUBLE_TAP_MS: f64 = 300.0;
/// Pointer travel below this (screen px) counts as a tap, not a drag.
const TAP_SLOP: f64 = 4.0;

#[derive(Clone, Debug)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node: Option<usize>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f64,
	pub node_start_y: f64,
	moved: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
struct TapState {
	node: Option<usize>,
	at_ms: f64,
}

/// The single position write produced by a drag release.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionCommit {
	pub id: String,
	pub x: f64,
	pub y: f64,
}

/// What the caller must do after a pointer release.
#[derive(Clone, Debug, PartialEq)]
pub enum ReleaseAction {
	None,
	/// Persist exactly this final position, once.
	Commit(PositionCommit),
	/// Double-activation on a node: open the edit form for this member.
	OpenEditor(String),
}

/// Canvas-side state: the node snapshot, the viewport transform, and the
/// pointer gesture in progress. Pure; all DOM plumbing lives in the
/// component.
pub struct GraphState {
	pub nodes: Vec<MemberNode>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	tap: TapState,
	pub width: f64,
	pub height: f64,
}

impl GraphState {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			nodes: Vec::new(),
			transform: ViewTransform::default(),
			drag: DragState::default(),
			pan: PanState::default(),
			tap: TapState::default(),
			width,
			height,
		}
	}

	/// Replace the snapshot and run auto layout over it. Any gesture in
	/// progress is dropped with the old nodes.
	pub fn set_snapshot(&mut self, rows: &[MemberRow]) {
		let mut nodes: Vec<MemberNode> = rows.iter().map(MemberNode::from_row).collect();
		apply_layout(&mut nodes, self.width);
		self.nodes = nodes;
		self.drag = DragState::default();
		self.pan = PanState::default();
	}

	pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Topmost node under a screen position, if any.
	pub fn node_at(&self, sx: f64, sy: f64) -> Option<usize> {
		let (wx, wy) = self.screen_to_world(sx, sy);
		let mut found = None;
		for (i, node) in self.nodes.iter().enumerate() {
			let (dx, dy) = (node.x - wx, node.y - wy);
			if (dx * dx + dy * dy).sqrt() < NODE_RADIUS {
				found = Some(i);
			}
		}
		found
	}

	pub fn pointer_down(&mut self, x: f64, y: f64) {
		if let Some(idx) = self.node_at(x, y) {
			self.drag = DragState {
				active: true,
				node: Some(idx),
				start_x: x,
				start_y: y,
				node_start_x: self.nodes[idx].x,
				node_start_y: self.nodes[idx].y,
				moved: false,
			};
		} else {
			self.pan = PanState {
				active: true,
				start_x: x,
				start_y: y,
				transform_start_x: self.transform.x,
				transform_start_y: self.transform.y,
			};
		}
	}

	pub fn pointer_move(&mut self, x: f64, y: f64) {
		if self.drag.active {
			let Some(idx) = self.drag.node else { return };
			let (dx, dy) = (x - self.drag.start_x, y - self.drag.start_y);
			if dx.abs().max(dy.abs()) > TAP_SLOP {
				self.drag.moved = true;
			}
			self.nodes[idx].x = self.drag.node_start_x + dx / self.transform.k;
			self.nodes[idx].y = self.drag.node_start_y + dy / self.transform.k;
		} else if self.pan.active {
			self.transform.x = self.pan.transform_start_x + (x - self.pan.start_x);
			self.transform.y = self.pan.transform_start_y + (y - self.pan.start_y);
		}
	}

	/// End the gesture. A real drag yields exactly one [`PositionCommit`]
	/// with the node's final coordinates and pins the node; a short tap
	/// feeds double-activation detection instead.
	pub fn pointer_up(&mut self, now_ms: f64) -> ReleaseAction {
		if !self.drag.active {
			self.pan.active = false;
			return ReleaseAction::None;
		}
		let drag = std::mem::take(&mut self.drag);
		let Some(idx) = drag.node else {
			return ReleaseAction::None;
		};

		if drag.moved {
			let node = &mut self.nodes[idx];
			node.x = node.x.round();
			node.y = node.y.round();
			node.auto_positioned = false;
			self.tap = TapState::default();
			return ReleaseAction::Commit(PositionCommit {
				id: node.id.clone(),
				x: node.x,
				y: node.y,
			});
		}

		// Tap: put back any sub-slop nudge, then check double-activation.
		self.nodes[idx].x = drag.node_start_x;
		self.nodes[idx].y = drag.node_start_y;
		if self.tap.node == Some(idx) && now_ms - self.tap.at_ms < DOUBLE_TAP_MS {
			self.tap = TapState::default();
			return ReleaseAction::OpenEditor(self.nodes[idx].id.clone());
		}
		self.tap = TapState {
			node: Some(idx),
			at_ms: now_ms,
		};
		ReleaseAction::None
	}

	pub fn cancel_gesture(&mut self) {
		self.drag = DragState::default();
		self.pan.active = false;
	}

	/// Wheel zoom anchored at the pointer: the world point under the cursor
	/// stays fixed. Scale is clamped to [`MIN_ZOOM`]..=[`MAX_ZOOM`].
	pub fn zoom(&mut self, sx: f64, sy: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 {
			1.0 / ZOOM_STEP
		} else {
			ZOOM_STEP
		};
		let new_k = (self.transform.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = new_k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	pub fn reset_view(&mut self) {
		self.transform = ViewTransform::default();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn snapshot() -> Vec<MemberRow> {
		vec![
			MemberRow {
				id: "1".into(),
				name: "A".into(),
				pos_x: Some(100.0),
				pos_y: Some(100.0),
				..MemberRow::default()
			},
			MemberRow {
				id: "2".into(),
				name: "B".into(),
				father_id: Some("1".into()),
				pos_x: Some(300.0),
				pos_y: Some(250.0),
				..MemberRow::default()
			},
		]
	}

	fn state() -> GraphState {
		let mut s = GraphState::new(1200.0, 800.0);
		s.set_snapshot(&snapshot());
		s
	}

	#[test]
	fn drag_release_commits_final_position_once() {
		let mut s = state();
		s.pointer_down(100.0, 100.0);
		// Intermediate path points must not produce commits.
		s.pointer_move(200.0, 180.0);
		s.pointer_move(340.0, 420.0);
		s.pointer_move(500.0, 500.0);
		let action = s.pointer_up(0.0);

		assert_eq!(
			action,
			ReleaseAction::Commit(PositionCommit {
				id: "1".into(),
				x: 500.0,
				y: 500.0,
			})
		);
		assert!(!s.nodes[0].auto_positioned);
		// Releasing again is a no-op.
		assert_eq!(s.pointer_up(1.0), ReleaseAction::None);
	}

	#[test]
	fn drag_respects_zoom_scale() {
		let mut s = state();
		s.transform.k = 2.0;
		s.pointer_down(200.0, 200.0); // world (100, 100) = node 1
		s.pointer_move(300.0, 200.0);
		match s.pointer_up(0.0) {
			ReleaseAction::Commit(commit) => {
				// 100 screen px at 2x zoom moves the node 50 world units.
				assert_eq!(commit.x, 150.0);
				assert_eq!(commit.y, 100.0);
			}
			other => panic!("expected commit, got {other:?}"),
		}
	}

	#[test]
	fn tap_without_movement_does_not_commit() {
		let mut s = state();
		s.pointer_down(100.0, 100.0);
		s.pointer_move(101.0, 101.0); // under the slop
		assert_eq!(s.pointer_up(0.0), ReleaseAction::None);
		assert_eq!((s.nodes[0].x, s.nodes[0].y), (100.0, 100.0));
	}

	#[test]
	fn double_tap_opens_editor() {
		let mut s = state();
		s.pointer_down(100.0, 100.0);
		assert_eq!(s.pointer_up(1000.0), ReleaseAction::None);
		s.pointer_down(100.0, 100.0);
		assert_eq!(s.pointer_up(1200.0), ReleaseAction::OpenEditor("1".into()));
	}

	#[test]
	fn slow_second_tap_does_not_open_editor() {
		let mut s = state();
		s.pointer_down(100.0, 100.0);
		s.pointer_up(1000.0);
		s.pointer_down(100.0, 100.0);
		assert_eq!(s.pointer_up(1400.0), ReleaseAction::None);
	}

	#[test]
	fn empty_canvas_press_pans_the_scene() {
		let mut s = state();
		s.pointer_down(700.0, 700.0);
		s.pointer_move(750.0, 680.0);
		assert_eq!((s.transform.x, s.transform.y), (50.0, -20.0));
		assert_eq!(s.pointer_up(0.0), ReleaseAction::None);
	}

	#[test]
	fn zoom_is_clamped_and_anchored() {
		let mut s = state();
		for _ in 0..200 {
			s.zoom(600.0, 400.0, -1.0);
		}
		assert_eq!(s.transform.k, MAX_ZOOM);
		for _ in 0..400 {
			s.zoom(600.0, 400.0, 1.0);
		}
		assert_eq!(s.transform.k, MIN_ZOOM);

		// The world point under the cursor stays put through a zoom step.
		let mut s = state();
		let before = s.screen_to_world(321.0, 456.0);
		s.zoom(321.0, 456.0, -1.0);
		let after = s.screen_to_world(321.0, 456.0);
		assert!((before.0 - after.0).abs() < 1e-9);
		assert!((before.1 - after.1).abs() < 1e-9);
	}

	#[test]
	fn hit_test_honours_transform() {
		let mut s = state();
		s.transform.x = 40.0;
		s.transform.y = -10.0;
		assert_eq!(s.node_at(140.0, 90.0), Some(0));
		assert_eq!(s.node_at(600.0, 600.0), None);
	}
}
