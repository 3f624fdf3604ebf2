use std::collections::HashMap;
use std::f64::consts::PI;

use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use super::state::{GraphState, NODE_RADIUS};
use super::types::role_color;

const BACKGROUND: &str = "#071025";
const DISC_FILL: &str = "#071028";
const EDGE_COLOR: &str = "#94a3b8";
const SPOUSE_EDGE_COLOR: &str = "rgba(148, 163, 184, 0.55)";

/// Avatar images load asynchronously; the cache keeps one element per URL
/// and the rAF loop picks them up on the frame after they finish.
#[derive(Default)]
pub struct AvatarCache {
	images: HashMap<String, HtmlImageElement>,
}

impl AvatarCache {
	pub fn new() -> Self {
		Self::default()
	}

	fn get(&mut self, url: &str) -> Option<&HtmlImageElement> {
		if !self.images.contains_key(url) {
			let image = HtmlImageElement::new().ok()?;
			// Anonymous CORS keeps the canvas untainted for PNG export.
			image.set_cross_origin(Some("anonymous"));
			image.set_src(url);
			self.images.insert(url.to_string(), image);
		}
		self.images
			.get(url)
			.filter(|img| img.complete() && img.natural_width() > 0)
	}
}

pub fn render(state: &GraphState, avatars: &mut AvatarCache, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx);
	draw_nodes(state, avatars, ctx);
	ctx.restore();
}

fn draw_edges(state: &GraphState, ctx: &CanvasRenderingContext2d) {
	let index: HashMap<&str, usize> = state
		.nodes
		.iter()
		.enumerate()
		.map(|(i, n)| (n.id.as_str(), i))
		.collect();

	// Parent -> child lines; dangling references are simply not drawn.
	ctx.set_stroke_style_str(EDGE_COLOR);
	ctx.set_line_width(2.0);
	for child in &state.nodes {
		for parent_id in [&child.father_id, &child.mother_id].into_iter().flatten() {
			let Some(&p) = index.get(parent_id.as_str()) else {
				continue;
			};
			let parent = &state.nodes[p];
			ctx.begin_path();
			ctx.move_to(parent.x, parent.y);
			ctx.line_to(child.x, child.y);
			ctx.stroke();
		}
	}

	// One thin line per spouse pair, drawn once.
	ctx.set_stroke_style_str(SPOUSE_EDGE_COLOR);
	ctx.set_line_width(1.0);
	for node in &state.nodes {
		let Some(spouse_id) = &node.spouse_id else {
			continue;
		};
		let Some(&s) = index.get(spouse_id.as_str()) else {
			continue;
		};
		let spouse = &state.nodes[s];
		if node.id.as_str() > spouse.id.as_str() && spouse.spouse_id.as_deref() == Some(&node.id) {
			continue;
		}
		ctx.begin_path();
		ctx.move_to(node.x, node.y);
		ctx.line_to(spouse.x, spouse.y);
		ctx.stroke();
	}
}

fn draw_nodes(state: &GraphState, avatars: &mut AvatarCache, ctx: &CanvasRenderingContext2d) {
	for node in &state.nodes {
		let color = role_color(node.role.as_deref());
		let (x, y) = (node.x, node.y);

		// Soft halo behind the ring.
		ctx.set_global_alpha(0.08);
		ctx.begin_path();
		let _ = ctx.arc(x, y, NODE_RADIUS + 6.0, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(color);
		ctx.fill();
		ctx.set_global_alpha(1.0);

		ctx.begin_path();
		let _ = ctx.arc(x, y, NODE_RADIUS, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(DISC_FILL);
		ctx.fill();
		ctx.set_stroke_style_str(color);
		ctx.set_line_width(2.0);
		ctx.stroke();

		let avatar = match node.avatar_url.as_deref() {
			Some(url) => avatars.get(url),
			None => None,
		};
		match avatar {
			Some(image) => {
				ctx.save();
				ctx.begin_path();
				let _ = ctx.arc(x, y, NODE_RADIUS - 1.0, 0.0, 2.0 * PI);
				ctx.clip();
				let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
					image,
					x - NODE_RADIUS,
					y - NODE_RADIUS,
					NODE_RADIUS * 2.0,
					NODE_RADIUS * 2.0,
				);
				ctx.restore();
			}
			None => {
				ctx.set_fill_style_str("white");
				ctx.set_font("20px sans-serif");
				ctx.set_text_align("center");
				ctx.set_text_baseline("middle");
				let _ = ctx.fill_text("+", x, y);
			}
		}

		ctx.set_text_align("center");
		ctx.set_text_baseline("top");
		ctx.set_fill_style_str("white");
		ctx.set_font("12px sans-serif");
		let _ = ctx.fill_text(&node.name, x, y + NODE_RADIUS + 8.0);

		if let Some(role) = &node.role {
			ctx.set_fill_style_str(EDGE_COLOR);
			ctx.set_font("10px sans-serif");
			let _ = ctx.fill_text(role, x, y + NODE_RADIUS + 22.0);
		}
	}
}
