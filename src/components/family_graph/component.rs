use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::error;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent};

use crate::api::MemberRow;

use super::export::export_png;
use super::render::{self, AvatarCache};
use super::state::{GraphState, PositionCommit, ReleaseAction};

fn pointer_position(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

/// Interactive family-tree canvas: generation auto layout, pan/zoom,
/// per-node dragging with one persisted write per release, double-tap to
/// edit, and client-side PNG export.
#[component]
pub fn FamilyGraphCanvas(
	#[prop(into)] members: Signal<Vec<MemberRow>>,
	#[prop(into)] loading: Signal<bool>,
	/// Fired once per drag release with the node's final coordinates.
	on_commit: Callback<PositionCommit>,
	/// Fired on double-activation of a node with the member id.
	on_edit: Callback<String>,
	/// Fired by the "Add member" control.
	on_add: Callback<()>,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<GraphState>>> = Rc::new(RefCell::new(None));
	let avatars: Rc<RefCell<AvatarCache>> = Rc::new(RefCell::new(AvatarCache::new()));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));

	let (state_init, avatars_init, animate_init) = (state.clone(), avatars.clone(), animate.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		if state_init.borrow().is_some() {
			return;
		}

		let (w, h) = (
			width.unwrap_or_else(|| {
				canvas
					.parent_element()
					.map(|p| p.client_width() as f64)
					.unwrap_or(900.0)
			}),
			height.unwrap_or_else(|| {
				canvas
					.parent_element()
					.map(|p| p.client_height() as f64)
					.unwrap_or(600.0)
			}),
		);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let Ok(Some(ctx)) = canvas.get_context("2d") else {
			error!("Canvas 2d context unavailable");
			return;
		};
		let Ok(ctx) = ctx.dyn_into::<CanvasRenderingContext2d>() else {
			return;
		};
		*state_init.borrow_mut() = Some(GraphState::new(w, h));

		let (state_anim, avatars_anim, animate_inner) = (
			state_init.clone(),
			avatars_init.clone(),
			animate_init.clone(),
		);
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref s) = *state_anim.borrow() {
				render::render(s, &mut avatars_anim.borrow_mut(), &ctx);
			}
			if let (Some(window), Some(cb)) = (web_sys::window(), &*animate_inner.borrow()) {
				let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let (Some(window), Some(cb)) = (web_sys::window(), &*animate_init.borrow()) {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	// Every snapshot change reruns auto layout; pinned nodes stay put.
	let state_data = state.clone();
	Effect::new(move |_| {
		let rows = members.get();
		if let Some(ref mut s) = *state_data.borrow_mut() {
			s.set_snapshot(&rows);
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = pointer_position(&canvas.into(), &ev);
		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.pointer_down(x, y);
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = pointer_position(&canvas.into(), &ev);
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			s.pointer_move(x, y);
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		let action = match *state_mu.borrow_mut() {
			Some(ref mut s) => s.pointer_up(js_sys::Date::now()),
			None => return,
		};
		match action {
			ReleaseAction::None => {}
			ReleaseAction::Commit(commit) => on_commit.run(commit),
			ReleaseAction::OpenEditor(id) => on_edit.run(id),
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.cancel_gesture();
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = pointer_position(&canvas.into(), &ev);
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			s.zoom(x, y, ev.delta_y());
		}
	};

	let state_reset = state.clone();
	let on_reset = move |_| {
		if let Some(ref mut s) = *state_reset.borrow_mut() {
			s.reset_view();
		}
	};

	let on_export = move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if let Err(err) = export_png(&canvas.into()) {
			error!("PNG export failed: {err:?}");
		}
	};

	view! {
		<div class="family-graph">
			<div class="graph-controls">
				<button on:click=on_reset>"Reset view"</button>
				<button on:click=on_export>"Export PNG"</button>
				<button on:click=move |_| on_add.run(())>"Add member"</button>
				<span class="node-count">
					{move || {
						if loading.get() {
							"Loading…".to_string()
						} else {
							format!("Nodes: {}", members.with(|m| m.len()))
						}
					}}
				</span>
			</div>
			<canvas
				node_ref=canvas_ref
				class="family-graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				style="display: block; cursor: grab;"
			/>
		</div>
	}
}
