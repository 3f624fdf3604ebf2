use leptos::prelude::*;
use wasm_bindgen::prelude::*;

const TOAST_TTL_MS: i32 = 2500;

#[derive(Clone, Debug, PartialEq)]
struct Toast {
	id: u64,
	message: String,
}

/// Queue of short-lived on-screen messages. Success and failure both go
/// through here; each entry expires on its own timer.
#[derive(Clone, Copy)]
pub struct Toasts {
	queue: RwSignal<Vec<Toast>>,
	counter: RwSignal<u64>,
}

impl Toasts {
	pub fn new() -> Self {
		Self {
			queue: RwSignal::new(Vec::new()),
			counter: RwSignal::new(0),
		}
	}

	pub fn push(&self, message: impl Into<String>) {
		let id = self.counter.get_untracked();
		self.counter.set(id + 1);
		self.queue.update(|q| {
			q.push(Toast {
				id,
				message: message.into(),
			})
		});

		let queue = self.queue;
		// Ownership of the callback moves to the JS timer; it fires once.
		let expire = Closure::once_into_js(move || {
			queue.update(|q| q.retain(|t| t.id != id));
		});
		if let Some(window) = web_sys::window() {
			let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
				expire.unchecked_ref(),
				TOAST_TTL_MS,
			);
		}
	}
}

impl Default for Toasts {
	fn default() -> Self {
		Self::new()
	}
}

/// Renders the active toasts stacked in a corner of the page.
#[component]
pub fn ToastTray(toasts: Toasts) -> impl IntoView {
	view! {
		<div class="toast-tray">
			<For
				each=move || toasts.queue.get()
				key=|toast| toast.id
				children=move |toast| view! { <div class="toast">{toast.message}</div> }
			/>
		</div>
	}
}
