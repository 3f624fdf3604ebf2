//! Reload-vs-edit coordination.
//!
//! Realtime notifications trigger full snapshot reloads, which would clobber
//! an open edit form. Instead of a shared boolean, reloads are gated on an
//! RAII pass: opening an editor acquires one, dropping it (close, save,
//! delete) releases it, and reloads only run while no pass is outstanding.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Clone, Default)]
pub struct EditGuard {
	active: Arc<AtomicU32>,
}

/// Held while an edit form is open. Dropping releases the guard.
pub struct EditPass {
	active: Arc<AtomicU32>,
}

impl EditGuard {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn acquire(&self) -> EditPass {
		self.active.fetch_add(1, Ordering::SeqCst);
		EditPass {
			active: self.active.clone(),
		}
	}

	/// True when a reload may run.
	pub fn is_open(&self) -> bool {
		self.active.load(Ordering::SeqCst) == 0
	}
}

impl Drop for EditPass {
	fn drop(&mut self) {
		self.active.fetch_sub(1, Ordering::SeqCst);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reloads_blocked_while_pass_held() {
		let guard = EditGuard::new();
		assert!(guard.is_open());
		let pass = guard.acquire();
		assert!(!guard.is_open());
		drop(pass);
		assert!(guard.is_open());
	}

	#[test]
	fn nested_passes_all_count() {
		let guard = EditGuard::new();
		let a = guard.acquire();
		let b = guard.acquire();
		drop(a);
		assert!(!guard.is_open());
		drop(b);
		assert!(guard.is_open());
	}
}
