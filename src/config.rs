//! Backend endpoints and the explicit session context.

use log::{info, warn};
use serde::{Deserialize, Serialize};

const DEFAULT_URL: &str = "http://localhost:54321";
const DEFAULT_ANON_KEY: &str = "local-anon-key";

const SESSION_STORAGE_KEY: &str = "family_session";

/// Connection details for the hosted backend (tables, storage, realtime).
///
/// Resolved at compile time: the WASM client has no process environment at
/// runtime, so `SUPABASE_URL` / `SUPABASE_ANON_KEY` are baked in by the build.
#[derive(Clone, Debug)]
pub struct BackendConfig {
	pub url: String,
	pub anon_key: String,
}

impl BackendConfig {
	pub fn load() -> Self {
		let url = option_env!("SUPABASE_URL").unwrap_or(DEFAULT_URL);
		let anon_key = option_env!("SUPABASE_ANON_KEY").unwrap_or(DEFAULT_ANON_KEY);
		if url == DEFAULT_URL {
			warn!("SUPABASE_URL not set at build time, using {url}");
		}
		Self {
			url: url.trim_end_matches('/').to_string(),
			anon_key: anon_key.to_string(),
		}
	}

	/// Base of the tabular REST interface.
	pub fn rest_url(&self) -> String {
		format!("{}/rest/v1", self.url)
	}

	/// Base of the object storage interface.
	pub fn storage_url(&self) -> String {
		format!("{}/storage/v1", self.url)
	}

	/// WebSocket endpoint of the realtime change feed.
	pub fn realtime_url(&self) -> String {
		let ws_base = self
			.url
			.replacen("https://", "wss://", 1)
			.replacen("http://", "ws://", 1);
		format!(
			"{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
			ws_base, self.anon_key
		)
	}
}

/// The signed-in user, carried explicitly through component context rather
/// than implicit global state. Session issuance itself happens elsewhere;
/// this client only restores whatever the auth flow left in local storage.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Session {
	pub user_id: Option<String>,
	pub access_token: Option<String>,
}

impl Session {
	/// Restore the session persisted by the login flow, or fall back to an
	/// anonymous session.
	pub fn restore() -> Self {
		let stored = web_sys::window()
			.and_then(|w| w.local_storage().ok().flatten())
			.and_then(|s| s.get_item(SESSION_STORAGE_KEY).ok().flatten());
		match stored {
			Some(raw) => match serde_json::from_str::<Session>(&raw) {
				Ok(session) => {
					info!("Restored session for {:?}", session.user_id);
					session
				}
				Err(err) => {
					warn!("Stored session unreadable, continuing anonymous: {err}");
					Session::default()
				}
			},
			None => Session::default(),
		}
	}

	/// Storage folder prefix for objects owned by this user.
	pub fn storage_prefix(&self) -> &str {
		self.user_id.as_deref().unwrap_or("anon")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn realtime_url_swaps_scheme() {
		let cfg = BackendConfig {
			url: "https://example.supabase.co".into(),
			anon_key: "key123".into(),
		};
		assert_eq!(
			cfg.realtime_url(),
			"wss://example.supabase.co/realtime/v1/websocket?apikey=key123&vsn=1.0.0"
		);
	}

	#[test]
	fn session_prefix_defaults_to_anon() {
		assert_eq!(Session::default().storage_prefix(), "anon");
		let s = Session {
			user_id: Some("u-1".into()),
			access_token: None,
		};
		assert_eq!(s.storage_prefix(), "u-1");
	}
}
