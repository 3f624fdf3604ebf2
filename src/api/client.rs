use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;

use super::error::ApiError;
use crate::config::{BackendConfig, Session};

/// Thin wrapper over the backend's tabular REST interface.
///
/// Owns the HTTP client plus the credentials every request carries; the
/// stores layer their row types on top of this.
#[derive(Clone)]
pub struct PostgrestClient {
	http: Client,
	config: BackendConfig,
	bearer: String,
}

impl PostgrestClient {
	pub fn new(config: BackendConfig, session: &Session) -> Self {
		// Anonymous requests authenticate with the anon key itself.
		let bearer = session
			.access_token
			.clone()
			.unwrap_or_else(|| config.anon_key.clone());
		Self {
			http: Client::new(),
			config,
			bearer,
		}
	}

	fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
		builder
			.header("apikey", &self.config.anon_key)
			.header("Authorization", format!("Bearer {}", self.bearer))
	}

	async fn check(response: Response) -> Result<Response, ApiError> {
		let status = response.status();
		if status.is_success() {
			return Ok(response);
		}
		let code = status.as_u16();
		let message = response.text().await.unwrap_or_default();
		Err(ApiError::from_status(code, message))
	}

	/// `GET {rest}/{table}?{query}`.
	pub async fn select(&self, table: &str, query: &str) -> Result<Response, ApiError> {
		let url = format!("{}/{}?{}", self.config.rest_url(), table, query);
		let response = self.authed(self.http.get(url)).send().await?;
		Self::check(response).await
	}

	/// `POST {rest}/{table}` with upsert-on-conflict semantics, returning the
	/// saved representation.
	pub async fn upsert<T: Serialize + ?Sized>(
		&self,
		table: &str,
		conflict_column: &str,
		body: &T,
	) -> Result<Response, ApiError> {
		let url = format!(
			"{}/{}?on_conflict={}",
			self.config.rest_url(),
			table,
			conflict_column
		);
		let response = self
			.authed(self.http.post(url))
			.header("Prefer", "resolution=merge-duplicates,return=representation")
			.json(body)
			.send()
			.await?;
		Self::check(response).await
	}

	/// `PATCH {rest}/{table}?{filter}`.
	pub async fn update<T: Serialize + ?Sized>(
		&self,
		table: &str,
		filter: &str,
		body: &T,
	) -> Result<Response, ApiError> {
		let url = format!("{}/{}?{}", self.config.rest_url(), table, filter);
		let response = self.authed(self.http.patch(url)).json(body).send().await?;
		Self::check(response).await
	}

	/// `DELETE {rest}/{table}?{filter}`.
	pub async fn delete(&self, table: &str, filter: &str) -> Result<Response, ApiError> {
		let url = format!("{}/{}?{}", self.config.rest_url(), table, filter);
		let response = self.authed(self.http.delete(url)).send().await?;
		Self::check(response).await
	}

	/// `POST {storage}/object/{bucket}/{path}`, overwriting any existing object.
	pub async fn storage_upload(
		&self,
		bucket: &str,
		path: &str,
		bytes: Vec<u8>,
		content_type: &str,
	) -> Result<(), ApiError> {
		let url = format!("{}/object/{}/{}", self.config.storage_url(), bucket, path);
		let response = self
			.authed(self.http.post(url))
			.header("Content-Type", content_type.to_string())
			.header("x-upsert", "true")
			.body(bytes)
			.send()
			.await?;
		Self::check(response).await.map(|_| ())
	}

	/// `DELETE {storage}/object/{bucket}/{path}`.
	pub async fn storage_delete(&self, bucket: &str, path: &str) -> Result<(), ApiError> {
		let url = format!("{}/object/{}/{}", self.config.storage_url(), bucket, path);
		let response = self.authed(self.http.delete(url)).send().await?;
		Self::check(response).await.map(|_| ())
	}

	/// Public URL of a storage object; pure string construction, no request.
	pub fn storage_public_url(&self, bucket: &str, path: &str) -> String {
		format!(
			"{}/object/public/{}/{}",
			self.config.storage_url(),
			bucket,
			path
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn client() -> PostgrestClient {
		PostgrestClient::new(
			BackendConfig {
				url: "https://example.supabase.co".into(),
				anon_key: "anon".into(),
			},
			&Session::default(),
		)
	}

	#[test]
	fn public_url_layout() {
		assert_eq!(
			client().storage_public_url("avatars", "anon/a.png"),
			"https://example.supabase.co/storage/v1/object/public/avatars/anon/a.png"
		);
	}
}
