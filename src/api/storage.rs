use uuid::Uuid;

use super::client::PostgrestClient;
use super::error::ApiError;
use super::members::AVATAR_BUCKET;
use crate::config::Session;

/// Uploaded avatar location: public display URL plus the bucket path kept on
/// the row so the object can be deleted with the member.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadedAvatar {
	pub url: String,
	pub path: String,
}

/// Blob-storage interface for avatar images.
#[derive(Clone)]
pub struct AvatarStore {
	client: PostgrestClient,
}

impl AvatarStore {
	pub fn new(client: PostgrestClient) -> Self {
		Self { client }
	}

	/// Upload image bytes under a fresh path owned by the session user and
	/// return its public location.
	pub async fn upload(
		&self,
		session: &Session,
		file_name: &str,
		bytes: Vec<u8>,
		content_type: &str,
	) -> Result<UploadedAvatar, ApiError> {
		let path = object_path(session, file_name);
		self.client
			.storage_upload(AVATAR_BUCKET, &path, bytes, content_type)
			.await?;
		Ok(UploadedAvatar {
			url: self.client.storage_public_url(AVATAR_BUCKET, &path),
			path,
		})
	}

	pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
		self.client.storage_delete(AVATAR_BUCKET, path).await
	}
}

fn object_path(session: &Session, file_name: &str) -> String {
	let ext = file_name.rsplit_once('.').map(|(_, e)| e).unwrap_or("png");
	format!("{}/{}.{}", session.storage_prefix(), Uuid::new_v4(), ext)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn object_path_keeps_extension_and_owner() {
		let session = Session {
			user_id: Some("u-9".into()),
			access_token: None,
		};
		let path = object_path(&session, "grandma.jpeg");
		assert!(path.starts_with("u-9/"));
		assert!(path.ends_with(".jpeg"));
	}

	#[test]
	fn object_path_defaults_extension() {
		let path = object_path(&Session::default(), "noext");
		assert!(path.starts_with("anon/"));
		assert!(path.ends_with(".png"));
	}
}
