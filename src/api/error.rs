use thiserror::Error;

/// Failures surfaced by the backend client.
///
/// Callers get a programmatic distinction between "not found", "forbidden",
/// transient network trouble, and everything else the backend reports.
#[derive(Error, Debug)]
pub enum ApiError {
	#[error("network error: {0}")]
	Network(#[from] reqwest::Error),

	#[error("row not found")]
	NotFound,

	#[error("forbidden")]
	Forbidden,

	#[error("backend error ({status}): {message}")]
	Backend { status: u16, message: String },

	#[error("malformed response: {0}")]
	Decode(#[from] serde_json::Error),

	#[error("realtime channel error: {0}")]
	Realtime(String),
}

impl ApiError {
	pub(crate) fn from_status(status: u16, message: String) -> Self {
		match status {
			404 | 406 => ApiError::NotFound,
			401 | 403 => ApiError::Forbidden,
			_ => ApiError::Backend { status, message },
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_classification() {
		assert!(matches!(
			ApiError::from_status(404, String::new()),
			ApiError::NotFound
		));
		assert!(matches!(
			ApiError::from_status(403, String::new()),
			ApiError::Forbidden
		));
		assert!(matches!(
			ApiError::from_status(500, String::new()),
			ApiError::Backend { status: 500, .. }
		));
	}
}
