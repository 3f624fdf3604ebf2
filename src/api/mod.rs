//! Client for the hosted backend: tabular REST, object storage, and the
//! realtime change feed.

mod client;
mod error;
pub mod members;
mod realtime;
mod storage;

pub use client::PostgrestClient;
pub use error::ApiError;
pub use members::{MemberRow, MemberStore, merge_saved};
pub use realtime::{ChangeEvent, ChangeFeed};
pub use storage::{AvatarStore, UploadedAvatar};
