mod component;
mod export;
pub mod layout;
mod render;
mod state;
mod types;

pub use component::FamilyGraphCanvas;
pub use state::{GraphState, PositionCommit, ReleaseAction};
pub use types::{MemberNode, known_roles, role_color};
