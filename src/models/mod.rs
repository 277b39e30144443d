pub mod deletion;
pub mod tenant;
pub mod user;

pub use deletion::{DeletionRecord, DeletionStatus};
pub use tenant::Tenant;
pub use user::UserProfile;
