//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async data-access
//! methods that take `&SqlitePool` first. User-scoped lookups take the
//! caller's id explicitly; nothing reads an ambient "current user".

pub mod course_template_repo;
pub mod privacy_mask_repo;
pub mod user_repo;
pub mod walk_session_repo;

pub use course_template_repo::CourseTemplateRepo;
pub use privacy_mask_repo::PrivacyMaskRepo;
pub use user_repo::UserRepo;
pub use walk_session_repo::WalkSessionRepo;
