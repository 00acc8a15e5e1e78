//! Database models split into domain-specific modules.

pub mod common;
pub mod course;
pub mod privacy_mask;
pub mod user;
pub mod walk;

pub use common::*;
pub use course::*;
pub use privacy_mask::*;
pub use user::*;
pub use walk::*;
