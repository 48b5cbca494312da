//! Organisation user directory.

mod model;

// Re-export public API
pub use model::OrganizationUser;
