//! Rate limiting, encryption, input validation and permissions

pub mod permissions;
pub mod service;
pub mod validation;

pub use permissions::{has_permission, role_permissions};
pub use service::SecurityService;
pub use validation::{validate_email, validate_name, validate_password};
