pub mod auth;

pub use auth::{require, staff_auth_middleware, StaffClaims};
