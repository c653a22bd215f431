//! HTTP route handlers.

pub mod families;
pub mod system;
