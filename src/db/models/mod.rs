//! Database models split into domain-specific modules.

pub mod complaint;
pub mod user;

pub use complaint::*;
pub use user::*;
