//! CLI command implementations

pub mod check;
pub mod image;
pub mod membership;
pub mod resolve;
pub mod template;
pub mod verify;
