//! Typed domain model shared across services

pub mod entities;
pub mod proposal;
pub mod resolution;

pub use entities::*;
pub use proposal::*;
pub use resolution::*;
