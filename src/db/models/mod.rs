//! Database models split into domain-specific modules.

pub mod category;
pub mod common;
pub mod product;
pub mod stats;
pub mod user;

pub use category::*;
pub use common::*;
pub use product::*;
pub use stats::*;
pub use user::*;
