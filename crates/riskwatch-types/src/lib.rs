//! Riskwatch Types - Shared domain types
//!
//! This crate contains the plain data shared by the riskwatch crates:
//! - Stored credentials and login challenge types
//! - Time windows and range partitioning
//! - Query batch state and per-window outcomes

pub mod auth;
pub mod batch;
pub mod credential;
pub mod error;
pub mod window;

pub use auth::*;
pub use batch::*;
pub use credential::*;
pub use error::*;
pub use window::*;
