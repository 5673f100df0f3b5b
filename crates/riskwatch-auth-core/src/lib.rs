//! Riskwatch Auth Core - Login protocol primitives
//!
//! I/O-free building blocks for talking to the appliance:
//! - AES counter-mode cipher used to encrypt the login password
//! - Time-bucketed login key derivation
//! - Decode-only session token introspection

pub mod crypto;
pub mod error;
pub mod token;

pub use crypto::*;
pub use error::*;
pub use token::*;
