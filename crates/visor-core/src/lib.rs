//! Domain layer for the Visor client core.
//!
//! This crate holds the data model (sessions, messages, product
//! information), the error taxonomy, the remote capability traits and the
//! client configuration. It performs no I/O itself; the interaction crate
//! implements the gateways and the application crate orchestrates them.

pub mod config;
pub mod error;
pub mod gateway;
pub mod image;
pub mod outcome;
pub mod product;
pub mod session;

// Re-export common error type
pub use error::{Result, VisorError};
pub use outcome::MutationOutcome;
