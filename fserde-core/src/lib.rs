//! fserde core library
//!
//! This crate provides the error type and the small shared types used by the
//! frame codec, the capture writer and the command line front end.

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
