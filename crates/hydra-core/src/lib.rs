//! # Hydra Core
//!
//! Core types and error handling for the Hydra plugin runtime.
//!
//! This crate provides the foundational abstractions shared by the runtime crates:
//! - Error types
//! - Dispatch outcomes and their HTTP status mapping

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used HTTP types
pub use bytes::Bytes;
pub use http::StatusCode;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::*;
}
