//! Testing utilities for module authors and host tests
//!
//! In-memory capability implementations that stand in for loaded modules.

pub mod mocks;

pub use mocks::{FnEndpoint, StaticController, StaticEndpoint, StaticPlugin, StaticRouter};
