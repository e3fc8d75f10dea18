//! Route metadata declared by endpoint modules

use serde::{Deserialize, Serialize};
use std::fmt;

/// Route metadata declared by an endpoint
///
/// `path` alone is not unique: two endpoints may share a path with different
/// methods. Use [`RouteInfo::key`] wherever a route has to be identified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteInfo {
    /// Request path, e.g. `/hello`
    pub path: String,

    /// HTTP method, e.g. `GET`
    pub method: String,

    /// Human readable description
    #[serde(default)]
    pub description: String,
}

impl RouteInfo {
    /// Create route metadata
    pub fn new(
        path: impl Into<String>,
        method: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            description: description.into(),
        }
    }

    /// Identity of this route for routing purposes
    pub fn key(&self) -> RouteKey {
        RouteKey::new(&self.path, &self.method)
    }
}

impl fmt::Display for RouteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// The `(path, method)` pair routes are keyed by
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteKey {
    /// Request path
    pub path: String,
    /// HTTP method
    pub method: String,
}

impl RouteKey {
    /// Create a route key
    pub fn new(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}
