//! Dispatch outcome types shared by the runtime and the HTTP front end

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body returned when no route matches
pub const NOT_FOUND_BODY: &str = "404 - Endpoint not found";

/// Body returned when no root plugin is loaded
pub const UNAVAILABLE_BODY: &str = "Plugin not loaded";

/// Outcome class of a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// An endpoint handled the request
    Ok,
    /// No loaded router knows the (path, method) pair
    NotFound,
    /// No root plugin is currently loaded
    Unavailable,
}

impl DispatchStatus {
    /// HTTP status code for this outcome
    pub fn to_status_code(self) -> http::StatusCode {
        match self {
            Self::Ok => http::StatusCode::OK,
            Self::NotFound => http::StatusCode::NOT_FOUND,
            Self::Unavailable => http::StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::NotFound => write!(f, "not_found"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Response produced by dispatching a request through the plugin graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResponse {
    /// Outcome class
    pub status: DispatchStatus,
    /// Response body
    pub body: Bytes,
}

impl DispatchResponse {
    /// Successful response carrying an endpoint's output
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: DispatchStatus::Ok,
            body: body.into(),
        }
    }

    /// Sentinel "not found" response
    pub fn not_found() -> Self {
        Self {
            status: DispatchStatus::NotFound,
            body: Bytes::from_static(NOT_FOUND_BODY.as_bytes()),
        }
    }

    /// Sentinel "service unavailable" response
    pub fn unavailable() -> Self {
        Self {
            status: DispatchStatus::Unavailable,
            body: Bytes::from_static(UNAVAILABLE_BODY.as_bytes()),
        }
    }

    /// Whether an endpoint handled the request
    pub fn is_ok(&self) -> bool {
        self.status == DispatchStatus::Ok
    }

    /// Body as UTF-8 text, lossy
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_status_serde() {
        let json = serde_json::to_string(&DispatchStatus::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");

        let status: DispatchStatus = serde_json::from_str("\"unavailable\"").unwrap();
        assert_eq!(status, DispatchStatus::Unavailable);
    }

    #[test]
    fn test_dispatch_status_codes() {
        assert_eq!(DispatchStatus::Ok.to_status_code(), http::StatusCode::OK);
        assert_eq!(
            DispatchStatus::NotFound.to_status_code(),
            http::StatusCode::NOT_FOUND
        );
        assert_eq!(
            DispatchStatus::Unavailable.to_status_code(),
            http::StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_sentinel_bodies() {
        assert_eq!(DispatchResponse::not_found().text(), NOT_FOUND_BODY);
        assert_eq!(DispatchResponse::unavailable().text(), UNAVAILABLE_BODY);
        assert!(DispatchResponse::ok("hi").is_ok());
    }
}
