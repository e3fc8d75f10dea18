//! `POST /echo` endpoint module

use hydra_plugin_api::prelude::*;

/// Echoes the request body back
#[derive(Debug, Default)]
pub struct EchoEndpoint;

impl Endpoint for EchoEndpoint {
    fn route_info(&self) -> RouteInfo {
        RouteInfo::new("/echo", "POST", "Echo back the request body")
    }

    fn handle(&self, body: &[u8]) -> Vec<u8> {
        // Invalid UTF-8 is replaced rather than rejected.
        format!("📢 Echo: {}", String::from_utf8_lossy(body)).into_bytes()
    }
}

hydra_plugin_api::export_endpoint!(EchoEndpoint);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo() {
        assert_eq!(EchoEndpoint.handle(b"ping"), "📢 Echo: ping".as_bytes());
        assert_eq!(EchoEndpoint.handle(b""), "📢 Echo: ".as_bytes());
    }

    #[test]
    fn test_route() {
        let info = EchoEndpoint.route_info();
        assert_eq!(info.method, "POST");
        assert_eq!(info.path, "/echo");
    }
}
