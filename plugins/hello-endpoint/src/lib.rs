//! `GET /hello` endpoint module

use hydra_plugin_api::prelude::*;

/// Answers with a fixed greeting
#[derive(Debug, Default)]
pub struct HelloEndpoint;

impl Endpoint for HelloEndpoint {
    fn route_info(&self) -> RouteInfo {
        RouteInfo::new("/hello", "GET", "Get greeting")
    }

    fn handle(&self, _body: &[u8]) -> Vec<u8> {
        "👋 Hello from hot-reloaded endpoint!".as_bytes().to_vec()
    }
}

hydra_plugin_api::export_endpoint!(HelloEndpoint);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting() {
        let endpoint = createEndpoint();
        assert_eq!(endpoint.route_info().key().to_string(), "GET /hello");
        assert_eq!(
            String::from_utf8(endpoint.handle(b"")).unwrap(),
            "👋 Hello from hot-reloaded endpoint!"
        );
    }
}
