//! `GET /time` endpoint module

use chrono::{SecondsFormat, Utc};
use hydra_plugin_api::prelude::*;

/// Reports the current UTC time
#[derive(Debug, Default)]
pub struct TimeEndpoint;

impl Endpoint for TimeEndpoint {
    fn route_info(&self) -> RouteInfo {
        RouteInfo::new("/time", "GET", "Get current time")
    }

    fn handle(&self, _body: &[u8]) -> Vec<u8> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        format!("🕒 Current time: {now}").into_bytes()
    }
}

hydra_plugin_api::export_endpoint!(TimeEndpoint);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_parseable_time() {
        let body = String::from_utf8(TimeEndpoint.handle(b"")).unwrap();
        let stamp = body.strip_prefix("🕒 Current time: ").unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }
}
