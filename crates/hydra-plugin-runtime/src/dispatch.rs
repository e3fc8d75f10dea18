//! Request dispatch over a plugin snapshot

use crate::manager::PluginSnapshot;
use hydra_core::DispatchResponse;
use tracing::{debug, warn};

/// Route one request through `snapshot`
///
/// Controllers are scanned in snapshot order and the first router that
/// resolves `(path, method)` answers. A controller without a router is
/// skipped. With no snapshot the plugin is unavailable.
pub fn dispatch(
    snapshot: Option<&PluginSnapshot>,
    path: &str,
    method: &str,
    body: &[u8],
) -> DispatchResponse {
    let Some(snapshot) = snapshot else {
        return DispatchResponse::unavailable();
    };

    for controller in snapshot.controllers() {
        let Some(router) = controller.router() else {
            warn!(controller = %controller.name(), "Controller has no router, skipping");
            continue;
        };

        if let Some(endpoint) = router.resolve(path, method) {
            debug!(
                path,
                method,
                controller = %controller.name(),
                router = %router.name(),
                generation = snapshot.generation(),
                "Dispatching request"
            );
            return DispatchResponse::ok(endpoint.handle(body));
        }
    }

    debug!(path, method, "No route matched");
    DispatchResponse::not_found()
}
