//! Origin server handler
//!
//! Forwards plain requests to the origin server as JSON and serves downloads
//! by relaying origin files to the hub.

use async_trait::async_trait;
use tether_client::OriginClient;
use tether_core::JsonObject;
use tether_core::domain::download::DownloadReport;
use tether_core::domain::request::ClientRequest;
use tether_core::domain::response::error_object;
use tracing::{debug, warn};

use crate::handler::RequestHandler;
use crate::service::{DownloadRelayProxy, OnClose};

/// [`RequestHandler`] backed by an HTTP origin server
pub struct OriginServerHandler {
    origin: OriginClient,
    relay: DownloadRelayProxy,
}

impl OriginServerHandler {
    pub fn new(origin: OriginClient, relay: DownloadRelayProxy) -> Self {
        Self { origin, relay }
    }
}

#[async_trait]
impl RequestHandler for OriginServerHandler {
    async fn handle_request(&self, request: ClientRequest, on_close: OnClose) -> JsonObject {
        let cancel = on_close.token();

        match self.origin.post_request(&request, &cancel).await {
            Ok(result) => result,
            Err(e) if e.is_aborted() => {
                debug!("Request {} aborted", on_close.client_request_id());
                error_object("Request cancelled")
            }
            Err(e) => {
                warn!(
                    "Origin request for {} failed: {}",
                    on_close.client_request_id(),
                    e
                );
                error_object(format!("Error in post: {}", self.origin.base_url()))
            }
        }
    }

    async fn handle_download_request(
        &self,
        request: ClientRequest,
        on_close: OnClose,
        response_url: String,
    ) -> DownloadReport {
        let Some(download_path) = request.download_path() else {
            return DownloadReport::failed("Expected download_path for download_mode=true", 0);
        };

        self.relay
            .relay(download_path, &response_url, on_close.token())
            .await
    }
}
