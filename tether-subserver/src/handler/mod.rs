//! Request handler layer
//!
//! The relay does not know how work is done. It hands every client request
//! to a [`RequestHandler`] and forwards whatever comes back. The returned
//! future resolving is the request's single completion.

mod origin;

use async_trait::async_trait;
use tether_core::JsonObject;
use tether_core::domain::download::DownloadReport;
use tether_core::domain::request::ClientRequest;

use crate::service::OnClose;

pub use origin::OriginServerHandler;

/// Local capability that executes client requests
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handles a plain request
    ///
    /// The returned object is sent back to the client with the request id
    /// attached. Cleanup that must run if the hub cancels the request can be
    /// registered through `on_close`.
    async fn handle_request(&self, request: ClientRequest, on_close: OnClose) -> JsonObject;

    /// Handles a download request
    ///
    /// The handler delivers the bytes to `response_url` itself; the report
    /// only tells the relay how that went.
    async fn handle_download_request(
        &self,
        request: ClientRequest,
        on_close: OnClose,
        response_url: String,
    ) -> DownloadReport;
}
