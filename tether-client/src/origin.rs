//! Origin server client
//!
//! The origin is the local HTTP service that actually processes requests and
//! serves files. The subserver forwards plain requests to it as JSON and
//! reads download bodies from it as a byte stream.

use tether_core::JsonObject;
use tether_core::domain::request::ClientRequest;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::transport::Transport;

const NO_QUERY: &[(&str, &str)] = &[];

/// HTTP client for the origin server
#[derive(Debug, Clone)]
pub struct OriginClient {
    base_url: String,
    transport: Transport,
}

impl OriginClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_transport(base_url, Transport::new())
    }

    pub fn with_transport(base_url: impl Into<String>, transport: Transport) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forward a client request and return the origin's JSON object
    ///
    /// Returns [`crate::ClientError::Aborted`] if `cancel` fires first.
    pub async fn post_request(
        &self,
        request: &ClientRequest,
        cancel: &CancellationToken,
    ) -> Result<JsonObject> {
        self.transport
            .post_json_cancellable(&self.base_url, NO_QUERY, request, cancel)
            .await
    }

    /// URL a download path is fetched from
    pub fn download_url(&self, download_path: &str) -> String {
        format!("{}/{}?download_mode=true", self.base_url, download_path)
    }

    /// Open a download; the body is read incrementally by the caller
    pub async fn open_download(&self, download_path: &str) -> Result<reqwest::Response> {
        self.transport
            .get_stream(&self.download_url(download_path))
            .await
    }
}
