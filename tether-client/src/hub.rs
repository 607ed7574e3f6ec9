//! Hub endpoints

use reqwest::Url;
use tether_core::domain::poll::PollResponse;
use tether_core::domain::response::Response;
use tether_core::dto::hub::{HubAck, ResponseBatch, request_type};

use crate::HubClient;
use crate::error::{ClientError, Result};

impl HubClient {
    // =============================================================================
    // Polling
    // =============================================================================

    /// Ask the hub for queued work
    ///
    /// The hub may hold the request open until it has something to hand out.
    pub async fn poll(&self) -> Result<PollResponse> {
        self.transport
            .get_json(
                &self.endpoint(),
                &[
                    ("request_type", request_type::POLL),
                    ("subserver_passcode", self.subserver_passcode.as_str()),
                ],
            )
            .await
    }

    // =============================================================================
    // Response Delivery
    // =============================================================================

    /// Deliver a batch of completed responses in one POST
    pub async fn post_responses(&self, responses: Vec<Response>) -> Result<HubAck> {
        self.transport
            .post_json(
                &self.endpoint(),
                &[
                    ("request_type", request_type::RESPONSES_TO_CLIENT_REQUESTS),
                    ("subserver_passcode", self.subserver_passcode.as_str()),
                ],
                &ResponseBatch { responses },
            )
            .await
    }

    /// Fully qualified URL a download handler streams its bytes to
    ///
    /// # Arguments
    /// * `client_request_id` - The request the download answers
    pub fn download_response_url(&self, client_request_id: &str) -> Result<String> {
        let mut url = Url::parse(&self.endpoint())
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", self.endpoint(), e)))?;
        url.query_pairs_mut()
            .append_pair("request_type", request_type::RESPONSE_TO_CLIENT_DOWNLOAD)
            .append_pair("client_request_id", client_request_id)
            .append_pair("subserver_passcode", &self.subserver_passcode);
        Ok(url.into())
    }
}
