//! Hub repository
//!
//! Handles communication with the hub:
//! - Polling for client requests and cancel notices
//! - Delivering batches of completed responses
//! - Building the per-request download delivery URL

use anyhow::{Context, Result};
use async_trait::async_trait;
use tether_client::HubClient;
use tether_core::domain::poll::PollResponse;
use tether_core::domain::response::Response;
use tether_core::dto::hub::HubAck;

/// Repository trait for hub operations
#[async_trait]
pub trait HubRepository: Send + Sync {
    /// Issues one poll
    ///
    /// A transport or parse failure is an `Err`; a `success: false` reply
    /// from the hub is an `Ok` the caller must inspect.
    async fn poll(&self) -> Result<PollResponse>;

    /// Delivers completed responses in a single POST
    ///
    /// # Arguments
    /// * `responses` - The responses, in the order they completed
    async fn post_responses(&self, responses: Vec<Response>) -> Result<HubAck>;

    /// URL a download handler streams the bytes for `client_request_id` to
    fn download_response_url(&self, client_request_id: &str) -> Result<String>;
}

/// HTTP implementation of HubRepository
pub struct HttpHubRepository {
    client: HubClient,
}

impl HttpHubRepository {
    /// Creates a new HTTP hub repository
    ///
    /// # Arguments
    /// * `client` - Hub client carrying the subserver name and passcode
    pub fn new(client: HubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HubRepository for HttpHubRepository {
    async fn poll(&self) -> Result<PollResponse> {
        self.client
            .poll()
            .await
            .with_context(|| format!("Problem in poll request to {}", self.client.base_url()))
    }

    async fn post_responses(&self, responses: Vec<Response>) -> Result<HubAck> {
        self.client
            .post_responses(responses)
            .await
            .context("Failed to post responses to hub")
    }

    fn download_response_url(&self, client_request_id: &str) -> Result<String> {
        self.client
            .download_response_url(client_request_id)
            .context("Failed to build download response URL")
    }
}
