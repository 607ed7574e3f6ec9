//! Hub DTOs

use serde::{Deserialize, Serialize};

use crate::domain::response::Response;

/// Values of the `request_type` query parameter understood by the hub
pub mod request_type {
    pub const POLL: &str = "poll";
    pub const RESPONSES_TO_CLIENT_REQUESTS: &str = "responses_to_client_requests";
    pub const RESPONSE_TO_CLIENT_DOWNLOAD: &str = "response_to_client_download";
}

/// Body of a batched response delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseBatch {
    pub responses: Vec<Response>,
}

/// The hub's acknowledgement of a delivery
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HubAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
