//! Poll domain types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::request::ClientRequest;

/// The hub's reply to a poll
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollResponse {
    #[serde(default)]
    pub success: bool,
    /// Whether the hub used this poll to deliver anything
    #[serde(default)]
    pub used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_from_client: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_client_request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What a poll response asks the subserver to do
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// The hub reported `success: false`
    Rejected(Option<String>),
    /// Nothing was delivered on this poll
    Idle,
    /// Client requests to dispatch, in hub order
    Requests(Vec<ClientRequest>),
    /// Cancel the named in-flight request
    Cancel(String),
    /// `used: true` with no payload the subserver understands
    Anomaly,
}

impl PollResponse {
    /// Classifies the response
    ///
    /// Requests win over a cancel notice when the hub sends both. An empty
    /// cancel id counts as absent.
    pub fn into_event(self) -> PollEvent {
        if !self.success {
            return PollEvent::Rejected(self.error);
        }
        if !self.used {
            return PollEvent::Idle;
        }
        if let Some(requests) = self.requests_from_client {
            return PollEvent::Requests(
                requests.into_iter().map(ClientRequest::from_value).collect(),
            );
        }
        match self.cancel_client_request_id {
            Some(id) if !id.is_empty() => PollEvent::Cancel(id),
            _ => PollEvent::Anomaly,
        }
    }
}
