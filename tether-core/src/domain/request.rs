//! Client request domain type

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::JsonObject;

/// Field carrying the hub-assigned request id
pub const CLIENT_REQUEST_ID: &str = "client_request_id";

/// A request queued at the hub by a client and handed to this subserver
///
/// The body is opaque to the relay apart from a handful of routing fields.
/// It is never modified after it has been received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientRequest(JsonObject);

impl ClientRequest {
    /// Wraps a JSON object received from the hub
    pub fn new(fields: JsonObject) -> Self {
        Self(fields)
    }

    /// Builds a request from any JSON value
    ///
    /// Anything other than an object (including `null`) becomes an empty
    /// request, which then has no id and is dropped by the dispatcher.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self(fields),
            _ => Self::default(),
        }
    }

    /// The hub-assigned id, if present and non-empty
    pub fn client_request_id(&self) -> Option<&str> {
        self.non_empty_str(CLIENT_REQUEST_ID)
    }

    /// The action discriminator (`a`)
    pub fn action(&self) -> Option<&str> {
        self.non_empty_str("a")
    }

    /// Whether the client asked for a raw byte download
    pub fn is_download(&self) -> bool {
        self.0.get("download_mode").and_then(Value::as_str) == Some("true")
    }

    /// Path of the file to download, relative to the origin
    pub fn download_path(&self) -> Option<&str> {
        self.non_empty_str("download_path")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_object(&self) -> &JsonObject {
        &self.0
    }

    pub fn into_inner(self) -> JsonObject {
        self.0
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

impl From<JsonObject> for ClientRequest {
    fn from(fields: JsonObject) -> Self {
        Self::new(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: Value) -> ClientRequest {
        ClientRequest::from_value(value)
    }

    #[test]
    fn test_routing_fields() {
        let req = request(json!({
            "client_request_id": "r2",
            "a": "download",
            "download_mode": "true",
            "download_path": "out/result.dat"
        }));

        assert_eq!(req.client_request_id(), Some("r2"));
        assert_eq!(req.action(), Some("download"));
        assert!(req.is_download());
        assert_eq!(req.download_path(), Some("out/result.dat"));
    }

    #[test]
    fn test_empty_id_is_missing() {
        let req = request(json!({"client_request_id": "", "a": "ping"}));
        assert_eq!(req.client_request_id(), None);

        let req = request(json!({"a": "ping"}));
        assert_eq!(req.client_request_id(), None);
    }

    #[test]
    fn test_download_mode_must_be_the_string_true() {
        assert!(!request(json!({"download_mode": true})).is_download());
        assert!(!request(json!({"download_mode": "false"})).is_download());
        assert!(!request(json!({})).is_download());
    }

    #[test]
    fn test_non_object_becomes_empty_request() {
        let req = request(Value::Null);
        assert!(req.as_object().is_empty());
        assert_eq!(req.client_request_id(), None);
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let req = request(json!({"client_request_id": "r1", "a": "ping", "n": 3}));
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value, json!({"client_request_id": "r1", "a": "ping", "n": 3}));
    }
}
