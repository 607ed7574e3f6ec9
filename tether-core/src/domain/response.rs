//! Response domain type

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::JsonObject;
use crate::domain::request::CLIENT_REQUEST_ID;

/// A handler result addressed back to the client that asked for it
///
/// This is the handler's JSON object with `client_request_id` merged in so
/// the hub can route it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Response(JsonObject);

impl Response {
    /// Attaches the originating request id to a handler result
    ///
    /// An id already present in the result is overwritten.
    pub fn new(mut result: JsonObject, client_request_id: &str) -> Self {
        result.insert(
            CLIENT_REQUEST_ID.to_string(),
            Value::String(client_request_id.to_string()),
        );
        Self(result)
    }

    /// A `{success: false, error}` response for the given request
    pub fn failure(client_request_id: &str, error: impl Into<String>) -> Self {
        Self::new(error_object(error), client_request_id)
    }

    pub fn client_request_id(&self) -> Option<&str> {
        self.0.get(CLIENT_REQUEST_ID).and_then(Value::as_str)
    }

    pub fn as_object(&self) -> &JsonObject {
        &self.0
    }
}

/// Builds the `{success: false, error}` object used for failed requests
pub fn error_object(error: impl Into<String>) -> JsonObject {
    let mut obj = JsonObject::new();
    obj.insert("success".to_string(), Value::Bool(false));
    obj.insert("error".to_string(), Value::String(error.into()));
    obj
}
