//! Download relay outcome

use serde::{Deserialize, Serialize};

use crate::JsonObject;

/// Final result of relaying a download to the hub
///
/// On success this is the hub's own JSON reply to the streamed POST, with
/// `num_bytes_posted` stamped on by the relay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadReport {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub num_bytes_posted: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Remaining fields of the hub reply
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl DownloadReport {
    /// A failed relay that got `num_bytes_posted` bytes out before stopping
    pub fn failed(error: impl Into<String>, num_bytes_posted: u64) -> Self {
        Self {
            success: false,
            num_bytes_posted,
            error: Some(error.into()),
            extra: JsonObject::new(),
        }
    }

    /// Parses the hub's reply to a download POST
    ///
    /// A reply that is not a JSON object turns into a failed report; the byte
    /// count is kept either way.
    pub fn from_hub_reply(body: &str, num_bytes_posted: u64) -> Self {
        match serde_json::from_str::<DownloadReport>(body) {
            Ok(mut report) => {
                report.num_bytes_posted = num_bytes_posted;
                report
            }
            Err(_) => Self::failed("Error parsing response from hub", num_bytes_posted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hub_reply_gets_byte_count() {
        let report = DownloadReport::from_hub_reply(r#"{"success":true,"note":"ok"}"#, 1000);
        assert!(report.success);
        assert_eq!(report.num_bytes_posted, 1000);
        assert_eq!(report.extra.get("note"), Some(&json!("ok")));
    }

    #[test]
    fn test_hub_byte_count_is_overwritten() {
        let report = DownloadReport::from_hub_reply(r#"{"success":true,"num_bytes_posted":7}"#, 12);
        assert_eq!(report.num_bytes_posted, 12);
    }

    #[test]
    fn test_unparseable_hub_reply() {
        let report = DownloadReport::from_hub_reply("<html>502</html>", 64);
        assert!(!report.success);
        assert_eq!(report.num_bytes_posted, 64);
        assert_eq!(report.error.as_deref(), Some("Error parsing response from hub"));
    }

    #[test]
    fn test_failed_report_serialization() {
        let report = DownloadReport::failed("Problem in http get", 0);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({"success": false, "num_bytes_posted": 0, "error": "Problem in http get"})
        );
    }
}
