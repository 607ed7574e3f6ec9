//! Tether HTTP Client
//!
//! Type-safe HTTP clients for the two services a subserver talks to:
//! - [`HubClient`]: the public relay hub (polls, batched responses, download URLs)
//! - [`OriginClient`]: the local origin server that does the actual work
//!
//! Both sit on top of [`Transport`], which owns the raw JSON and streaming
//! primitives.
//!
//! # Example
//!
//! ```no_run
//! use tether_client::HubClient;
//!
//! #[tokio::main]
//! async fn main() -> tether_client::Result<()> {
//!     let hub = HubClient::new("http://hub.example.org", "lab-node", "secret");
//!
//!     let poll = hub.poll().await?;
//!     println!("used: {}", poll.used);
//!     Ok(())
//! }
//! ```

pub mod error;
mod hub;
mod origin;
pub mod transport;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use origin::OriginClient;
pub use transport::Transport;

/// HTTP client for the relay hub
///
/// Every hub endpoint lives under `{base_url}/from_subserver/{name}` and is
/// selected with a `request_type` query parameter; the passcode rides along
/// on each call.
#[derive(Debug, Clone)]
pub struct HubClient {
    /// Base URL of the hub (e.g., "https://hub.example.org")
    base_url: String,
    /// Name this subserver is registered under
    subserver_name: String,
    subserver_passcode: String,
    transport: Transport,
}

impl HubClient {
    /// Create a new hub client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the hub
    /// * `subserver_name` - The name this subserver is registered under
    /// * `subserver_passcode` - The passcode for that name
    pub fn new(
        base_url: impl Into<String>,
        subserver_name: impl Into<String>,
        subserver_passcode: impl Into<String>,
    ) -> Self {
        Self::with_transport(base_url, subserver_name, subserver_passcode, Transport::new())
    }

    /// Create a new hub client on an existing transport
    ///
    /// This allows sharing one connection pool with the origin client.
    pub fn with_transport(
        base_url: impl Into<String>,
        subserver_name: impl Into<String>,
        subserver_passcode: impl Into<String>,
        transport: Transport,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            subserver_name: subserver_name.into(),
            subserver_passcode: subserver_passcode.into(),
            transport,
        }
    }

    /// Get the base URL of the hub
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn subserver_name(&self) -> &str {
        &self.subserver_name
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// The per-subserver endpoint all hub calls go to
    fn endpoint(&self) -> String {
        format!("{}/from_subserver/{}", self.base_url, self.subserver_name)
    }
}
