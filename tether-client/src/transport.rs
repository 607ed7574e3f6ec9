//! JSON and streaming HTTP primitives
//!
//! Both the hub and origin clients go through this layer. JSON calls always
//! come back as a typed [`Result`]: a body that does not parse is reported as
//! [`ClientError::ParseError`], never as a panic.

use reqwest::header::HeaderMap;
use reqwest::{Body, Client};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ClientError, Result};

/// Thin wrapper around a shared `reqwest::Client`
#[derive(Debug, Clone, Default)]
pub struct Transport {
    client: Client,
}

impl Transport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Use a pre-configured client (timeouts, proxies, TLS)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Client that gives up on unreachable peers and probes idle connections
    ///
    /// No overall request timeout is set: hub polls are held open for as long
    /// as the hub likes, and downloads take as long as they take.
    pub fn with_timeouts(connect_timeout: Duration, tcp_keepalive: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .tcp_keepalive(tcp_keepalive)
            .build()?;
        Ok(Self::with_client(client))
    }

    /// GET a URL and parse the JSON reply
    pub async fn get_json<Q, T>(&self, url: &str, query: &Q) -> Result<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("GET {}", url);
        let response = self.client.get(url).query(query).send().await?;
        handle_response(response).await
    }

    /// POST a JSON body and parse the JSON reply
    pub async fn post_json<Q, B, T>(&self, url: &str, query: &Q, body: &B) -> Result<T>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST {}", url);
        let response = self.client.post(url).query(query).json(body).send().await?;
        handle_response(response).await
    }

    /// Same as [`Transport::post_json`], but gives up with
    /// [`ClientError::Aborted`] as soon as `cancel` fires
    ///
    /// Dropping the in-flight request closes its connection.
    pub async fn post_json_cancellable<Q, B, T>(
        &self,
        url: &str,
        query: &Q,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<T>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tokio::select! {
            _ = cancel.cancelled() => Err(ClientError::Aborted),
            result = self.post_json(url, query, body) => result,
        }
    }

    /// Start a GET whose body will be consumed incrementally
    ///
    /// Resolves once the response headers are in. Non-success statuses are
    /// errors so an error page is never relayed as file content.
    pub async fn get_stream(&self, url: &str) -> Result<reqwest::Response> {
        debug!("GET (stream) {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::api_error(status.as_u16(), message));
        }
        Ok(response)
    }

    /// POST a streamed body and return the raw reply text
    ///
    /// The caller decides how to interpret the reply.
    pub async fn post_stream(&self, url: &str, headers: HeaderMap, body: Body) -> Result<String> {
        debug!("POST (stream) {}", url);
        let response = self
            .client
            .post(url)
            .headers(headers)
            .body(body)
            .send()
            .await?;
        Ok(response.text().await?)
    }
}

/// Check the status code and deserialize the JSON body
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        ClientError::ParseError(format!("Failed to parse JSON response: {}: {}", e, text))
    })
}
