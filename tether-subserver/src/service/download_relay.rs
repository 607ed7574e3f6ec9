//! Download relay
//!
//! Streams a file from the origin to the hub without holding it in memory.
//!
//! Two legs run side by side:
//! - the reader pulls chunks off the origin GET and hands them over a
//!   single-slot channel
//! - the writer is the hub POST, whose body is fed from that channel
//!
//! Both legs share a cancellation token. Whichever leg fails cancels it and
//! the other leg stops at its next await, so a relay is never left half open.

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::Body;
use reqwest::Url;
use reqwest::header::{
    CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tether_client::{OriginClient, Transport};
use tether_core::domain::download::DownloadReport;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How the origin leg ended
#[derive(Debug)]
enum ReaderOutcome {
    /// Origin body fully handed to the writer
    Finished,
    /// Origin stream broke
    Failed(String),
    /// Stopped because the token was cancelled or the writer went away
    Stopped,
}

/// Relays origin downloads to the hub
#[derive(Debug, Clone)]
pub struct DownloadRelayProxy {
    origin: OriginClient,
    transport: Transport,
}

impl DownloadRelayProxy {
    /// Creates a new relay
    ///
    /// # Arguments
    /// * `origin` - Where files are read from
    /// * `transport` - Used for the streamed POST to the hub
    pub fn new(origin: OriginClient, transport: Transport) -> Self {
        Self { origin, transport }
    }

    /// Relays `download_path` from the origin to `response_url`
    ///
    /// `response_url` is the hub delivery URL for the request;
    /// `download_mode=true` is appended before posting. Cancelling `cancel`
    /// tears down both legs.
    pub async fn relay(
        &self,
        download_path: &str,
        response_url: &str,
        cancel: CancellationToken,
    ) -> DownloadReport {
        let get_url = self.origin.download_url(download_path);
        let post_url = match with_download_mode(response_url) {
            Ok(url) => url,
            Err(e) => {
                warn!("Invalid download response URL {}: {}", response_url, e);
                return DownloadReport::failed(format!("Invalid response url: {}", response_url), 0);
            }
        };

        let origin_response = tokio::select! {
            _ = cancel.cancelled() => {
                return DownloadReport::failed("Download relay cancelled", 0);
            }
            result = self.origin.open_download(download_path) => match result {
                Ok(response) => response,
                Err(e) => {
                    warn!("Origin GET {} failed: {}", get_url, e);
                    return DownloadReport::failed(format!("Problem in http get: {}", get_url), 0);
                }
            },
        };

        let headers = relay_headers(origin_response.headers(), download_path);
        info!(
            "Relaying {} to hub ({} bytes announced)",
            download_path,
            origin_response
                .content_length()
                .map_or_else(|| "unknown".to_string(), |n| n.to_string())
        );

        let relay_token = cancel.child_token();
        let bytes_posted = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::channel::<std::io::Result<Bytes>>(1);

        let reader = tokio::spawn(pump_origin(origin_response, tx, relay_token.clone()));

        let counter = Arc::clone(&bytes_posted);
        let body_stream = ReceiverStream::new(rx).inspect(move |chunk| {
            if let Ok(chunk) = chunk {
                counter.fetch_add(chunk.len() as u64, Ordering::Relaxed);
            }
        });

        let posted = tokio::select! {
            _ = relay_token.cancelled() => None,
            result = self.transport.post_stream(&post_url, headers, Body::wrap_stream(body_stream)) => Some(result),
        };

        // Stops the reader if the writer ended first
        relay_token.cancel();
        let reader_outcome = reader
            .await
            .unwrap_or_else(|e| ReaderOutcome::Failed(format!("reader task failed: {}", e)));
        let num_bytes_posted = bytes_posted.load(Ordering::Relaxed);

        if let ReaderOutcome::Failed(reason) = reader_outcome {
            warn!("Origin stream {} failed: {}", get_url, reason);
            return DownloadReport::failed(format!("Problem in http get: {}", get_url), num_bytes_posted);
        }

        match posted {
            Some(Ok(body)) => {
                let report = DownloadReport::from_hub_reply(&body, num_bytes_posted);
                debug!(
                    "Relay of {} finished: success={}, {} bytes",
                    download_path, report.success, num_bytes_posted
                );
                report
            }
            Some(Err(e)) => {
                warn!("Hub POST {} failed: {}", response_url, e);
                DownloadReport::failed(
                    format!("Problem in http post: {}", response_url),
                    num_bytes_posted,
                )
            }
            None => DownloadReport::failed("Download relay cancelled", num_bytes_posted),
        }
    }
}

/// Reader leg: copies origin chunks into the writer's channel
///
/// The channel holds one chunk, so at most one chunk waits for the hub.
async fn pump_origin(
    response: reqwest::Response,
    tx: mpsc::Sender<std::io::Result<Bytes>>,
    token: CancellationToken,
) -> ReaderOutcome {
    let mut stream = response.bytes_stream();

    loop {
        let next = tokio::select! {
            _ = token.cancelled() => return ReaderOutcome::Stopped,
            next = stream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                tokio::select! {
                    _ = token.cancelled() => return ReaderOutcome::Stopped,
                    sent = tx.send(Ok(chunk)) => {
                        if sent.is_err() {
                            return ReaderOutcome::Stopped;
                        }
                    }
                }
            }
            Some(Err(e)) => {
                token.cancel();
                return ReaderOutcome::Failed(e.to_string());
            }
            // Dropping `tx` ends the POST body
            None => return ReaderOutcome::Finished,
        }
    }
}

/// Headers for the hub POST, derived from the origin response
fn relay_headers(origin: &HeaderMap, download_path: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(length) = origin.get(CONTENT_LENGTH) {
        headers.insert(CONTENT_LENGTH, length.clone());
    }
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    let disposition = format!("attachment; filename=\"{}\"", file_name(download_path));
    match HeaderValue::from_str(&disposition) {
        Ok(value) => {
            headers.insert(CONTENT_DISPOSITION, value);
        }
        Err(_) => debug!("Skipping content-disposition for {}", download_path),
    }
    headers
}

fn file_name(download_path: &str) -> &str {
    Path::new(download_path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(download_path)
}

fn with_download_mode(response_url: &str) -> anyhow::Result<String> {
    let mut url = Url::parse(response_url)?;
    url.query_pairs_mut().append_pair("download_mode", "true");
    Ok(url.into())
}
