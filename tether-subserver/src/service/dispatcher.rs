//! Request dispatcher
//!
//! Turns each client request from a poll into a tracked, independently
//! running handler task:
//! - registers the request with the cancellation tracker
//! - picks the plain or download handler entry point
//! - on completion deregisters the request, then routes the result
//!
//! Plain results go to the response batcher. Download results are already
//! delivered by the time they complete and are only logged.

use std::sync::Arc;
use tether_core::domain::request::ClientRequest;
use tether_core::domain::response::Response;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::handler::RequestHandler;
use crate::repository::HubRepository;
use crate::service::{CancellationTracker, OnClose, ResponseBatcher};

/// Dispatches client requests to the local handler
pub struct RequestDispatcher {
    handler: Arc<dyn RequestHandler>,
    tracker: Arc<CancellationTracker>,
    batcher: Arc<ResponseBatcher>,
    hub: Arc<dyn HubRepository>,
}

impl RequestDispatcher {
    pub fn new(
        handler: Arc<dyn RequestHandler>,
        tracker: Arc<CancellationTracker>,
        batcher: Arc<ResponseBatcher>,
        hub: Arc<dyn HubRepository>,
    ) -> Self {
        Self {
            handler,
            tracker,
            batcher,
            hub,
        }
    }

    /// Starts handling one client request
    ///
    /// Returns the task running the handler, or `None` if the request was
    /// dropped. A request without an id is dropped without a reply since
    /// there is nothing to address one to.
    pub fn dispatch(&self, request: ClientRequest) -> Option<JoinHandle<()>> {
        info!(
            "Request from client: {}",
            request.action().unwrap_or("<no action>")
        );

        let Some(client_request_id) = request.client_request_id().map(str::to_string) else {
            warn!("Unexpected problem: client request without client_request_id dropped");
            return None;
        };

        if request.is_download() {
            let response_url = match self.hub.download_response_url(&client_request_id) {
                Ok(url) => url,
                Err(e) => {
                    error!(
                        "Dropping download request {}: {:#}",
                        client_request_id, e
                    );
                    return None;
                }
            };
            self.tracker.register(&client_request_id);
            Some(self.spawn_download(client_request_id, request, response_url))
        } else {
            self.tracker.register(&client_request_id);
            Some(self.spawn_request(client_request_id, request))
        }
    }

    fn spawn_request(&self, client_request_id: String, request: ClientRequest) -> JoinHandle<()> {
        let handler = Arc::clone(&self.handler);
        let tracker = Arc::clone(&self.tracker);
        let batcher = Arc::clone(&self.batcher);
        let on_close = OnClose::new(client_request_id.clone(), Arc::clone(&tracker));

        tokio::spawn(async move {
            // Run the handler in its own task so a panic still completes the request
            let outcome =
                tokio::spawn(async move { handler.handle_request(request, on_close).await }).await;

            let closed = tracker.deregister(&client_request_id);

            let response = match outcome {
                Ok(result) => Response::new(result, &client_request_id),
                Err(e) => {
                    error!("Handler for request {} failed: {}", client_request_id, e);
                    Response::failure(&client_request_id, "Request handler failed")
                }
            };

            if closed.is_some_and(|c| c.cancelled) {
                debug!(
                    "Request {} was cancelled by the hub, response dropped",
                    client_request_id
                );
                return;
            }

            batcher.schedule(response);
        })
    }

    fn spawn_download(
        &self,
        client_request_id: String,
        request: ClientRequest,
        response_url: String,
    ) -> JoinHandle<()> {
        let handler = Arc::clone(&self.handler);
        let tracker = Arc::clone(&self.tracker);
        let on_close = OnClose::new(client_request_id.clone(), Arc::clone(&tracker));

        tokio::spawn(async move {
            let outcome = tokio::spawn(async move {
                handler
                    .handle_download_request(request, on_close, response_url)
                    .await
            })
            .await;

            tracker.deregister(&client_request_id);

            match outcome {
                Ok(report) if report.success => info!(
                    "Download {} delivered ({} bytes)",
                    client_request_id, report.num_bytes_posted
                ),
                Ok(report) => warn!(
                    "Error handling request from client (handler was supposed to post download to the url): {}",
                    report.error.as_deref().unwrap_or("unknown error")
                ),
                Err(e) => error!(
                    "Download handler for request {} failed: {}",
                    client_request_id, e
                ),
            }
        })
    }
}
