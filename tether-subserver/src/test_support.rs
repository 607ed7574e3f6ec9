//! In-memory hub and handler used by the service and scheduler tests

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tether_core::JsonObject;
use tether_core::domain::download::DownloadReport;
use tether_core::domain::poll::PollResponse;
use tether_core::domain::request::ClientRequest;
use tether_core::domain::response::{Response, error_object};
use tether_core::dto::hub::HubAck;
use tokio::time::Instant;

use crate::handler::RequestHandler;
use crate::repository::HubRepository;
use crate::service::OnClose;

/// A `{success: true}` response for `id`
pub fn response(id: &str) -> Response {
    let mut result = JsonObject::new();
    result.insert("success".to_string(), Value::Bool(true));
    Response::new(result, id)
}

/// Scripted hub
///
/// Queued poll replies are returned immediately, in order. Once the queue is
/// empty a poll is held open for `IDLE_HOLD` and then answered `used: false`,
/// like a long poll that timed out.
#[derive(Default)]
pub struct MockHub {
    polls: Mutex<VecDeque<Option<PollResponse>>>,
    poll_starts: Mutex<Vec<Instant>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    posted: Mutex<Vec<Vec<Response>>>,
    post_attempts: AtomicUsize,
    fail_posts: AtomicBool,
}

impl MockHub {
    const IDLE_HOLD: Duration = Duration::from_secs(1);

    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a poll reply
    pub fn push_poll(&self, reply: Value) {
        let reply = serde_json::from_value(reply).expect("valid poll reply");
        self.polls.lock().push_back(Some(reply));
    }

    /// Queues a transport failure
    pub fn push_poll_error(&self) {
        self.polls.lock().push_back(None);
    }

    pub fn fail_posts(&self, fail: bool) {
        self.fail_posts.store(fail, Ordering::SeqCst);
    }

    pub fn poll_starts(&self) -> Vec<Instant> {
        self.poll_starts.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn post_attempts(&self) -> usize {
        self.post_attempts.load(Ordering::SeqCst)
    }

    /// Ids of every successfully posted batch
    pub fn posted_batches(&self) -> Vec<Vec<String>> {
        self.posted
            .lock()
            .iter()
            .map(|batch| {
                batch
                    .iter()
                    .map(|r| r.client_request_id().unwrap_or_default().to_string())
                    .collect()
            })
            .collect()
    }

    /// Every successfully posted response, in delivery order
    pub fn posted_responses(&self) -> Vec<Response> {
        self.posted.lock().iter().flatten().cloned().collect()
    }

    pub fn download_url_for(client_request_id: &str) -> String {
        format!(
            "http://hub.test/from_subserver/node?request_type=response_to_client_download&client_request_id={}&subserver_passcode=pc",
            client_request_id
        )
    }
}

#[async_trait]
impl HubRepository for MockHub {
    async fn poll(&self) -> Result<PollResponse> {
        self.poll_starts.lock().push(Instant::now());
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        let scripted = self.polls.lock().pop_front();
        let result = match scripted {
            Some(Some(reply)) => Ok(reply),
            Some(None) => Err(anyhow::anyhow!("connection refused")),
            None => {
                tokio::time::sleep(Self::IDLE_HOLD).await;
                Ok(PollResponse {
                    success: true,
                    used: false,
                    ..Default::default()
                })
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn post_responses(&self, responses: Vec<Response>) -> Result<HubAck> {
        self.post_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_posts.load(Ordering::SeqCst) {
            anyhow::bail!("hub unavailable");
        }
        self.posted.lock().push(responses);
        Ok(HubAck {
            success: true,
            error: None,
        })
    }

    fn download_response_url(&self, client_request_id: &str) -> Result<String> {
        Ok(Self::download_url_for(client_request_id))
    }
}

/// Handler whose behavior is picked by the request's `a` field
///
/// - `wait`: blocks until the request is cancelled
/// - `panic`: panics
/// - anything else: answers `{success: true, value: 42}`
///
/// Download requests record their response URL and report success.
#[derive(Default)]
pub struct TestHandler {
    seen: Mutex<Vec<String>>,
    closed: Mutex<Vec<String>>,
    download_urls: Mutex<Vec<String>>,
}

impl TestHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Ids of requests the handler has started
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }

    /// Ids whose close action has fired
    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().clone()
    }

    pub fn download_urls(&self) -> Vec<String> {
        self.download_urls.lock().clone()
    }

    pub async fn wait_started(&self, client_request_id: &str) {
        while !self.seen.lock().iter().any(|id| id == client_request_id) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

#[async_trait]
impl RequestHandler for TestHandler {
    async fn handle_request(&self, request: ClientRequest, on_close: OnClose) -> JsonObject {
        let id = on_close.client_request_id().to_string();
        self.seen.lock().push(id.clone());

        match request.action() {
            Some("wait") => {
                let cancelled = on_close.token();
                let closed = Arc::new(Mutex::new(false));
                let flag = Arc::clone(&closed);
                on_close.subscribe(move || *flag.lock() = true);
                cancelled.cancelled().await;
                if *closed.lock() {
                    self.closed.lock().push(id);
                }
                error_object("cancelled")
            }
            Some("panic") => panic!("handler blew up"),
            _ => match json!({"success": true, "value": 42}) {
                Value::Object(result) => result,
                _ => unreachable!(),
            },
        }
    }

    async fn handle_download_request(
        &self,
        _request: ClientRequest,
        on_close: OnClose,
        response_url: String,
    ) -> DownloadReport {
        self.seen
            .lock()
            .push(on_close.client_request_id().to_string());
        self.download_urls.lock().push(response_url);
        DownloadReport {
            success: true,
            ..Default::default()
        }
    }
}
