//! Response batcher
//!
//! Completed responses are collected for one bundle window and delivered to
//! the hub in a single POST. The first response of a window arms the flush
//! timer; later ones just join the buffer.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tether_core::domain::response::Response;
use tracing::{debug, error};

use crate::repository::HubRepository;

#[derive(Default)]
struct PendingResponses {
    responses: Vec<Response>,
    flush_scheduled: bool,
}

/// Batches completed responses for delivery to the hub
///
/// Delivery is at-most-once: a failed POST is logged and its responses are
/// not re-queued.
pub struct ResponseBatcher {
    hub: Arc<dyn HubRepository>,
    bundle_time: Duration,
    pending: Mutex<PendingResponses>,
}

impl ResponseBatcher {
    /// Creates a new batcher
    ///
    /// # Arguments
    /// * `hub` - Where batches are delivered
    /// * `bundle_time` - How long a window stays open after its first response
    pub fn new(hub: Arc<dyn HubRepository>, bundle_time: Duration) -> Arc<Self> {
        Arc::new(Self {
            hub,
            bundle_time,
            pending: Mutex::new(PendingResponses::default()),
        })
    }

    /// Adds a response to the current window, opening one if needed
    pub fn schedule(self: &Arc<Self>, response: Response) {
        let arm_timer = {
            let mut pending = self.pending.lock();
            pending.responses.push(response);
            !std::mem::replace(&mut pending.flush_scheduled, true)
        };

        if arm_timer {
            let batcher = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(batcher.bundle_time).await;
                let responses = {
                    let mut pending = batcher.pending.lock();
                    pending.flush_scheduled = false;
                    std::mem::take(&mut pending.responses)
                };
                batcher.deliver(responses).await;
            });
        }
    }

    /// Delivers everything buffered so far
    ///
    /// Returns the number of responses sent. An empty buffer sends nothing.
    /// An armed window timer stays armed and closes its window as usual.
    pub async fn flush_now(&self) -> usize {
        let responses = std::mem::take(&mut self.pending.lock().responses);
        self.deliver(responses).await
    }

    async fn deliver(&self, responses: Vec<Response>) -> usize {
        if responses.is_empty() {
            return 0;
        }

        let count = responses.len();
        debug!("Posting {} response(s) to client requests", count);

        match self.hub.post_responses(responses).await {
            Ok(ack) if ack.success => {}
            Ok(ack) => error!(
                "Error sending responses to client requests: {}",
                ack.error.unwrap_or_else(|| "hub reported failure".to_string())
            ),
            Err(e) => error!("Error sending responses to client requests: {:#}", e),
        }

        count
    }

    /// Number of responses waiting for the next flush
    #[cfg(test)]
    pub fn pending_len(&self) -> usize {
        self.pending.lock().responses.len()
    }
}
