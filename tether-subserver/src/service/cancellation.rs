//! Cancellation tracker
//!
//! Registry of in-flight client requests. Each active request owns a list of
//! close actions subscribed by whoever is working on it. A cancel notice from
//! the hub runs that list once, in subscription order.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

type CloseAction = Box<dyn FnOnce() + Send + 'static>;

/// Bookkeeping for one in-flight request
#[derive(Default)]
struct ActiveRequestRecord {
    actions: Vec<CloseAction>,
    cancelled: bool,
}

/// What was known about a request when it was deregistered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedRequest {
    /// A cancel notice reached the request before it completed
    pub cancelled: bool,
}

/// Tracks active requests and their close actions
///
/// Close actions always run outside the registry lock, so an action may
/// safely call back into the tracker.
#[derive(Default)]
pub struct CancellationTracker {
    records: Mutex<HashMap<String, ActiveRequestRecord>>,
}

impl CancellationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a request with no close actions
    pub fn register(&self, client_request_id: &str) {
        let previous = self
            .records
            .lock()
            .insert(client_request_id.to_string(), ActiveRequestRecord::default());
        if previous.is_some() {
            warn!(
                "Client request {} registered while still active",
                client_request_id
            );
        }
    }

    /// Adds a close action for a request
    ///
    /// If the request was already cancelled the action runs right away. If
    /// the request is no longer tracked the action is dropped unrun.
    pub fn subscribe(&self, client_request_id: &str, action: impl FnOnce() + Send + 'static) {
        {
            let mut records = self.records.lock();
            let Some(record) = records.get_mut(client_request_id) else {
                debug!(
                    "Close action for inactive request {} ignored",
                    client_request_id
                );
                return;
            };
            if !record.cancelled {
                record.actions.push(Box::new(action));
                return;
            }
        }
        action();
    }

    /// Runs every close action of a request
    ///
    /// Returns `true` if this call triggered the cancellation. Unknown ids and
    /// repeated cancels do nothing.
    pub fn cancel(&self, client_request_id: &str) -> bool {
        let actions = {
            let mut records = self.records.lock();
            match records.get_mut(client_request_id) {
                Some(record) if !record.cancelled => {
                    record.cancelled = true;
                    std::mem::take(&mut record.actions)
                }
                _ => return false,
            }
        };

        for action in actions {
            action();
        }
        true
    }

    /// Stops tracking a request
    ///
    /// Called once the request's handler has completed, before its response
    /// goes anywhere.
    pub fn deregister(&self, client_request_id: &str) -> Option<ClosedRequest> {
        self.records
            .lock()
            .remove(client_request_id)
            .map(|record| ClosedRequest {
                cancelled: record.cancelled,
            })
    }

    #[cfg(test)]
    pub fn is_active(&self, client_request_id: &str) -> bool {
        self.records.lock().contains_key(client_request_id)
    }

    pub fn active_count(&self) -> usize {
        self.records.lock().len()
    }
}

/// Subscription handle given to a request handler
///
/// Lets the handler register cleanup that runs if the hub cancels the
/// request.
#[derive(Clone)]
pub struct OnClose {
    client_request_id: String,
    tracker: Arc<CancellationTracker>,
}

impl OnClose {
    pub fn new(client_request_id: impl Into<String>, tracker: Arc<CancellationTracker>) -> Self {
        Self {
            client_request_id: client_request_id.into(),
            tracker,
        }
    }

    pub fn client_request_id(&self) -> &str {
        &self.client_request_id
    }

    /// Registers an action to run when the request is cancelled
    pub fn subscribe(&self, action: impl FnOnce() + Send + 'static) {
        self.tracker.subscribe(&self.client_request_id, action);
    }

    /// A token that is cancelled together with the request
    pub fn token(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let trigger = token.clone();
        self.subscribe(move || trigger.cancel());
        token
    }
}
