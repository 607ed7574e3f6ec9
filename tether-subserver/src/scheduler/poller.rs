//! Poll scheduler
//!
//! Keeps a bounded number of long polls open against the hub. A short
//! housekeeping tick decides when the next poll may start; each poll runs in
//! its own task and feeds its reply to the dispatcher or the cancellation
//! tracker.

use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use tether_core::domain::poll::{PollEvent, PollResponse};
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::context::SubserverContext;
use crate::repository::HubRepository;
use crate::service::{CancellationTracker, RequestDispatcher};

/// Poll bookkeeping, only touched by the scheduler
#[derive(Debug, Default)]
struct PollState {
    active_polls: usize,
    last_poll_started: Option<Instant>,
}

impl PollState {
    /// Claims a poll slot if the concurrency budget and interval allow it
    fn try_begin(&mut self, max_polls: usize, poll_interval: Duration, now: Instant) -> bool {
        if self.active_polls >= max_polls {
            return false;
        }
        if let Some(last) = self.last_poll_started {
            if now.duration_since(last) <= poll_interval {
                return false;
            }
        }

        self.active_polls += 1;
        self.last_poll_started = Some(now);
        true
    }

    fn finish(&mut self) {
        self.active_polls = self.active_polls.saturating_sub(1);
    }
}

/// Drives the poll loop of one subserver
pub struct PollScheduler {
    hub: Arc<dyn HubRepository>,
    tracker: Arc<CancellationTracker>,
    dispatcher: Arc<RequestDispatcher>,
    state: Mutex<PollState>,
    desired_concurrent_polls: usize,
    poll_interval: Duration,
    housekeeping_interval: Duration,
    status_interval: Duration,
}

impl PollScheduler {
    /// Creates a new scheduler over the components of `context`
    pub fn new(context: &SubserverContext) -> Arc<Self> {
        Arc::new(Self {
            hub: Arc::clone(&context.hub),
            tracker: Arc::clone(&context.tracker),
            dispatcher: Arc::clone(&context.dispatcher),
            state: Mutex::new(PollState::default()),
            desired_concurrent_polls: context.config.desired_concurrent_polls,
            poll_interval: context.config.poll_interval,
            housekeeping_interval: context.config.housekeeping_interval,
            status_interval: context.config.status_interval,
        })
    }

    /// Runs the poll loop until `shutdown` is cancelled
    ///
    /// Polls already in flight are left to finish on their own.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            "Starting poll loop ({} concurrent poll(s), interval: {:?})",
            self.desired_concurrent_polls, self.poll_interval
        );

        let mut ticker = time::interval(self.housekeeping_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_status = Instant::now();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Poll loop stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let now = Instant::now();
            if now.duration_since(last_status) >= self.status_interval {
                self.log_status();
                last_status = now;
            }

            self.maybe_start_poll(now);
        }
    }

    /// Starts a poll if a slot is free
    fn maybe_start_poll(self: &Arc<Self>, now: Instant) {
        let begin = self.state.lock().try_begin(
            self.desired_concurrent_polls,
            self.poll_interval,
            now,
        );
        if !begin {
            return;
        }

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let result = scheduler.hub.poll().await;
            scheduler.state.lock().finish();
            scheduler.handle_poll_result(result);
        });
    }

    /// Acts on the outcome of one poll
    ///
    /// A failed poll is not retried here; the interval gate starts the next
    /// one.
    fn handle_poll_result(&self, result: Result<PollResponse>) {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!("Poll failed: {:#}", e);
                return;
            }
        };

        debug!("Poll response: {:?}", response);

        match response.into_event() {
            PollEvent::Rejected(error) => warn!(
                "Hub rejected poll: {}",
                error.as_deref().unwrap_or("no error given")
            ),
            PollEvent::Idle => {}
            PollEvent::Requests(requests) => {
                for request in requests {
                    self.dispatcher.dispatch(request);
                }
            }
            PollEvent::Cancel(client_request_id) => {
                if self.tracker.cancel(&client_request_id) {
                    info!("Cancelled request {}", client_request_id);
                } else {
                    debug!(
                        "Cancel for unknown request {} ignored",
                        client_request_id
                    );
                }
            }
            PollEvent::Anomaly => {
                warn!("Unexpected problem: poll was used but carried no requests or cancel")
            }
        }
    }

    fn log_status(&self) {
        info!(
            "Status: {} active poll(s), {} active request(s)",
            self.active_polls(),
            self.tracker.active_count()
        );
    }

    fn active_polls(&self) -> usize {
        self.state.lock().active_polls
    }
}
