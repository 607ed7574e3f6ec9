//! Subserver context
//!
//! Owns the long-lived components of one subserver instance and wires them
//! together. Every component is injected rather than global, so tests can
//! run several independent instances in one process.

use std::sync::Arc;

use crate::config::Config;
use crate::handler::RequestHandler;
use crate::repository::HubRepository;
use crate::service::{CancellationTracker, RequestDispatcher, ResponseBatcher};

/// Shared state of one subserver instance
pub struct SubserverContext {
    pub config: Config,
    pub hub: Arc<dyn HubRepository>,
    pub tracker: Arc<CancellationTracker>,
    pub batcher: Arc<ResponseBatcher>,
    pub dispatcher: Arc<RequestDispatcher>,
}

impl SubserverContext {
    /// Builds the component graph around a hub and a local handler
    ///
    /// # Arguments
    /// * `config` - Validated subserver configuration
    /// * `hub` - Hub the subserver polls and delivers to
    /// * `handler` - Local capability that executes client requests
    pub fn new(
        config: Config,
        hub: Arc<dyn HubRepository>,
        handler: Arc<dyn RequestHandler>,
    ) -> Self {
        let tracker = Arc::new(CancellationTracker::new());
        let batcher = ResponseBatcher::new(Arc::clone(&hub), config.bundle_time);
        let dispatcher = Arc::new(RequestDispatcher::new(
            handler,
            Arc::clone(&tracker),
            Arc::clone(&batcher),
            Arc::clone(&hub),
        ));

        Self {
            config,
            hub,
            tracker,
            batcher,
            dispatcher,
        }
    }
}
