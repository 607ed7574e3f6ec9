//! Scheduler layer for the subserver
//!
//! This layer drives the poll loop against the hub and hands whatever a poll
//! delivers to the service layer.

pub mod poller;

pub use poller::PollScheduler;
