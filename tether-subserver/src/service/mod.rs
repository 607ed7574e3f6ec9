//! Service layer
//!
//! Services contain the relay logic of the subserver. They track in-flight
//! requests, dispatch them to the local handler and carry results back to
//! the hub through the hub repository.

mod batcher;
mod cancellation;
mod dispatcher;
mod download_relay;

pub use batcher::ResponseBatcher;
pub use cancellation::{CancellationTracker, OnClose};
pub use dispatcher::RequestDispatcher;
pub use download_relay::DownloadRelayProxy;
