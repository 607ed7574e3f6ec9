//! Repository layer
//!
//! Repositories are stateless HTTP clients that abstract communication
//! with the hub. They provide a focused interface for the hub endpoints
//! without any business logic.
//!
//! The trait seam lets the service layer and scheduler run against an
//! in-memory hub in tests.

mod hub;

pub use hub::HttpHubRepository;
pub use hub::HubRepository;
