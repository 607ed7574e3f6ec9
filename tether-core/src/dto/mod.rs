//! Data Transfer Objects for hub communication
//!
//! Request and reply bodies exchanged with the hub, plus the `request_type`
//! values that address them.

pub mod hub;
