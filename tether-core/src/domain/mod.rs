//! Core domain types
//!
//! This module contains the structures that flow through the subserver:
//! requests handed down by the hub, the responses sent back up, and the
//! outcome of each poll.

pub mod download;
pub mod poll;
pub mod request;
pub mod response;
