//! Tether Core
//!
//! Core types shared by the subserver and its HTTP clients.
//!
//! This crate contains:
//! - Domain types: client requests, responses, download reports, poll results
//! - DTOs: wire bodies exchanged with the hub

pub mod domain;
pub mod dto;

/// A JSON object, the shape of every request and result that crosses the hub
pub type JsonObject = serde_json::Map<String, serde_json::Value>;
