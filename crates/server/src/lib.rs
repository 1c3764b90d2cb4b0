//! Diagnosis server - relays browser feature vectors to the classifier
//!
//! Library half of the server binary: configuration loading and the HTTP
//! and WebSocket surface, kept here so integration tests can drive them.

pub mod api;
pub mod config;
