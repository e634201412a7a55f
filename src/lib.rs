//! # prompt-relay
//!
//! Bridges synchronous HTTP callers to a push-based worker (a browser tab
//! driving an AI service) that cannot be called directly.
//!
//! A caller's prompt gets a correlation id, is pushed to the worker over a
//! websocket, and the caller is held until the worker posts the matching
//! result back or the wait times out.

pub mod api;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod model;
pub mod outbound;
pub mod store;
pub mod telemetry;
