//! Shared test utilities available via the `testkit` feature.
//!
//! # Modules
//!
//! - [`exchange`] — [`exchange::ScriptedExchange`], a fully scripted
//!   [`Client`](crate::exchange::Client) double for seeded end-to-end
//!   scenarios.
//! - [`domain`] — Builders for markets, envelopes, and ids.

pub mod domain;
pub mod exchange;
