//! Hunter - an automated trend-following trading agent for Polymarket
//! binary prediction markets.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── domain/       # Pure domain types (ids, market context, trend, orders)
//! ├── store/         # In-process KV + pub/sub substrate and the stores on it
//! ├── strategy/      # Declarative rule configuration and the evaluator
//! ├── exchange/      # Exchange client trait + the Polymarket implementation
//! ├── ingest/        # Streaming ingestion: websocket → actors → handlers
//! ├── executor/       # Order execution and trade-record bookkeeping
//! ├── resolution/    # Stale-order cancellation and position redemption
//! ├── scheduler/      # Periodic housekeeping jobs
//! ├── subscription/  # Tracked-slug set driving what the ingester streams
//! ├── sink/          # Append-only relational sink for historical analysis
//! ├── notifier/      # Chat notification transport
//! ├── config/        # Settings loading and validation
//! ├── app/           # Orchestration: wires every module into one pipeline
//! └── cli/           # Command-line interface
//! ```
//!
//! # Features
//!
//! - `telegram` - Enable Telegram notifications
//! - `testkit` - Scripted streams and fixtures for end-to-end tests

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod exchange;
pub mod executor;
pub mod ingest;
pub mod notifier;
pub mod resolution;
pub mod scheduler;
pub mod sink;
pub mod store;
pub mod strategy;
pub mod subscription;

#[cfg(feature = "testkit")]
pub mod testkit;
