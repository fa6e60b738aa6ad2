//! Headless driver for the swarm agent.
//!
//! Feeds engine snapshots to a [`swarm_core::agent::Agent`] and writes its
//! command batches back, one episode at a time. This enables:
//!
//! - **Engine bridges**: any process that can speak JSON lines can host the agent
//! - **Scripted runs**: recorded snapshot streams can be replayed through the agent
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: `start` / `step` / `end` messages from the bridge
//! - **stdout**: `ready` / `commands` / `error` / `done` responses
//! - **stderr**: Logs (human-readable)
//!
//! See [`protocol`] module for the message format.
//!
//! # Example
//!
//! ```bash
//! cargo run -p swarm_headless -- run --config agent.ron --option combat=rush < episode.jsonl
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod runner;

pub use config::{load_config, verbose_options};
pub use error::{HeadlessError, Result};
pub use protocol::{Message, Response};
pub use runner::{HeadlessRunner, RunSummary};
