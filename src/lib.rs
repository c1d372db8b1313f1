//! minerdash: terminal dashboard for a mining-rig backend.
//!
//! Polls `/api/system-stats` and `/api/miner-stats` on a fixed period and
//! runs a chat session against `/api/chat`, all driven from one event loop.

pub mod activity;
pub mod api;
pub mod chat;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod markup;
pub mod page;
pub mod poller;
pub mod stats;
pub mod terminal;
