//! Closing-score engine for sales proposals.
//!
//! The [`scoring`] module holds the engine. [`server`] exposes it over HTTP, while the
//! `proposal-score` binary reads one request from stdin and writes one result to stdout.

pub mod config;
pub mod error;
pub mod scoring;
pub mod server;
pub mod telemetry;
