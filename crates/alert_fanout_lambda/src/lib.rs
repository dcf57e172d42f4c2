//! Lambda side of alert fan-out: SQS batch handling, strategy handlers and
//! the S3/SQS/HTTP adapters they write through.
//!
//! Core primitives are reached through the `runtime` module.

pub mod adapters;
pub mod config;
pub mod error;
pub mod handlers;
pub mod runtime;
pub mod telemetry;
