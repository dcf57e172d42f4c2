//! Domain primitives for alert fan-out.
//!
//! Severity classification, chunk addressing, flow routing, queue message
//! contracts, the strategy registry and the batch dispatcher. Nothing here
//! talks to AWS or the Lambda runtime; that lives in `alert_fanout_lambda`.

pub mod chunk;
pub mod config;
pub mod contract;
pub mod dispatcher;
pub mod error;
pub mod flow;
pub mod registry;
pub mod severity;
