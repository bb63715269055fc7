//! Observability
//!
//! Structured logging and operation counters for the ledger service.

mod logger;
mod metrics;

pub use logger::{Logger, Severity};
pub use metrics::{LedgerMetrics, MetricsSnapshot};
