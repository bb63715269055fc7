//! HTTP surface
//!
//! The JSON API consumed by the entry forms: budgets, usage, stats.

mod errors;
mod response;
mod routes;
mod server;

pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use response::{
    DeleteAllocationResponse, ListResponse, SingleResponse, UsageCommitResponse,
};
pub use routes::{ledger_routes, ApiState, RecordUsageRequest};
pub use server::{HealthResponse, LedgerServer};
