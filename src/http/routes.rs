//! # Ledger HTTP Routes
//!
//! Handlers for the budget endpoints. Every handler establishes the caller
//! scope from the bearer token first and passes it to the service; scope
//! enforcement itself lives in the service, not here.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::ledger::{
    Allocation, AllocationId, AllocationUpdate, LedgerService, NewAllocation, NewUsage,
    UsageId, UsageRecord,
};
use crate::observability::MetricsSnapshot;
use crate::scope::{Scope, SchoolDirectory, TokenVerifier};

use super::errors::ApiResult;
use super::response::{
    DeleteAllocationResponse, ListResponse, SingleResponse, UsageCommitResponse,
};

/// Shared state behind every ledger route.
pub struct ApiState<D: SchoolDirectory> {
    pub service: LedgerService<D>,
    pub verifier: TokenVerifier,
}

type StateArc<D> = Arc<ApiState<D>>;

/// Build the ledger router.
pub fn ledger_routes<D: SchoolDirectory + 'static>(state: StateArc<D>) -> Router {
    Router::new()
        .route("/budgets", post(create_budget).get(list_budgets))
        .route("/budgets/usage", post(record_usage))
        .route(
            "/budgets/usage/:id",
            get(list_budget_usage).delete(delete_usage),
        )
        .route("/budgets/:id", put(update_budget).delete(delete_budget))
        .route("/budget-stats", get(budget_stats))
        .route("/observability/metrics", get(metrics_handler))
        .with_state(state)
}

/// Establish the caller scope from the Authorization header.
fn extract_scope<D: SchoolDirectory>(
    state: &ApiState<D>,
    headers: &HeaderMap,
) -> ApiResult<Scope> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(crate::scope::ScopeError::MissingToken)?;

    Ok(state.verifier.verify(token)?)
}

/// Usage submission body. The wire field is `budget_id`, matching what the
/// entry forms send.
#[derive(Debug, Deserialize)]
pub struct RecordUsageRequest {
    pub budget_id: Uuid,
    pub amount: Decimal,
    pub purpose: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub receipt_number: Option<String>,
}

impl From<RecordUsageRequest> for NewUsage {
    fn from(req: RecordUsageRequest) -> Self {
        NewUsage {
            allocation_id: AllocationId::from(req.budget_id),
            amount: req.amount,
            purpose: req.purpose,
            date: req.date,
            receipt_number: req.receipt_number,
        }
    }
}

async fn create_budget<D: SchoolDirectory + 'static>(
    State(state): State<StateArc<D>>,
    headers: HeaderMap,
    Json(body): Json<NewAllocation>,
) -> ApiResult<(StatusCode, Json<SingleResponse<Allocation>>)> {
    let scope = extract_scope(&state, &headers)?;
    let allocation = state.service.create_allocation(&scope, body)?;
    Ok((StatusCode::CREATED, Json(SingleResponse::new(allocation))))
}

async fn list_budgets<D: SchoolDirectory + 'static>(
    State(state): State<StateArc<D>>,
    headers: HeaderMap,
) -> ApiResult<Json<ListResponse<Allocation>>> {
    let scope = extract_scope(&state, &headers)?;
    let allocations = state.service.list_allocations(&scope)?;
    Ok(Json(ListResponse::new(allocations)))
}

async fn update_budget<D: SchoolDirectory + 'static>(
    State(state): State<StateArc<D>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<AllocationUpdate>,
) -> ApiResult<Json<SingleResponse<Allocation>>> {
    let scope = extract_scope(&state, &headers)?;
    let allocation = state
        .service
        .update_allocation(&scope, AllocationId::from(id), body)?;
    Ok(Json(SingleResponse::new(allocation)))
}

async fn delete_budget<D: SchoolDirectory + 'static>(
    State(state): State<StateArc<D>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Json<DeleteAllocationResponse>> {
    let scope = extract_scope(&state, &headers)?;
    let outcome = state
        .service
        .delete_allocation(&scope, AllocationId::from(id))?;
    Ok(Json(DeleteAllocationResponse { outcome }))
}

async fn record_usage<D: SchoolDirectory + 'static>(
    State(state): State<StateArc<D>>,
    headers: HeaderMap,
    Json(body): Json<RecordUsageRequest>,
) -> ApiResult<(StatusCode, Json<UsageCommitResponse>)> {
    let scope = extract_scope(&state, &headers)?;
    let (usage, allocation) = state.service.record_usage(&scope, body.into())?;
    Ok((
        StatusCode::CREATED,
        Json(UsageCommitResponse { usage, allocation }),
    ))
}

/// The path id is the allocation id here, per the listing contract.
async fn list_budget_usage<D: SchoolDirectory + 'static>(
    State(state): State<StateArc<D>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Json<ListResponse<UsageRecord>>> {
    let scope = extract_scope(&state, &headers)?;
    let records = state.service.list_usage(&scope, AllocationId::from(id))?;
    Ok(Json(ListResponse::new(records)))
}

/// The path id is the usage record id here.
async fn delete_usage<D: SchoolDirectory + 'static>(
    State(state): State<StateArc<D>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Json<SingleResponse<Allocation>>> {
    let scope = extract_scope(&state, &headers)?;
    let allocation = state.service.delete_usage(&scope, UsageId::from(id))?;
    Ok(Json(SingleResponse::new(allocation)))
}

async fn budget_stats<D: SchoolDirectory + 'static>(
    State(state): State<StateArc<D>>,
    headers: HeaderMap,
) -> ApiResult<Json<crate::ledger::BudgetStats>> {
    let scope = extract_scope(&state, &headers)?;
    let stats = state.service.compute_stats(&scope)?;
    Ok(Json(stats))
}

async fn metrics_handler<D: SchoolDirectory + 'static>(
    State(state): State<StateArc<D>>,
) -> Json<MetricsSnapshot> {
    Json(state.service.metrics().snapshot())
}
