//! HTTP handlers for the dashboard contract.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use ossuary_core::{CycleReport, Module, Severity, UnitReport};
use ossuary_engine::CycleRunner;
use ossuary_store::ledger::{GroupBy, LedgerFilter, SortOrder};
use ossuary_store::StoreError;

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<CycleRunner>,
}

/// Error projection for the HTTP surface. Unit failures are NOT errors
/// here — they travel inside report bodies; this covers bad requests and
/// store-level faults only.
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(msg) => ApiError::NotFound(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({"error": message}))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LedgerQuery {
    pub module: Option<String>,
    pub severity: Option<String>,
    pub limit: Option<u32>,
    pub order: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CycleParams {
    pub units: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub total: i64,
    pub by_module: BTreeMap<String, i64>,
    pub by_severity: BTreeMap<String, i64>,
}

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 1000;

fn parse_selection(params: &CycleParams) -> Result<Vec<Module>, ApiError> {
    match &params.units {
        None => Ok(Module::CYCLE_ORDER.to_vec()),
        Some(names) if names.is_empty() => Ok(Module::CYCLE_ORDER.to_vec()),
        Some(names) => names
            .iter()
            .map(|name| {
                name.parse::<Module>()
                    .map_err(|_| ApiError::BadRequest(format!("unknown unit: {name}")))
            })
            .collect(),
    }
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Response {
    match state.runner.context().ledger.count() {
        Ok(records) => Json(json!({"status": "healthy", "records": records})).into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "unhealthy", "error": e.to_string()})),
        )
            .into_response(),
    }
}

/// `GET /ledger` — filtered listing, newest-first unless `order=asc`.
pub async fn ledger(
    State(state): State<AppState>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<Vec<crate::api::ApiRecord>>, ApiError> {
    let mut filter = LedgerFilter::default();
    if let Some(ref module) = query.module {
        filter.module = Some(
            module
                .parse::<Module>()
                .map_err(|_| ApiError::BadRequest(format!("unknown module: {module}")))?,
        );
    }
    if let Some(ref severity) = query.severity {
        filter.severity = Some(
            severity
                .parse::<Severity>()
                .map_err(|_| ApiError::BadRequest(format!("unknown severity: {severity}")))?,
        );
    }

    let order = match query.order.as_deref() {
        None | Some("desc") => SortOrder::Descending,
        Some("asc") => SortOrder::Ascending,
        Some(other) => {
            return Err(ApiError::BadRequest(format!("unknown order: {other}")));
        }
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

    let records = state.runner.context().ledger.query(&filter, limit, order)?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// `GET /status` — totals plus module/severity breakdowns. Re-scans the
/// store on every call; the ledger stays small by construction.
pub async fn status(State(state): State<AppState>) -> Result<Json<StatusReport>, ApiError> {
    let ledger = &state.runner.context().ledger;
    Ok(Json(StatusReport {
        total: ledger.count()?,
        by_module: ledger.aggregate_counts(GroupBy::Module)?,
        by_severity: ledger.aggregate_counts(GroupBy::Severity)?,
    }))
}

/// `POST /cycle` — run a selection of units (all six when unspecified).
pub async fn run_cycle(
    State(state): State<AppState>,
    params: Option<Json<CycleParams>>,
) -> Result<Json<CycleReport>, ApiError> {
    let params = params.map(|Json(p)| p).unwrap_or_default();
    let selection = parse_selection(&params)?;
    Ok(Json(state.runner.run_cycle(&selection)))
}

/// `POST /units/{name}` — run a single unit.
pub async fn run_unit(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<UnitReport>, ApiError> {
    let module = name
        .parse::<Module>()
        .map_err(|_| ApiError::BadRequest(format!("unknown unit: {name}")))?;
    Ok(Json(state.runner.run_unit(module)))
}

/// `POST /mine` — dashboard verb for triggering Miner alone.
pub async fn mine(State(state): State<AppState>) -> Json<UnitReport> {
    Json(state.runner.run_unit(Module::Miner))
}

/// `POST /ledger/{id}/reviewed` — the review action, routed through
/// Sin-Eater's contract to `mark_processed`. Idempotent.
pub async fn mark_reviewed(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.runner.context().ledger.mark_processed(id)?;
    Ok(Json(json!({"id": id, "processed": true})))
}
