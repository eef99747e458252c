use crate::errors::Error;
use crate::model::{Device, FilteredRecordSet, HealthRecord, NewReading, RegisterDevice};
use crate::records::HealthRecords;
use crate::registry::DeviceRegistry;
use crate::store::Store;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

#[derive(Clone)]
struct AppState {
    registry: DeviceRegistry,
    records: HealthRecords,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceQuery {
    device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountQuery {
    account_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentQuery {
    device_id: Option<String>,
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterQuery {
    device_id: Option<String>,
    filter: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub fn create_router(store: Arc<dyn Store>) -> Router {
    let state = AppState {
        registry: DeviceRegistry::new(store.clone()),
        records: HealthRecords::new(store),
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/devices", post(register_device).get(get_device))
        .route("/api/devices/list", get(list_devices))
        .route("/api/health", post(ingest_record))
        .route("/api/health/latest", get(latest_record))
        .route("/api/health/recent", get(recent_records))
        .route("/api/health/records", get(filtered_records))
        .with_state(state)
}

/// Liveness only; does not touch the database.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn register_device(
    State(state): State<AppState>,
    body: Result<Json<RegisterDevice>, JsonRejection>,
) -> Result<(StatusCode, Json<Device>), AppError> {
    let Json(req) = body?;
    let device = state.registry.register(&req.device_id, &req.account_id).await?;
    Ok((StatusCode::CREATED, Json(device)))
}

async fn get_device(
    State(state): State<AppState>,
    query: Result<Query<DeviceQuery>, QueryRejection>,
) -> Result<Json<Device>, AppError> {
    let Query(params) = query?;
    let device = state
        .registry
        .get_by_id(params.device_id.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(device))
}

async fn list_devices(
    State(state): State<AppState>,
    query: Result<Query<AccountQuery>, QueryRejection>,
) -> Result<Json<Vec<Device>>, AppError> {
    let Query(params) = query?;
    let devices = state
        .registry
        .list_by_account(params.account_id.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(devices))
}

async fn ingest_record(
    State(state): State<AppState>,
    body: Result<Json<NewReading>, JsonRejection>,
) -> Result<(StatusCode, Json<HealthRecord>), AppError> {
    let Json(reading) = body?;
    let record = state.records.ingest(reading).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn latest_record(
    State(state): State<AppState>,
    query: Result<Query<DeviceQuery>, QueryRejection>,
) -> Result<Json<HealthRecord>, AppError> {
    let Query(params) = query?;
    let record = state
        .records
        .get_latest(params.device_id.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(record))
}

async fn recent_records(
    State(state): State<AppState>,
    query: Result<Query<RecentQuery>, QueryRejection>,
) -> Result<Json<Vec<HealthRecord>>, AppError> {
    let Query(params) = query?;
    let records = state
        .records
        .get_recent(params.device_id.as_deref().unwrap_or_default(), params.limit)
        .await?;
    Ok(Json(records))
}

async fn filtered_records(
    State(state): State<AppState>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> Result<Json<FilteredRecordSet>, AppError> {
    let Query(params) = query?;
    let filter = params
        .filter
        .ok_or_else(|| Error::Validation("filter is required".to_string()))?;
    let set = state
        .records
        .get_filtered(params.device_id.as_deref().unwrap_or_default(), &filter)
        .await?;
    Ok(Json(set))
}

/// Maps crate errors onto HTTP statuses with a short plain-text body.
/// Storage details are logged, never returned.
struct AppError(Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.0 {
            Error::Validation(msg) => {
                warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, msg).into_response()
            }
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            other => {
                error!("API error: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
                    .into_response()
            }
        }
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Error::Validation(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self(Error::Validation(format!(
            "Invalid query parameters: {}",
            rejection.body_text()
        )))
    }
}
