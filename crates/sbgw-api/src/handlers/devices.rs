//! Canonical device handlers

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::Json;
use sbgw_core::{CanonicalValue, DeviceSummary, GatewayError, OperationRequest, SetPayload};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

/// Response for listing devices
#[derive(Debug, Serialize)]
pub struct ListDevicesResponse {
    pub devices: Vec<DeviceSummary>,
}

/// Query parameters for a device get
#[derive(Debug, Default, Deserialize)]
pub struct GetDeviceQuery {
    /// Logical path; when absent the device's root paths are used
    pub path: Option<String>,
}

/// GET /devices
pub async fn list_devices(
    State(state): State<AppState>,
) -> Result<Json<ListDevicesResponse>, ApiError> {
    let devices = state.dispatcher().list_devices().await?;
    Ok(Json(ListDevicesResponse { devices }))
}

/// GET /devices/{name}?path=...
pub async fn get_device(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<GetDeviceQuery>,
) -> Result<Json<CanonicalValue>, ApiError> {
    let path = query.path.filter(|p| !p.is_empty());
    let value = state
        .dispatcher()
        .dispatch(OperationRequest::get(name, path))
        .await?;
    Ok(Json(value))
}

/// POST /devices/{name}
/// Apply a JSON body of field -> value.
/// The body is decoded after the device resolves, so unknown devices are 404.
pub async fn set_device(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<CanonicalValue>, ApiError> {
    tracing::info!(device = %name, bytes = body.len(), "Set requested");

    let ack = state
        .dispatcher()
        .dispatch_set(&name, || {
            sbgw_conv::from_json_bytes(&body)
                .map(SetPayload::Canonical)
                .map_err(|e| GatewayError::BadRequest(format!("request body: {}", e)))
        })
        .await?;
    Ok(Json(ack))
}
