//! NETCONF-native handlers, bypassing canonical normalization

use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use sbgw_core::{CanonicalValue, GatewayError, SetPayload};

use crate::error::ApiError;
use crate::state::AppState;

/// Multipart field carrying the edit-config fragment
pub const SET_FIELD: &str = "set";

/// GET /netconf/get/{name}
/// Running configuration as the device returned it
pub async fn get_running(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state.dispatcher().native_get(&name).await?;
    Ok(([(header::CONTENT_TYPE, document.content_type)], document.body))
}

/// POST /devices/netconf/{name}
/// Multipart upload whose `set` field holds an XML fragment.
/// Field errors are reported only once the device resolves.
pub async fn edit_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<CanonicalValue>, ApiError> {
    let fragment = read_set_field(&mut multipart).await;
    tracing::info!(device = %name, "edit-config requested");

    let ack = state
        .dispatcher()
        .dispatch_set(&name, || {
            fragment
                .map(SetPayload::Xml)
                .map_err(GatewayError::BadRequest)
        })
        .await?;
    Ok(Json(ack))
}

/// Text of the `set` field, or the reason it is unusable
async fn read_set_field(multipart: &mut Multipart) -> Result<String, String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("invalid multipart body: {}", e))?
    {
        if field.name() == Some(SET_FIELD) {
            return field
                .text()
                .await
                .map_err(|e| format!("unreadable '{}' field: {}", SET_FIELD, e));
        }
    }
    Err(format!("multipart field '{}' is required", SET_FIELD))
}
