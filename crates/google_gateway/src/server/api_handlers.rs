//! Drive and Sheets API handlers
//!
//! Every handler here sits behind the auth gate and receives the
//! per-request [`GoogleClient`] through an extension.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::AppState;
use crate::error::{GatewayError, Result};
use crate::google::{self, sheets, DriveFile, GoogleClient, RangeValues};

/// Query for `GET /api/sheets/read`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetReadQuery {
    pub spreadsheet_id: Option<String>,
    pub range: Option<String>,
}

/// Body for `POST /api/sheets/write` and `PUT /api/sheets/update`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetWriteRequest {
    pub spreadsheet_id: Option<String>,
    pub range: Option<String>,
    /// Kept untyped so shape errors are reported by the sheets service
    pub values: Option<Value>,
}

fn write_body(body: std::result::Result<Json<SheetWriteRequest>, JsonRejection>) -> Result<SheetWriteRequest> {
    body.map(|Json(req)| req)
        .map_err(|rejection| GatewayError::InvalidBody(rejection.body_text()))
}

/// Plain-text health banner
pub async fn health(State(state): State<Arc<AppState>>) -> String {
    if state.oauth.is_some() {
        "Google Drive & Sheets gateway is running".to_string()
    } else {
        "Google Drive & Sheets gateway is running (OAuth not configured)".to_string()
    }
}

/// List every file in the caller's Drive
pub async fn list_drive_files(Extension(client): Extension<GoogleClient>) -> Result<Json<Vec<DriveFile>>> {
    let files = google::list_all_files(&client).await?;
    tracing::info!("[OK] Listed {} Drive files", files.len());
    Ok(Json(files))
}

/// Read a range of a spreadsheet
pub async fn read_sheet(
    Extension(client): Extension<GoogleClient>,
    Query(query): Query<SheetReadQuery>,
) -> Result<Json<RangeValues>> {
    let values = sheets::read(
        &client,
        query.spreadsheet_id.as_deref(),
        query.range.as_deref(),
    )
    .await?;
    Ok(Json(values))
}

/// Append rows to a spreadsheet range
pub async fn write_sheet(
    Extension(client): Extension<GoogleClient>,
    body: std::result::Result<Json<SheetWriteRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let req = write_body(body)?;
    let response = sheets::append(
        &client,
        req.spreadsheet_id.as_deref(),
        req.range.as_deref(),
        req.values.as_ref(),
    )
    .await?;
    Ok(Json(response))
}

/// Overwrite a spreadsheet range
pub async fn update_sheet(
    Extension(client): Extension<GoogleClient>,
    body: std::result::Result<Json<SheetWriteRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let req = write_body(body)?;
    let response = sheets::update(
        &client,
        req.spreadsheet_id.as_deref(),
        req.range.as_deref(),
        req.values.as_ref(),
    )
    .await?;
    Ok(Json(response))
}
