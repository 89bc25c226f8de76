use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ServerError;
use crate::models::FileInfoResponse;
use crate::services::drive_client::DriveClient;
use crate::services::rate_limit::client_ip;
use crate::AppState;

/// Metadata lookup with the derived type classifiers the plugin uses to pick
/// a preview.
pub async fn file_info(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let ip = client_ip(&headers);
    if !state.info_limiter.check(&ip) {
        tracing::warn!(ip = %ip, file_id = %file_id, "Info rate limit exceeded");
        return Err(ServerError::RateLimited);
    }

    if !DriveClient::validate_file_id(&file_id) {
        tracing::warn!(ip = %ip, "Rejected invalid file id format");
        return Err(ServerError::BadRequest(
            "Invalid file ID format".to_string(),
        ));
    }

    if !state.drive.is_configured() {
        return Err(ServerError::NotConfigured(
            "Google Drive service not configured".to_string(),
        ));
    }

    let span = tracing::info_span!("file_info", file_id = %file_id);
    let _enter = span.enter();

    let info = state.drive.get_file_info(&file_id).await?;
    let response = FileInfoResponse::from(info);

    tracing::info!(mime_type = %response.mime_type, "Served file metadata");

    Ok((
        [(header::CACHE_CONTROL, "public, max-age=300")],
        Json(response),
    )
        .into_response())
}
