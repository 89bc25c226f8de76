use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap},
    response::Response,
};

use crate::error::ServerError;
use crate::services::drive_client::{content_type_for, DriveClient};
use crate::services::rate_limit::client_ip;
use crate::stream::{limit_bytes, MAX_PAYLOAD_BYTES};
use crate::AppState;

/// Stream a Drive file to the caller. The declared size gates the request
/// up front; the counted-byte limiter protects the transfer itself.
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let ip = client_ip(&headers);
    if !state.download_limiter.check(&ip) {
        tracing::warn!(ip = %ip, file_id = %file_id, "Download rate limit exceeded");
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

    let span = tracing::info_span!("download", file_id = %file_id);
    let _enter = span.enter();

    let info = state.drive.get_file_info(&file_id).await?;

    if let Some(size) = info.size_bytes() {
        if size > MAX_PAYLOAD_BYTES {
            tracing::warn!(size, "Rejected oversized file before transfer");
            return Err(ServerError::PayloadTooLarge(
                "File too large. Maximum size is 20MB.".to_string(),
            ));
        }
    }

    let upstream = state.drive.download(&file_id).await?;
    let body = Body::from_stream(limit_bytes(upstream.bytes_stream(), MAX_PAYLOAD_BYTES));

    let encoded_name = urlencoding::encode(&info.name).into_owned();
    let mut builder = Response::builder()
        .status(200)
        .header(header::CONTENT_TYPE, content_type_for(&info.mime_type))
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", encoded_name),
        )
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .header("X-File-Name", encoded_name.as_str())
        .header("X-File-Size", info.size.as_deref().unwrap_or("unknown"))
        .header("X-File-Type", info.mime_type.as_str());
    if let Some(size) = info.size_bytes() {
        builder = builder.header(header::CONTENT_LENGTH, size);
    }

    tracing::info!(size = ?info.size_bytes(), "Streaming file download");

    builder
        .body(body)
        .map_err(|e| ServerError::Internal(format!("Failed to build response: {}", e)))
}
