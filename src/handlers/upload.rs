use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::middleware::rate_limit::{record_rejection, record_request, REQUEST_SEMAPHORE};
use crate::models::{Document, NormalizedResponse, PipelineOutcome, UploadedFile};
use crate::services::ExtractionPipeline;
use crate::AppState;

const ALLOWED_EXTENSIONS: &str = ".pdf, .png, .jpg, .jpeg";

pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let start = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();

    info!(request_id = %request_id, "Starting bill extraction request");

    let total_requests = record_request();

    // Acquire rate limiting permit
    let _permit = REQUEST_SEMAPHORE.try_acquire().map_err(|_| {
        let rejected = record_rejection();
        warn!(
            request_id = %request_id,
            total_requests,
            rejected_requests = rejected,
            "Rate limit exceeded"
        );
        AppError::RateLimitExceeded
    })?;

    debug!(request_id = %request_id, "Rate limit permit acquired");

    // Extract file from multipart form
    let file = extract_file_from_multipart(&mut multipart).await?;
    info!(
        request_id = %request_id,
        file_name = %file.name,
        file_size = file.size,
        "File extracted from multipart form"
    );

    // Validate file size
    let max_size_bytes = state.config.max_file_size_mb * 1024 * 1024;
    if file.size > max_size_bytes {
        warn!(
            request_id = %request_id,
            file_size = file.size,
            max_size = max_size_bytes,
            "File size exceeds limit"
        );
        return Err(AppError::FileTooLarge {
            size: file.size / (1024 * 1024),
            limit: state.config.max_file_size_mb,
        });
    }

    // Tag the document kind once, at the boundary
    let kind = file.document_kind().ok_or_else(|| {
        warn!(request_id = %request_id, file_name = %file.name, "Unsupported file type");
        AppError::validation(format!(
            "Unsupported file type: {}. Allowed: {}",
            file.name, ALLOWED_EXTENSIONS
        ))
    })?;

    // Spool the upload to a temp file; the guard deletes it on every exit path
    let mut temp = NamedTempFile::new().map_err(|e| {
        AppError::processing(format!("Failed to create temporary file: {}", e))
    })?;
    temp.write_all(&file.content).map_err(|e| {
        AppError::processing(format!("Failed to write upload to temporary file: {}", e))
    })?;

    let document = Document {
        kind,
        path: temp.path().to_path_buf(),
        size: file.size,
    };

    let pipeline = ExtractionPipeline::new(&state.remote);
    let outcome = tokio::time::timeout(
        Duration::from_secs(state.config.request_timeout_seconds),
        pipeline.process(&document),
    )
    .await??;

    let total_time = start.elapsed().as_millis() as u64;

    let response = match outcome {
        PipelineOutcome::Parsed(normalized) => {
            if let NormalizedResponse::Fallback(envelope) = &normalized {
                warn!(
                    request_id = %request_id,
                    error = %envelope.error,
                    "Remote response could not be parsed, returning fallback envelope"
                );
            }
            (StatusCode::OK, Json(normalized)).into_response()
        }
        PipelineOutcome::Degraded(degraded) => {
            warn!(
                request_id = %request_id,
                "Extraction service unavailable, returning OCR text with 202"
            );
            (StatusCode::ACCEPTED, Json(degraded)).into_response()
        }
    };

    info!(
        request_id = %request_id,
        total_time_ms = total_time,
        "Request completed"
    );

    Ok(response)
}

async fn extract_file_from_multipart(multipart: &mut Multipart) -> AppResult<UploadedFile> {
    while let Some(field) = multipart.next_field().await.map_err(|e| AppError::InvalidFile {
        message: format!("Failed to read multipart field: {}", e),
    })? {
        let field_name = field.name().unwrap_or("");

        if field_name == "file" {
            let file_name = field.file_name().unwrap_or("unknown").to_string();

            let content_type = field.content_type().map(|ct| ct.to_string());

            let data = field.bytes().await.map_err(|e| AppError::InvalidFile {
                message: format!("Failed to read file data: {}", e),
            })?;

            if data.is_empty() {
                return Err(AppError::InvalidFile {
                    message: "File is empty".to_string(),
                });
            }

            let mut file = UploadedFile::new(file_name, data);

            if let Some(mime_type) = content_type {
                file = file.with_mime_type(mime_type);
            }

            debug!(
                "Extracted file: {} ({} bytes, type: {:?})",
                file.name, file.size, file.mime_type
            );

            return Ok(file);
        }
    }

    Err(AppError::MissingFile)
}
