use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::info;

use crate::error::AppResult;
use crate::middleware::rate_limit::get_rate_limit_metrics;
use crate::services::text_extractor::{pdftoppm_available, TesseractRecognizer};
use crate::AppState;

/// Health check endpoint
pub async fn health_handler() -> AppResult<Json<Value>> {
    info!("Health check requested");

    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs();

    // Check toolchain availability
    let ocr_service = TesseractRecognizer::is_available();
    let pdf_renderer = pdftoppm_available();

    // Get rate limiting metrics
    let (total_requests, rejected_requests, available_permits) = get_rate_limit_metrics();

    let status = if ocr_service {
        "healthy"
    } else {
        "degraded"
    };

    let response = json!({
        "status": status,
        "timestamp": timestamp,
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "ocr_service": ocr_service,
            "pdf_renderer": pdf_renderer
        },
        "rate_limiting": {
            "total_requests": total_requests,
            "rejected_requests": rejected_requests,
            "available_permits": available_permits,
            "rejection_rate": if total_requests > 0 {
                (rejected_requests as f64 / total_requests as f64 * 100.0).round() / 100.0
            } else {
                0.0
            }
        }
    });

    info!(
        status = status,
        ocr_available = ocr_service,
        pdf_renderer_available = pdf_renderer,
        "Health check completed"
    );

    Ok(Json(response))
}

/// Readiness check endpoint (for Kubernetes/Railway)
pub async fn ready_handler() -> Result<StatusCode, StatusCode> {
    if TesseractRecognizer::is_available() {
        info!("Readiness check passed");
        Ok(StatusCode::OK)
    } else {
        info!("Readiness check failed - OCR toolchain unavailable");
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

/// Probe connectivity to the remote extraction service
pub async fn test_remote_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    match state
        .remote
        .generate("Hello, respond with: {\"status\": \"working\"}")
        .await
    {
        Ok(response) => Json(json!({
            "remote_status": "connected",
            "response": response
        })),
        Err(e) => Json(json!({
            "remote_status": "error",
            "error": e.to_string()
        })),
    }
}
