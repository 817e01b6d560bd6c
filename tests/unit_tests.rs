//! Unit tests for individual components

use billscan::{
    config::Config,
    error::AppError,
    models::{
        DegradedExtraction, DocumentKind, FallbackEnvelope, NormalizedResponse, UploadedFile,
    },
    services::{build_extraction_prompt, normalize},
};
use bytes::Bytes;
use std::env;

#[test]
fn test_config_validation() {
    env::set_var("GEMINI_API_KEY", "test-key-123");
    env::set_var("MAX_FILE_SIZE_MB", "10");
    env::set_var("MAX_CONCURRENT_REQUESTS", "100");
    env::set_var("SERVER_PORT", "8000");

    let config = Config::from_env().unwrap();
    assert_eq!(config.max_file_size_mb, 10);
    assert_eq!(config.max_concurrent_requests, 100);
    assert_eq!(config.server_port, 8000);
    assert_eq!(config.gemini_api_key, "test-key-123");
    assert_eq!(config.gemini_max_retries, 3);
    assert_eq!(config.gemini_timeout_seconds, 60);
}

#[test]
fn test_error_codes() {
    assert_eq!(AppError::RateLimitExceeded.error_code(), "RATE_LIMIT_EXCEEDED");
    assert_eq!(AppError::FileTooLarge { size: 20, limit: 10 }.error_code(), "FILE_TOO_LARGE");
    assert_eq!(AppError::NoTextExtracted.error_code(), "NO_TEXT_EXTRACTED");
    assert_eq!(AppError::invalid_request("bad key").error_code(), "INVALID_REMOTE_REQUEST");
    assert_eq!(AppError::validation("test").error_code(), "VALIDATION_ERROR");
    assert_eq!(AppError::config("test").error_code(), "CONFIG_ERROR");
}

#[test]
fn test_error_status_codes() {
    use axum::http::StatusCode;

    assert_eq!(AppError::RateLimitExceeded.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        AppError::FileTooLarge { size: 20, limit: 10 }.status_code(),
        StatusCode::PAYLOAD_TOO_LARGE
    );
    assert_eq!(AppError::NoTextExtracted.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(AppError::invalid_request("bad key").status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(AppError::validation("test").status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        AppError::ServiceUnavailable { service: "test".to_string() }.status_code(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[test]
fn test_error_helper_methods() {
    let validation_error = AppError::validation("Invalid input");
    match validation_error {
        AppError::ValidationError { message } => assert_eq!(message, "Invalid input"),
        _ => panic!("Expected ValidationError"),
    }

    let invalid_request = AppError::invalid_request("API key not valid");
    match invalid_request {
        AppError::InvalidRequest { detail } => assert_eq!(detail, "API key not valid"),
        _ => panic!("Expected InvalidRequest"),
    }

    let service_error = AppError::service_unavailable("extraction service");
    match service_error {
        AppError::ServiceUnavailable { service } => assert_eq!(service, "extraction service"),
        _ => panic!("Expected ServiceUnavailable"),
    }
}

#[test]
fn test_document_kind_detection() {
    let pdf = UploadedFile::new("bill.pdf".to_string(), Bytes::from_static(b"%PDF-1.4 rest"));
    assert_eq!(pdf.document_kind(), Some(DocumentKind::Pdf));

    let png = UploadedFile::new(
        "receipt.PNG".to_string(),
        Bytes::from_static(b"\x89PNG\r\n\x1a\n rest"),
    );
    assert_eq!(png.document_kind(), Some(DocumentKind::Image));

    let jpeg = UploadedFile::new(
        "receipt.jpeg".to_string(),
        Bytes::from_static(b"\xFF\xD8\xFF\xE0 rest"),
    );
    assert_eq!(jpeg.document_kind(), Some(DocumentKind::Image));

    // Extension says PDF, mime type agrees even without the magic bytes
    let mimed = UploadedFile::new("bill.pdf".to_string(), Bytes::from_static(b"whatever"))
        .with_mime_type("application/pdf".to_string());
    assert_eq!(mimed.document_kind(), Some(DocumentKind::Pdf));

    // Unsupported extension
    let text = UploadedFile::new("notes.txt".to_string(), Bytes::from_static(b"hello"));
    assert_eq!(text.document_kind(), None);

    // Image extension over non-image bytes
    let fake = UploadedFile::new("receipt.png".to_string(), Bytes::from_static(b"not an image"));
    assert_eq!(fake.document_kind(), None);

    // No extension at all
    let bare = UploadedFile::new("receipt".to_string(), Bytes::from_static(b"%PDF"));
    assert_eq!(bare.document_kind(), None);
}

#[test]
fn test_fallback_envelope_shape() {
    let envelope = FallbackEnvelope::new("Invalid JSON format in response", "raw text")
        .with_details("expected value at line 1");

    assert_eq!(envelope.raw_response, "raw text");
    assert_eq!(envelope.error, "Invalid JSON format in response");

    let value = serde_json::to_value(&envelope).unwrap();
    assert_eq!(value["raw_response"], "raw text");
    assert_eq!(value["details"], "expected value at line 1");

    // details is omitted from the wire when absent
    let bare = FallbackEnvelope::new("Could not extract structured data", "raw");
    let value = serde_json::to_value(&bare).unwrap();
    assert!(value.get("details").is_none());
}

#[test]
fn test_degraded_extraction_shape() {
    let degraded = DegradedExtraction::new("----- Page 1 -----\nTOTAL 9.99".to_string());

    assert_eq!(degraded.error, "AI processing unavailable");
    assert_eq!(degraded.raw_text, "----- Page 1 -----\nTOTAL 9.99");

    let value = serde_json::to_value(&degraded).unwrap();
    assert_eq!(value["error"], "AI processing unavailable");
    assert_eq!(value["raw_text"], "----- Page 1 -----\nTOTAL 9.99");
    assert!(value["message"].as_str().unwrap().contains("Extracted text only"));
}

#[test]
fn test_prompt_determinism() {
    let text = "SUPERMART\nBread 1 x 2.49\nTOTAL 2.49";
    let first = build_extraction_prompt(text);
    let second = build_extraction_prompt(text);
    assert_eq!(first, second);
    assert!(first.contains(text));
}

#[test]
fn test_normalize_recovery_cases() {
    // JSON wrapped in prose is recovered
    match normalize("Here is data: {\"a\":1} thanks") {
        NormalizedResponse::Bill(bill) => assert_eq!(bill["a"], serde_json::json!(1)),
        other => panic!("expected a bill, got {:?}", other),
    }

    // No braces at all
    match normalize("no json here") {
        NormalizedResponse::Fallback(envelope) => {
            assert_eq!(envelope.raw_response, "no json here");
            assert!(!envelope.error.is_empty());
        }
        other => panic!("expected a fallback, got {:?}", other),
    }

    // An empty object is a failure, not an empty bill
    match normalize("{}") {
        NormalizedResponse::Fallback(envelope) => {
            assert_eq!(envelope.error, "Unexpected error parsing response");
        }
        other => panic!("expected a fallback, got {:?}", other),
    }
}

#[test]
fn test_file_size_validation() {
    let max_size_mb = 10;
    let max_size_bytes = max_size_mb * 1024 * 1024;

    // Test file within limit
    let small_file_size = 5 * 1024 * 1024; // 5MB
    assert!(small_file_size <= max_size_bytes);

    // Test file exceeding limit
    let large_file_size = 15 * 1024 * 1024; // 15MB
    assert!(large_file_size > max_size_bytes);

    // Test error creation for oversized file
    let error = AppError::FileTooLarge {
        size: large_file_size / (1024 * 1024),
        limit: max_size_mb,
    };

    match error {
        AppError::FileTooLarge { size, limit } => {
            assert_eq!(size, 15);
            assert_eq!(limit, 10);
        }
        _ => panic!("Expected FileTooLarge error"),
    }
}

#[test]
fn test_error_conversions() {
    // Test anyhow::Error conversion
    let anyhow_error = anyhow::anyhow!("Test error");
    let app_error: AppError = anyhow_error.into();
    match app_error {
        AppError::Internal { message } => assert!(message.contains("Test error")),
        _ => panic!("Expected Internal error"),
    }

    // Test std::io::Error conversion
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
    let app_error: AppError = io_error.into();
    match app_error {
        AppError::Internal { message } => assert!(message.contains("IO error")),
        _ => panic!("Expected Internal error"),
    }
}
