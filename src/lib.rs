//! Billscan Extraction Service
//!
//! A Rust service that turns scanned bills and invoices (images or PDFs)
//! into structured records: OCR text recognition followed by a resilient
//! call to a remote extraction model.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};

use services::GeminiClient;

/// Shared application state, built once at startup and injected into
/// handlers via axum's `State`.
pub struct AppState {
    pub config: Config,
    pub remote: GeminiClient,
}
