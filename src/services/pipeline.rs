use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{DegradedExtraction, Document, PipelineOutcome};
use crate::services::gemini_client::GeminiClient;
use crate::services::normalize::normalize;
use crate::services::prompt::build_extraction_prompt;
use crate::services::text_extractor::TextExtractor;

/// The document-to-record pipeline: OCR, prompt, remote call, normalize.
///
/// Stages run strictly in that order; each request drives its own pipeline
/// instance and shares nothing with concurrent requests.
pub struct ExtractionPipeline<'a> {
    remote: &'a GeminiClient,
}

impl<'a> ExtractionPipeline<'a> {
    pub fn new(remote: &'a GeminiClient) -> Self {
        Self { remote }
    }

    /// Run the whole pipeline for one document.
    ///
    /// An unavailable extraction service is not a failure here: the OCR
    /// text already exists, so the caller gets it back as a degraded
    /// outcome. Extraction errors and permanent remote rejections
    /// propagate as hard errors.
    pub async fn process(&self, document: &Document) -> AppResult<PipelineOutcome> {
        info!(kind = ?document.kind, size = document.size, "Starting bill extraction");

        let doc = document.clone();
        let text = tokio::task::spawn_blocking(move || TextExtractor::new()?.extract(&doc))
            .await
            .map_err(|e| AppError::internal(format!("OCR task failed: {}", e)))??;

        info!(text_length = text.len(), "OCR completed");

        let instruction = build_extraction_prompt(&text);

        match self.remote.generate(&instruction).await {
            Ok(raw) => {
                info!(response_length = raw.len(), "Extraction service returned a payload");
                Ok(PipelineOutcome::Parsed(normalize(&raw)))
            }
            Err(AppError::ServiceUnavailable { .. }) => {
                warn!("Extraction service unavailable after retries, returning OCR text only");
                Ok(PipelineOutcome::Degraded(DegradedExtraction::new(text)))
            }
            Err(e) => Err(e),
        }
    }
}
