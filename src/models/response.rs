use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The structured record recovered from the remote extraction model.
///
/// The model is asked for a fixed field list (business_name, bill_number,
/// date, items[], totals, ...) but is not trusted to fill it: every field
/// is optional and unknown fields pass through untouched, so the parsed
/// JSON object itself is the record.
pub type StructuredBill = serde_json::Map<String, Value>;

/// Returned instead of a [`StructuredBill`] when the remote response could
/// not be parsed. Always carries the verbatim remote text so callers can
/// inspect or retry it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FallbackEnvelope {
    pub raw_response: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl FallbackEnvelope {
    pub fn new(error: impl Into<String>, raw_response: impl Into<String>) -> Self {
        Self {
            raw_response: raw_response.into(),
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Outcome of normalizing the remote response text. Serializes as either
/// the bill object or the fallback envelope, matching the wire shape the
/// frontend already consumes.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum NormalizedResponse {
    Bill(StructuredBill),
    Fallback(FallbackEnvelope),
}

/// Degraded result returned with HTTP 202 when the extraction service is
/// unreachable after all retries: the caller still gets the OCR text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegradedExtraction {
    pub error: String,
    pub message: String,
    pub raw_text: String,
}

impl DegradedExtraction {
    pub fn new(raw_text: String) -> Self {
        Self {
            error: "AI processing unavailable".to_string(),
            message: "Extracted text only (extraction service temporarily unavailable)"
                .to_string(),
            raw_text,
        }
    }
}

/// What the pipeline hands back to its invoking handler.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// The remote call completed; the response was normalized (possibly
    /// into a fallback envelope).
    Parsed(NormalizedResponse),
    /// The remote service stayed unavailable through every retry.
    Degraded(DegradedExtraction),
}
