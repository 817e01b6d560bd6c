//! Recovery of a structured bill from raw model output.
//!
//! The model is instructed to answer with a bare JSON object, but real
//! responses arrive wrapped in prose, markdown fences, or nothing usable
//! at all. Normalization never fails: anything unparseable becomes a
//! [`FallbackEnvelope`] carrying the verbatim response.

use crate::models::{FallbackEnvelope, NormalizedResponse, StructuredBill};
use tracing::warn;

/// Normalize raw remote output into a bill or a fallback envelope.
///
/// Takes the substring from the first `{` to the last `}` and parses it as
/// a JSON object. Missing braces, parse failures, and empty objects each
/// produce a fallback envelope with the matching error message.
pub fn normalize(raw: &str) -> NormalizedResponse {
    let (start, end) = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            warn!("No JSON object found in remote response");
            return NormalizedResponse::Fallback(FallbackEnvelope::new(
                "Could not extract structured data",
                raw,
            ));
        }
    };

    // A first `{` sitting after the last `}` leaves an empty candidate.
    let candidate = if start <= end { &raw[start..=end] } else { "" };

    match serde_json::from_str::<StructuredBill>(candidate) {
        Ok(bill) if bill.is_empty() => {
            warn!("Remote response parsed to an empty object");
            NormalizedResponse::Fallback(
                FallbackEnvelope::new("Unexpected error parsing response", raw)
                    .with_details("Empty JSON object"),
            )
        }
        Ok(bill) => NormalizedResponse::Bill(bill),
        Err(e) => {
            warn!("Failed to parse JSON from remote response: {}", e);
            NormalizedResponse::Fallback(
                FallbackEnvelope::new("Invalid JSON format in response", raw)
                    .with_details(e.to_string()),
            )
        }
    }
}
