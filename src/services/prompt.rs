//! Prompt construction for the remote extraction model.
//!
//! Everything prompt-shaped lives here so the instruction text can change
//! without touching retry or transport code, and so unit tests can inspect
//! the exact bytes sent to the model.

/// The target record shape, embedded verbatim in every extraction prompt.
pub const BILL_SCHEMA_TEMPLATE: &str = r#"{
    "business_name": "Name of the business/store",
    "business_address": "Complete address",
    "business_phone": "Phone number if available",
    "bill_number": "Invoice/bill number",
    "date": "Date in YYYY-MM-DD format",
    "time": "Time if available",
    "items": [
        {
            "name": "Item name",
            "quantity": number,
            "unit_price": number,
            "total_price": number
        }
    ],
    "subtotal": number,
    "tax_amount": number,
    "tax_percentage": number,
    "discount": number,
    "total_amount": number,
    "payment_method": "Cash/Card/UPI etc",
    "customer_info": "Customer details if available"
}"#;

/// Build the extraction instruction for a bill's OCR text.
///
/// Pure: identical input text always produces byte-identical output, so a
/// given document maps to exactly one remote request.
pub fn build_extraction_prompt(text: &str) -> String {
    format!(
        "Extract ALL relevant information from this bill/invoice and return ONLY a valid JSON object with the following structure:\n\
         \n\
         {BILL_SCHEMA_TEMPLATE}\n\
         \n\
         Bill Text:\n\
         {text}\n\
         \n\
         Return ONLY the JSON object, no explanation or markdown formatting.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_is_deterministic() {
        let text = "ACME STORE\nWidget  2 x 3.50  7.00\nTOTAL 7.00";
        assert_eq!(build_extraction_prompt(text), build_extraction_prompt(text));
    }

    #[test]
    fn prompt_embeds_text_verbatim() {
        let text = "----- Page 1 -----\nCafé Crème\nTOTAL 12,80 €";
        let prompt = build_extraction_prompt(text);
        assert!(prompt.contains(text));
    }

    #[test]
    fn prompt_carries_schema_and_output_instruction() {
        let prompt = build_extraction_prompt("anything");
        assert!(prompt.contains("\"business_name\""));
        assert!(prompt.contains("\"total_amount\""));
        assert!(prompt.contains("\"items\""));
        assert!(prompt.contains("Return ONLY the JSON object"));
        assert!(prompt.contains("no explanation or markdown formatting"));
    }
}
