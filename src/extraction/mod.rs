//! Extraction pipeline — turns one free-text turn into a validated field patch.
//!
//! Runs before any completeness check so that data supplied in the same
//! utterance that completes the requirement set is not asked for again.
//! Any NL-service failure or unparseable output degrades to an empty patch.

use std::sync::Arc;

use serde_json::Value;

use crate::llm::{CompletionRequest, LlmProvider};
use crate::session::{CustomerData, FieldName, FieldPatch, FieldValue, Turn};

/// Closed category set for loan purpose. Values outside the set are passed
/// through as extracted, without forced mapping.
pub const LOAN_PURPOSE_CATEGORIES: [&str; 8] = [
    "home_improvement",
    "debt_consolidation",
    "medical",
    "education",
    "business",
    "personal",
    "wedding",
    "travel",
];

pub fn is_known_purpose(purpose: &str) -> bool {
    LOAN_PURPOSE_CATEGORIES.contains(&purpose)
}

/// Extraction prompt: scoped to the known field vocabulary, primed with the
/// data already collected so the service only reports new information.
fn extraction_prompt(known: &CustomerData) -> String {
    format!(
        "Extract personal information from the user's message.\n\
         Current data: {}\n\n\
         Look for: name, phone, email, city, monthly_income (as number), loan_amount (as number), loan_purpose\n\n\
         Respond with JSON containing only the new information found:\n\
         {{\"field_name\": \"value\"}}\n\n\
         For numbers, extract only the numeric value. For loan_purpose, use categories like:\n\
         {}\n\n\
         IMPORTANT: Only extract information that is clearly stated in the user message. Do not make assumptions.\n\
         If no new information is found, return an empty JSON object {{}}",
        known.to_json(),
        LOAN_PURPOSE_CATEGORIES.join(", "),
    )
}

/// Render the bounded history window as extraction context.
fn history_context(history: &[Turn]) -> Option<String> {
    if history.is_empty() {
        return None;
    }
    let lines: Vec<String> = history
        .iter()
        .map(|turn| {
            let speaker = match turn.speaker {
                crate::session::Speaker::Applicant => "User",
                crate::session::Speaker::Assistant => "Assistant",
            };
            format!("{speaker}: {}", turn.text)
        })
        .collect();
    Some(lines.join("\n"))
}

/// NL-backed extraction pipeline.
pub struct ExtractionPipeline {
    llm: Arc<dyn LlmProvider>,
}

impl ExtractionPipeline {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Extract newly found fields from one user turn.
    ///
    /// Returns only fields in the required vocabulary; an empty patch is a
    /// normal outcome (nothing new, or the NL service failed).
    pub async fn extract(
        &self,
        user_text: &str,
        known: &CustomerData,
        history: &[Turn],
    ) -> FieldPatch {
        let mut request = CompletionRequest::new(extraction_prompt(known), user_text)
            .json_mode()
            .with_temperature(0.0)
            .with_max_tokens(1024);
        if let Some(context) = history_context(history) {
            request = request.with_context(context);
        }

        let raw = match self.llm.complete(request).await {
            Ok(response) => response.content,
            Err(e) => {
                tracing::warn!(error = %e, "extraction call failed, using empty patch");
                return FieldPatch::new();
            }
        };

        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value) => normalize_patch(&value),
            Err(e) => {
                tracing::warn!(error = %e, raw = %raw, "extraction returned unparseable JSON");
                FieldPatch::new()
            }
        }
    }
}

/// Normalize a raw extraction object into a scoped, validated patch.
///
/// - only required-vocabulary keys are admitted;
/// - `monthly_income` / `loan_amount` coerce to integers, keeping the raw
///   text when coercion fails;
/// - `phone` is stripped to digits;
/// - `loan_purpose` passes through as-is (the category set is advisory).
pub fn normalize_patch(raw: &Value) -> FieldPatch {
    let mut patch = FieldPatch::new();
    let Some(object) = raw.as_object() else {
        return patch;
    };

    for (key, value) in object {
        let Some(field) = FieldName::from_key(key) else {
            continue;
        };
        if !field.is_required() {
            continue;
        }
        if let Some(normalized) = normalize_value(field, value) {
            patch.insert(field, normalized);
        }
    }
    patch
}

fn normalize_value(field: FieldName, value: &Value) -> Option<FieldValue> {
    if value.is_null() {
        return None;
    }
    match field {
        FieldName::MonthlyIncome | FieldName::LoanAmount => coerce_numeric(value),
        FieldName::Phone => normalize_phone(value),
        _ => {
            let text = stringify(value)?;
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(FieldValue::Text(trimmed.to_string()))
            }
        }
    }
}

/// Integer coercion that retains the raw value on failure instead of
/// dropping the field.
fn coerce_numeric(value: &Value) -> Option<FieldValue> {
    if let Some(n) = value.as_i64() {
        return Some(FieldValue::Number(n));
    }
    if let Some(f) = value.as_f64() {
        return Some(FieldValue::Number(f as i64));
    }
    let text = stringify(value)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<i64>() {
        Ok(n) => Some(FieldValue::Number(n)),
        Err(_) => Some(FieldValue::Text(trimmed.to_string())),
    }
}

/// Strip all non-digit characters; a phone with no digits is no evidence.
fn normalize_phone(value: &Value) -> Option<FieldValue> {
    let text = stringify(value)?;
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(FieldValue::Text(digits))
    }
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
