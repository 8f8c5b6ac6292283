//! Conversation intent analysis.
//!
//! A best-effort NL classification of the user's turn. Failure is never
//! surfaced — the pipeline degrades to a default inquiry intent.

use std::sync::Arc;

use serde::Deserialize;

use crate::llm::{CompletionRequest, LlmProvider};
use crate::session::{Speaker, Turn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    Inquiry,
    PersonalInfo,
    LoanDetails,
    Verification,
    DocumentUpload,
    Objection,
    Closing,
    Other,
}

impl Intent {
    /// Unrecognized labels map to `Other` rather than failing the turn.
    fn parse(s: &str) -> Intent {
        match s {
            "greeting" => Intent::Greeting,
            "inquiry" => Intent::Inquiry,
            "personal_info" => Intent::PersonalInfo,
            "loan_details" => Intent::LoanDetails,
            "verification" => Intent::Verification,
            "document_upload" => Intent::DocumentUpload,
            "objection" => Intent::Objection,
            "closing" => Intent::Closing,
            _ => Intent::Other,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Greeting => "greeting",
            Self::Inquiry => "inquiry",
            Self::PersonalInfo => "personal_info",
            Self::LoanDetails => "loan_details",
            Self::Verification => "verification",
            Self::DocumentUpload => "document_upload",
            Self::Objection => "objection",
            Self::Closing => "closing",
            Self::Other => "other",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    SalesPitch,
    CollectInfo,
    VerifyKyc,
    ProcessApplication,
    RequestDocuments,
    HandleObjection,
    CloseDeal,
    Other,
}

impl NextAction {
    fn parse(s: &str) -> NextAction {
        match s {
            "sales_pitch" => NextAction::SalesPitch,
            "collect_info" => NextAction::CollectInfo,
            "verify_kyc" => NextAction::VerifyKyc,
            "process_application" => NextAction::ProcessApplication,
            "request_documents" => NextAction::RequestDocuments,
            "handle_objection" => NextAction::HandleObjection,
            "close_deal" => NextAction::CloseDeal,
            _ => NextAction::Other,
        }
    }
}

/// Result of intent analysis for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentAnalysis {
    pub intent: Intent,
    pub confidence: f32,
    pub next_action: NextAction,
}

impl Default for IntentAnalysis {
    fn default() -> Self {
        Self {
            intent: Intent::Inquiry,
            confidence: 0.0,
            next_action: NextAction::SalesPitch,
        }
    }
}

/// The shape the NL service is asked to return. Every field is optional so
/// a sloppy response still yields a usable analysis.
#[derive(Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    intent: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    next_action: Option<String>,
}

/// Parse the service's JSON into an analysis; `None` if not even an object.
pub fn parse_analysis(raw_json: &str) -> Option<IntentAnalysis> {
    let raw: RawAnalysis = serde_json::from_str(raw_json.trim()).ok()?;
    let default = IntentAnalysis::default();
    Some(IntentAnalysis {
        intent: raw
            .intent
            .as_deref()
            .map(Intent::parse)
            .unwrap_or(default.intent),
        confidence: raw.confidence.unwrap_or(default.confidence),
        next_action: raw
            .next_action
            .as_deref()
            .map(NextAction::parse)
            .unwrap_or(default.next_action),
    })
}

const INTENT_SYSTEM_PROMPT: &str = "\
You are an AI that analyzes conversation intent for a loan sales process.
Determine the user's intent and the appropriate next step. Respond with JSON in this format:
{
    \"intent\": \"greeting|inquiry|personal_info|loan_details|verification|document_upload|objection|closing\",
    \"confidence\": 0.0-1.0,
    \"next_action\": \"sales_pitch|collect_info|verify_kyc|process_application|request_documents|handle_objection|close_deal\"
}";

/// Classify the current turn against the recent conversation window.
///
/// Any provider or parse failure returns the default analysis.
pub async fn analyze_intent(
    llm: &Arc<dyn LlmProvider>,
    history: &[Turn],
    message: &str,
) -> IntentAnalysis {
    let context = render_history(history);
    let request = CompletionRequest::new(INTENT_SYSTEM_PROMPT, message)
        .with_context(context)
        .json_mode()
        .with_temperature(0.0);

    let raw = match llm.complete(request).await {
        Ok(response) => response.content,
        Err(e) => {
            tracing::warn!(error = %e, "intent analysis call failed, using default intent");
            return IntentAnalysis::default();
        }
    };

    parse_analysis(&raw).unwrap_or_else(|| {
        tracing::warn!(raw = %raw, "intent analysis returned unparseable JSON");
        IntentAnalysis::default()
    })
}

fn render_history(history: &[Turn]) -> String {
    let lines: Vec<String> = history
        .iter()
        .map(|turn| {
            let speaker = match turn.speaker {
                Speaker::Applicant => "User",
                Speaker::Assistant => "Assistant",
            };
            format!("{speaker}: {}", turn.text)
        })
        .collect();
    format!("Conversation history:\n{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_analysis() {
        let analysis = parse_analysis(
            r#"{"intent": "loan_details", "confidence": 0.9, "next_action": "collect_info"}"#,
        )
        .unwrap();
        assert_eq!(analysis.intent, Intent::LoanDetails);
        assert_eq!(analysis.next_action, NextAction::CollectInfo);
        assert!((analysis.confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn unknown_labels_fall_back_to_other() {
        let analysis = parse_analysis(
            r#"{"intent": "haggling", "confidence": 0.4, "next_action": "negotiate"}"#,
        )
        .unwrap();
        assert_eq!(analysis.intent, Intent::Other);
        assert_eq!(analysis.next_action, NextAction::Other);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let analysis = parse_analysis("{}").unwrap();
        assert_eq!(analysis, IntentAnalysis::default());
    }

    #[test]
    fn garbage_is_none() {
        assert!(parse_analysis("not json at all").is_none());
    }

    #[test]
    fn default_is_inquiry_sales_pitch() {
        let analysis = IntentAnalysis::default();
        assert_eq!(analysis.intent, Intent::Inquiry);
        assert_eq!(analysis.next_action, NextAction::SalesPitch);
    }
}
