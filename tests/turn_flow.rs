//! End-to-end conversation flows through the orchestrator.
//!
//! Uses a scripted NL stub and the deterministic service doubles, so every
//! decision is reproducible.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use loan_assist::error::LlmError;
use loan_assist::llm::{CompletionRequest, CompletionResponse, LlmProvider};
use loan_assist::orchestrator::{AgentLabel, Orchestrator, OrchestratorDeps};
use loan_assist::sanction::{ArtifactStore, TextLetterRenderer};
use loan_assist::services::{FixedCreditBureau, FixedOfferCatalog, InMemoryDirectory};
use loan_assist::session::{
    ApprovalKind, ApprovalStatus, FieldName, Session, Stage, VerificationStatus,
};
use loan_assist::underwriting::DeclaredIncomeEvaluator;

/// Scripted NL stub: extraction calls pop from a queue (empty object once
/// exhausted), intent and sales calls return fixed text.
struct ScriptedLlm {
    extraction_responses: Mutex<VecDeque<String>>,
}

impl ScriptedLlm {
    fn new(extraction_responses: Vec<&str>) -> Self {
        Self {
            extraction_responses: Mutex::new(
                extraction_responses.into_iter().map(String::from).collect(),
            ),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn model_name(&self) -> &str {
        "scripted-stub"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let content = if request.system.contains("analyzes conversation intent") {
            r#"{"intent": "inquiry", "confidence": 0.8, "next_action": "sales_pitch"}"#.to_string()
        } else if request.system.contains("Extract personal information") {
            self.extraction_responses
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| "{}".to_string())
        } else {
            "Our personal loans come with competitive rates and quick approval — could you share \
             a few details so I can find your best offer?"
                .to_string()
        };
        Ok(CompletionResponse { content })
    }
}

/// NL stub that always fails, to exercise the degraded paths.
struct FailingLlm;

#[async_trait]
impl LlmProvider for FailingLlm {
    fn model_name(&self) -> &str {
        "failing-stub"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Err(LlmError::RequestFailed {
            provider: "stub".to_string(),
            reason: "service unavailable".to_string(),
        })
    }
}

fn orchestrator_with(llm: Arc<dyn LlmProvider>, letters_dir: &std::path::Path) -> Orchestrator {
    Orchestrator::new(OrchestratorDeps {
        llm,
        directory: Arc::new(InMemoryDirectory::with_demo_customers()),
        credit: Arc::new(FixedCreditBureau::demo()),
        offers: Arc::new(FixedOfferCatalog::demo()),
        proof: Arc::new(DeclaredIncomeEvaluator),
        renderer: Arc::new(TextLetterRenderer),
        artifacts: Arc::new(ArtifactStore::new(letters_dir)),
    })
}

/// Extraction payload with everything Rajesh Kumar needs for a 400k request.
const RAJESH_FULL: &str = r#"{
    "name": "Rajesh Kumar",
    "phone": "9876543210",
    "email": "rajesh.kumar@email.com",
    "city": "Mumbai",
    "monthly_income": 85000,
    "loan_amount": 400000,
    "loan_purpose": "home_improvement"
}"#;

#[tokio::test]
async fn instant_approval_happy_path() {
    let tmp = tempfile::tempdir().unwrap();
    let llm = Arc::new(ScriptedLlm::new(vec!["{}", RAJESH_FULL]));
    let orchestrator = orchestrator_with(llm, tmp.path());
    let mut session = Session::new(Uuid::new_v4());

    // Turn 1: loan intent moves straight into the sales pitch.
    let outcome = orchestrator.handle_turn(&mut session, "Hi, I need a loan").await;
    assert_eq!(session.stage, Stage::SalesPitch);
    assert_eq!(outcome.agent, AgentLabel::Sales);

    // Turn 2: everything supplied at once — straight to verification.
    let outcome = orchestrator
        .handle_turn(&mut session, "Sure, here are all my details...")
        .await;
    assert_eq!(session.stage, Stage::Verification);
    assert!(outcome.reply.contains("verify"));

    // Turn 3: directory match enriches the record and moves to underwriting.
    let outcome = orchestrator.handle_turn(&mut session, "ok").await;
    assert_eq!(session.stage, Stage::Underwriting);
    assert_eq!(session.verification, VerificationStatus::Verified);
    assert_eq!(outcome.agent, AgentLabel::Verification);
    assert!(outcome.reply.contains("existing customer"));

    // Turn 4: 400k ≤ 500k limit with a 785 score — instant approval.
    let outcome = orchestrator.handle_turn(&mut session, "go ahead").await;
    assert_eq!(session.stage, Stage::Sanction);
    assert_eq!(session.approval_status, ApprovalStatus::Approved);
    assert_eq!(session.approval_kind, Some(ApprovalKind::Instant));
    assert!(session.emi_details.is_none());
    assert!(outcome.reply.contains("instantly approved"));
    let app = session.loan_application.as_ref().unwrap();
    assert_eq!(app.requested_amount, 400000);
    assert_eq!(app.pre_approved_limit, 500000);
    assert_eq!(app.credit_score, 785);

    // Turn 5: sanction letter generated, conversation completes.
    let outcome = orchestrator.handle_turn(&mut session, "thanks!").await;
    assert_eq!(session.stage, Stage::Completed);
    assert!(outcome.loan_approved);
    let url = outcome.sanction_letter_url.unwrap();
    assert!(url.starts_with("/download_sanction_letter/sanction_letter_Rajesh_Kumar_"));
    assert!(session.sanction_letter.is_some());

    // Turn 6: terminal stage absorbs further turns without mutation.
    let before = session.stage;
    let outcome = orchestrator.handle_turn(&mut session, "hello again?").await;
    assert_eq!(session.stage, before);
    assert!(outcome.reply.contains("Thank you for your interest"));
    assert!(!outcome.loan_approved);
}

#[tokio::test]
async fn income_proof_path_approves_affordable_emi() {
    let tmp = tempfile::tempdir().unwrap();
    // New customer: unknown phone, 60k income → fallback limit 420k.
    let full = r#"{
        "name": "Nisha Verma",
        "phone": "5550001111",
        "email": "nisha.verma@email.com",
        "city": "Indore",
        "monthly_income": 60000,
        "loan_amount": 800000,
        "loan_purpose": "education"
    }"#;
    let llm = Arc::new(ScriptedLlm::new(vec![full]));
    let orchestrator = orchestrator_with(llm, tmp.path());
    let mut session = Session::new(Uuid::new_v4());

    orchestrator.handle_turn(&mut session, "I want to borrow some money").await;
    assert_eq!(session.stage, Stage::Verification);

    let outcome = orchestrator.handle_turn(&mut session, "ok").await;
    assert_eq!(session.verification, VerificationStatus::NewCustomer);
    assert!(outcome.reply.contains("new customer"));
    assert_eq!(session.stage, Stage::Underwriting);

    // 800k is between 420k and 840k — income proof required.
    let outcome = orchestrator.handle_turn(&mut session, "sounds good").await;
    assert_eq!(session.stage, Stage::DocumentUpload);
    assert!(outcome.requires_upload);

    // A plain turn in document_upload re-prompts without state change.
    let outcome = orchestrator.handle_turn(&mut session, "one sec").await;
    assert_eq!(session.stage, Stage::DocumentUpload);
    assert!(outcome.requires_upload);

    // Upload: EMI ≈ 26571 on 800k, ratio ≈ 0.44 ≤ 0.5 — approved, letter
    // generated in the same exchange.
    let outcome = orchestrator
        .handle_upload(&mut session, b"salary slip bytes", "pdf")
        .await;
    assert_eq!(session.stage, Stage::Completed);
    assert_eq!(session.approval_status, ApprovalStatus::Approved);
    assert_eq!(session.approval_kind, Some(ApprovalKind::DocumentVerified));
    let emi = session.emi_details.as_ref().unwrap();
    assert_eq!(emi.tenure_months, 36);
    assert!(emi.monthly_emi > rust_decimal_macros::dec!(26000));
    assert!(emi.monthly_emi < rust_decimal_macros::dec!(27000));
    assert!(outcome.loan_approved);
    assert!(outcome.sanction_letter_url.is_some());
}

#[tokio::test]
async fn income_proof_path_rejects_unverifiable_income() {
    let tmp = tempfile::tempdir().unwrap();
    // Income arrives as prose, so it coerces to 0 everywhere downstream:
    // the offer falls back to the default-income tier (limit 325k), the
    // 600k request lands in the proof band (≤ 650k), and the declared
    // income of 0 can never satisfy the EMI ratio.
    let full = r#"{
        "name": "Tarun Shah",
        "phone": "5550002222",
        "email": "tarun.shah@email.com",
        "city": "Surat",
        "monthly_income": "nine thousand a month",
        "loan_amount": 600000,
        "loan_purpose": "travel"
    }"#;
    let llm = Arc::new(ScriptedLlm::new(vec![full]));
    let orchestrator = orchestrator_with(llm, tmp.path());
    let mut session = Session::new(Uuid::new_v4());

    orchestrator.handle_turn(&mut session, "need some finance help").await;
    orchestrator.handle_turn(&mut session, "ok").await;
    let outcome = orchestrator.handle_turn(&mut session, "continue").await;
    assert_eq!(session.stage, Stage::DocumentUpload);
    assert!(outcome.requires_upload);
    // The raw evidence is retained even though it never parsed.
    assert_eq!(
        session
            .customer_data
            .get(FieldName::MonthlyIncome)
            .unwrap()
            .as_str(),
        Some("nine thousand a month")
    );

    let outcome = orchestrator
        .handle_upload(&mut session, b"salary slip bytes", "pdf")
        .await;
    assert_eq!(session.stage, Stage::Rejected);
    assert_eq!(session.approval_status, ApprovalStatus::Rejected);
    assert_eq!(
        session.rejection_reason,
        Some(loan_assist::session::RejectionReason::HighEmiRatio)
    );
    assert!(session.emi_details.is_none());
    assert!(!outcome.loan_approved);
    assert!(outcome.reply.contains("comfortable lending ratio"));
}

#[tokio::test]
async fn amount_far_over_limit_rejects() {
    let tmp = tempfile::tempdir().unwrap();
    let over = r#"{
        "name": "Rajesh Kumar",
        "phone": "9876543210",
        "email": "rajesh.kumar@email.com",
        "city": "Mumbai",
        "monthly_income": 85000,
        "loan_amount": 1200000,
        "loan_purpose": "business"
    }"#;
    let llm = Arc::new(ScriptedLlm::new(vec![over]));
    let orchestrator = orchestrator_with(llm, tmp.path());
    let mut session = Session::new(Uuid::new_v4());

    orchestrator.handle_turn(&mut session, "I need a big loan").await;
    orchestrator.handle_turn(&mut session, "ok").await;
    // 1.2M > 2 x 500k → rejected.
    let outcome = orchestrator.handle_turn(&mut session, "proceed").await;
    assert_eq!(session.stage, Stage::Rejected);
    assert_eq!(
        session.rejection_reason,
        Some(loan_assist::session::RejectionReason::AmountTooHigh)
    );
    assert!(outcome.reply.contains("exceeds our current lending criteria"));

    // Terminal stability: uploads are absorbed too.
    let outcome = orchestrator.handle_upload(&mut session, b"slip", "pdf").await;
    assert_eq!(session.stage, Stage::Rejected);
    assert!(outcome.reply.contains("Thank you for your interest"));
}

#[tokio::test]
async fn low_credit_score_rejects_before_amount_check() {
    let tmp = tempfile::tempdir().unwrap();
    // Rohit Joshi scores 650 — below the 700 gate, despite a tiny request.
    let rohit = r#"{
        "name": "Rohit Joshi",
        "phone": "9876543216",
        "email": "rohit.joshi@email.com",
        "city": "Kolkata",
        "monthly_income": 48000,
        "loan_amount": 50000,
        "loan_purpose": "medical"
    }"#;
    let llm = Arc::new(ScriptedLlm::new(vec![rohit]));
    let orchestrator = orchestrator_with(llm, tmp.path());
    let mut session = Session::new(Uuid::new_v4());

    orchestrator.handle_turn(&mut session, "need money for a medical bill").await;
    orchestrator.handle_turn(&mut session, "ok").await;
    let outcome = orchestrator.handle_turn(&mut session, "go on").await;
    assert_eq!(session.stage, Stage::Rejected);
    assert_eq!(
        session.rejection_reason,
        Some(loan_assist::session::RejectionReason::CreditScore)
    );
    assert!(outcome.reply.contains("credit bureau information"));
}

#[tokio::test]
async fn collect_stage_asks_in_fixed_order() {
    let tmp = tempfile::tempdir().unwrap();
    // First turn yields everything except email and city.
    let partial = r#"{
        "name": "Kavya Menon",
        "phone": "9876543217",
        "monthly_income": 68000,
        "loan_amount": 200000,
        "loan_purpose": "education"
    }"#;
    let llm = Arc::new(ScriptedLlm::new(vec![
        partial,
        "{}",
        r#"{"email": "kavya.menon@email.com"}"#,
        r#"{"city": "Kochi"}"#,
    ]));
    let orchestrator = orchestrator_with(llm, tmp.path());
    let mut session = Session::new(Uuid::new_v4());

    // 2 missing ≤ 3 → structured collection.
    orchestrator.handle_turn(&mut session, "I'd like an education loan").await;
    assert_eq!(session.stage, Stage::CollectInfo);

    // Nothing new extracted → email is asked for first, deterministically.
    let outcome = orchestrator.handle_turn(&mut session, "what do you need?").await;
    assert!(outcome.reply.contains("email address"));
    assert_eq!(session.stage, Stage::CollectInfo);

    // Email supplied → city is next.
    let outcome = orchestrator
        .handle_turn(&mut session, "kavya.menon@email.com")
        .await;
    assert!(outcome.reply.contains("city"));

    // City supplied → set complete, on to verification.
    let outcome = orchestrator.handle_turn(&mut session, "I live in Kochi").await;
    assert_eq!(session.stage, Stage::Verification);
    assert!(outcome.reply.contains("verify"));
}

#[tokio::test]
async fn greeting_reprompts_until_loan_intent() {
    let tmp = tempfile::tempdir().unwrap();
    let llm = Arc::new(ScriptedLlm::new(vec![]));
    let orchestrator = orchestrator_with(llm, tmp.path());
    let mut session = Session::new(Uuid::new_v4());

    let outcome = orchestrator.handle_turn(&mut session, "nice weather today").await;
    assert_eq!(session.stage, Stage::Greeting);
    assert_eq!(outcome.agent, AgentLabel::Master);
    assert!(outcome.reply.contains("exploring financial options"));

    // Still no intent keyword — stays in greeting.
    orchestrator.handle_turn(&mut session, "just browsing").await;
    assert_eq!(session.stage, Stage::Greeting);

    // Intent keyword flips into the sales pitch.
    orchestrator.handle_turn(&mut session, "actually I want to borrow").await;
    assert_eq!(session.stage, Stage::SalesPitch);
}

#[tokio::test]
async fn nl_failures_degrade_without_losing_the_session() {
    let tmp = tempfile::tempdir().unwrap();
    let orchestrator = orchestrator_with(Arc::new(FailingLlm), tmp.path());
    let mut session = Session::new(Uuid::new_v4());

    // Intent, extraction, and the sales reply all fail — the turn still
    // completes with the fallback pitch and an unchanged data record.
    let outcome = orchestrator.handle_turn(&mut session, "I need a loan").await;
    assert_eq!(session.stage, Stage::SalesPitch);
    assert_eq!(outcome.agent, AgentLabel::Sales);
    assert!(outcome.reply.contains("competitive rates"));
    assert!(session.customer_data.missing_required().len() == 7);
}

#[tokio::test]
async fn upload_outside_document_stage_is_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    let llm = Arc::new(ScriptedLlm::new(vec![]));
    let orchestrator = orchestrator_with(llm, tmp.path());
    let mut session = Session::new(Uuid::new_v4());

    let outcome = orchestrator.handle_upload(&mut session, b"eager upload", "pdf").await;
    assert_eq!(session.stage, Stage::Initial);
    assert_eq!(session.approval_status, ApprovalStatus::Pending);
    assert!(outcome.reply.contains("don't need any documents"));
}

#[tokio::test]
async fn re_extraction_of_known_turn_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    // Most fields on the first turn, so the session parks in collect_info.
    let partial = r#"{
        "name": "Vikram Singh",
        "phone": "9876543214",
        "monthly_income": 75000,
        "loan_amount": 350000,
        "loan_purpose": "debt_consolidation"
    }"#;
    let llm = Arc::new(ScriptedLlm::new(vec![partial, "{}"]));
    let orchestrator = orchestrator_with(llm, tmp.path());
    let mut session = Session::new(Uuid::new_v4());

    orchestrator.handle_turn(&mut session, "I need a loan, details attached").await;
    assert_eq!(session.stage, Stage::CollectInfo);
    let data_before = session.customer_data.clone();
    let stage_before = session.stage;

    // Second turn extracts nothing new — the record is byte-for-byte stable.
    orchestrator.handle_turn(&mut session, "anything else?").await;
    assert_eq!(session.customer_data, data_before);
    assert_eq!(session.stage, stage_before);
}
