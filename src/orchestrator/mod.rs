//! Stage orchestrator — routes each applicant turn to the right handler and
//! computes the reply, the session mutation, and the next stage.
//!
//! `handle_turn` never fails for malformed input: NL failures degrade to
//! defaults, lookup misses are normal branches, and terminal stages absorb
//! all further turns with a courtesy reply.

pub mod intent;
pub mod prompts;
pub mod replies;

use std::sync::Arc;

use crate::extraction::ExtractionPipeline;
use crate::llm::{CompletionRequest, LlmProvider};
use crate::sanction::{ArtifactStore, LetterRenderer, SanctionRecord};
use crate::services::{CreditScoreService, OfferCatalog};
use crate::session::{
    ApprovalKind, ApprovalStatus, EmiDetails, FieldName, LoanApplication, Session, Speaker, Stage,
    VerificationStatus,
};
use crate::underwriting::{self, Decision, IncomeProofEvaluator, ProofDecision};
use crate::verification::VerificationAdapter;

use intent::analyze_intent;

/// Keywords that signal loan intent in the opening turns (substring match,
/// case-insensitive).
const LOAN_INTENT_LEXICON: [&str; 6] = ["loan", "money", "borrow", "finance", "need", "help"];

/// Which agent authored a reply — surfaced to the client UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentLabel {
    Master,
    Sales,
    Verification,
    Underwriting,
    SanctionLetter,
}

impl std::fmt::Display for AgentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Master => "Master Agent",
            Self::Sales => "Sales Agent",
            Self::Verification => "Verification Agent",
            Self::Underwriting => "Underwriting Agent",
            Self::SanctionLetter => "Sanction Letter Agent",
        };
        write!(f, "{s}")
    }
}

/// Result of processing one turn or upload.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    pub agent: AgentLabel,
    pub requires_upload: bool,
    pub loan_approved: bool,
    /// Download path of the generated sanction letter, when one exists.
    pub sanction_letter_url: Option<String>,
}

impl TurnOutcome {
    fn new(reply: impl Into<String>, agent: AgentLabel) -> Self {
        Self {
            reply: reply.into(),
            agent,
            requires_upload: false,
            loan_approved: false,
            sanction_letter_url: None,
        }
    }

    fn with_upload(mut self) -> Self {
        self.requires_upload = true;
        self
    }
}

/// Dependencies for the orchestrator, all injected.
pub struct OrchestratorDeps {
    pub llm: Arc<dyn LlmProvider>,
    pub directory: Arc<dyn crate::services::CustomerDirectory>,
    pub credit: Arc<dyn CreditScoreService>,
    pub offers: Arc<dyn OfferCatalog>,
    pub proof: Arc<dyn IncomeProofEvaluator>,
    pub renderer: Arc<dyn LetterRenderer>,
    pub artifacts: Arc<ArtifactStore>,
}

/// The top-level state machine over applicant sessions.
pub struct Orchestrator {
    llm: Arc<dyn LlmProvider>,
    extraction: ExtractionPipeline,
    verification: VerificationAdapter,
    credit: Arc<dyn CreditScoreService>,
    offers: Arc<dyn OfferCatalog>,
    proof: Arc<dyn IncomeProofEvaluator>,
    renderer: Arc<dyn LetterRenderer>,
    artifacts: Arc<ArtifactStore>,
}

impl Orchestrator {
    pub fn new(deps: OrchestratorDeps) -> Self {
        Self {
            extraction: ExtractionPipeline::new(Arc::clone(&deps.llm)),
            verification: VerificationAdapter::new(deps.directory),
            llm: deps.llm,
            credit: deps.credit,
            offers: deps.offers,
            proof: deps.proof,
            renderer: deps.renderer,
            artifacts: deps.artifacts,
        }
    }

    /// Greeting sent when a session is created.
    pub fn start_conversation(&self) -> &'static str {
        replies::WELCOME
    }

    /// Process one free-text turn. The caller holds the session lock for
    /// the duration of the call, so turns within a session are ordered.
    pub async fn handle_turn(&self, session: &mut Session, user_text: &str) -> TurnOutcome {
        session.record_turn(Speaker::Applicant, user_text, None);

        let outcome = match session.stage {
            Stage::Initial | Stage::Greeting => self.initial_stage(session, user_text).await,
            Stage::SalesPitch => self.sales_stage(session, user_text).await,
            Stage::CollectInfo => self.collect_stage(session, user_text).await,
            Stage::Verification => self.verification_stage(session).await,
            Stage::Underwriting => self.underwriting_stage(session).await,
            Stage::DocumentUpload => {
                TurnOutcome::new(replies::UPLOAD_REPROMPT, AgentLabel::Master).with_upload()
            }
            Stage::Sanction => self.sanction_stage(session).await,
            Stage::Rejected | Stage::Completed => {
                TurnOutcome::new(replies::COURTESY, AgentLabel::Master)
            }
        };

        let agent = outcome.agent.to_string();
        session.record_turn(Speaker::Assistant, &outcome.reply, Some(&agent));
        outcome
    }

    /// Process a salary-proof upload. Only meaningful in `DocumentUpload`;
    /// any other stage gets a gentle redirect with no state change.
    pub async fn handle_upload(
        &self,
        session: &mut Session,
        file_bytes: &[u8],
        file_type: &str,
    ) -> TurnOutcome {
        if session.stage != Stage::DocumentUpload {
            let reply = if session.stage.is_terminal() {
                replies::COURTESY
            } else {
                replies::UPLOAD_NOT_EXPECTED
            };
            return TurnOutcome::new(reply, AgentLabel::Master);
        }

        let declared_income = session
            .customer_data
            .get(FieldName::MonthlyIncome)
            .map(|v| v.coerce_i64())
            .unwrap_or(0);
        let requested_amount = session
            .customer_data
            .get(FieldName::LoanAmount)
            .map(|v| v.coerce_i64())
            .unwrap_or(0);

        let effective_income = self
            .proof
            .effective_income(declared_income, file_bytes, file_type)
            .await;
        tracing::info!(
            session = %session.id,
            declared_income,
            effective_income,
            "evaluating salary proof"
        );

        let outcome = match underwriting::evaluate_proof(effective_income, requested_amount) {
            ProofDecision::Approved {
                monthly_emi,
                tenure_months,
            } => {
                // EMI details and the approval are committed together.
                session.emi_details = Some(EmiDetails {
                    monthly_emi,
                    tenure_months,
                });
                session.approval_status = ApprovalStatus::Approved;
                session.approval_kind = Some(ApprovalKind::DocumentVerified);
                session.set_stage(Stage::Sanction);
                self.sanction_stage(session).await
            }
            ProofDecision::Reject(reason) => {
                session.approval_status = ApprovalStatus::Rejected;
                session.rejection_reason = Some(reason);
                session.set_stage(Stage::Rejected);
                TurnOutcome::new(replies::rejection_message(reason), AgentLabel::Underwriting)
            }
        };

        let agent = outcome.agent.to_string();
        session.record_turn(Speaker::Assistant, &outcome.reply, Some(&agent));
        outcome
    }

    // ── Stage handlers ──────────────────────────────────────────────

    async fn initial_stage(&self, session: &mut Session, user_text: &str) -> TurnOutcome {
        let lowered = user_text.to_lowercase();
        let has_loan_intent = LOAN_INTENT_LEXICON.iter().any(|kw| lowered.contains(kw));

        if has_loan_intent {
            session.set_stage(Stage::SalesPitch);
            self.sales_stage(session, user_text).await
        } else {
            session.set_stage(Stage::Greeting);
            TurnOutcome::new(replies::GREETING_REPROMPT, AgentLabel::Master)
        }
    }

    async fn sales_stage(&self, session: &mut Session, user_text: &str) -> TurnOutcome {
        let analysis = analyze_intent(&self.llm, session.recent_history(), user_text).await;

        // Extraction runs before any completeness check so information in
        // this very utterance is not asked for again.
        let patch = self
            .extraction
            .extract(user_text, &session.customer_data, session.recent_history())
            .await;
        session.customer_data.apply_patch(&patch);

        let missing = session.customer_data.missing_required();
        if missing.is_empty() {
            session.set_stage(Stage::Verification);
            return TurnOutcome::new(replies::SALES_COMPLETE, AgentLabel::Sales);
        }

        let request = CompletionRequest::new(
            prompts::sales_prompt(&session.customer_data, &analysis),
            user_text,
        );
        let reply = match self.llm.complete(request).await {
            Ok(response) => response.content,
            Err(e) => {
                tracing::warn!(error = %e, "sales reply generation failed, using fallback");
                replies::SALES_FALLBACK.to_string()
            }
        };

        // Most fields in hand: switch to structured collection.
        if missing.len() <= 3 {
            session.set_stage(Stage::CollectInfo);
        }

        TurnOutcome::new(reply, AgentLabel::Sales)
    }

    async fn collect_stage(&self, session: &mut Session, user_text: &str) -> TurnOutcome {
        let patch = self
            .extraction
            .extract(user_text, &session.customer_data, session.recent_history())
            .await;
        session.customer_data.apply_patch(&patch);

        let missing = session.customer_data.missing_required();
        match missing.first() {
            None => {
                session.set_stage(Stage::Verification);
                TurnOutcome::new(replies::COLLECT_COMPLETE, AgentLabel::Sales)
            }
            // Deterministic: always the first missing field in REQUIRED order.
            Some(field) => TurnOutcome::new(replies::next_question(*field), AgentLabel::Sales),
        }
    }

    async fn verification_stage(&self, session: &mut Session) -> TurnOutcome {
        let phone = session
            .customer_data
            .get(FieldName::Phone)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        let outcome = self.verification.verify(&phone).await;
        // Directory data takes precedence over self-reported values.
        session.customer_data.apply_patch(&outcome.patch);
        session.verification = if outcome.verified {
            VerificationStatus::Verified
        } else {
            VerificationStatus::NewCustomer
        };

        // Both branches proceed to underwriting.
        session.set_stage(Stage::Underwriting);

        let reply = if outcome.verified {
            replies::VERIFIED
        } else {
            replies::NEW_CUSTOMER
        };
        TurnOutcome::new(reply, AgentLabel::Verification)
    }

    async fn underwriting_stage(&self, session: &mut Session) -> TurnOutcome {
        let phone = session
            .customer_data
            .get(FieldName::Phone)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        let credit_score = self.credit.credit_score(&phone).await;
        let offer = self.offers.offer_for(&session.customer_data).await;

        // Non-numeric amounts coerce to 0 — the deliberate permissive
        // default; see DESIGN.md.
        let requested_amount = session
            .customer_data
            .get(FieldName::LoanAmount)
            .map(|v| v.coerce_i64())
            .unwrap_or(0);

        session.loan_application = Some(LoanApplication {
            requested_amount,
            pre_approved_limit: offer.pre_approved_limit,
            credit_score,
        });
        let pre_approved_limit = offer.pre_approved_limit;
        session.offer_details = Some(offer);

        tracing::info!(
            session = %session.id,
            credit_score,
            requested_amount,
            pre_approved_limit,
            "underwriting application"
        );

        match underwriting::decide(credit_score, requested_amount, pre_approved_limit) {
            Decision::InstantApprove => {
                session.approval_status = ApprovalStatus::Approved;
                session.approval_kind = Some(ApprovalKind::Instant);
                session.set_stage(Stage::Sanction);
                TurnOutcome::new(replies::INSTANT_APPROVAL, AgentLabel::Underwriting)
            }
            Decision::RequestIncomeProof => {
                session.set_stage(Stage::DocumentUpload);
                TurnOutcome::new(replies::REQUEST_SALARY_SLIP, AgentLabel::Underwriting)
                    .with_upload()
            }
            Decision::Reject(reason) => {
                session.approval_status = ApprovalStatus::Rejected;
                session.rejection_reason = Some(reason);
                session.set_stage(Stage::Rejected);
                TurnOutcome::new(replies::rejection_message(reason), AgentLabel::Underwriting)
            }
        }
    }

    async fn sanction_stage(&self, session: &mut Session) -> TurnOutcome {
        let record = SanctionRecord::from_session(session);
        let bytes = self.renderer.render(&record);

        match self.artifacts.store(&record.customer_name, &bytes).await {
            Ok(filename) => {
                let url = format!("/download_sanction_letter/{filename}");
                session.sanction_letter = Some(filename);
                session.set_stage(Stage::Completed);
                let mut outcome = TurnOutcome::new(
                    replies::sanction_message(&record.customer_name),
                    AgentLabel::SanctionLetter,
                );
                outcome.loan_approved = true;
                outcome.sanction_letter_url = Some(url);
                outcome
            }
            Err(e) => {
                // Stay in Sanction so the next turn retries generation.
                tracing::warn!(error = %e, session = %session.id, "sanction letter generation failed");
                TurnOutcome::new(replies::LETTER_DELAYED, AgentLabel::SanctionLetter)
            }
        }
    }
}
