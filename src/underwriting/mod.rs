//! Underwriting engine — deterministic eligibility and approval rules.
//!
//! Pure functions over (credit score, requested amount, pre-approved limit,
//! income). The external inputs (bureau score, offer, income proof) are
//! fetched by the orchestrator and passed in; nothing here performs I/O.

pub mod proof;

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

use crate::session::RejectionReason;

pub use proof::{DeclaredIncomeEvaluator, IncomeProofEvaluator, VarianceDemoEvaluator};

/// Minimum bureau score for any approval. Fixed business rule.
pub const MIN_CREDIT_SCORE: u32 = 700;

/// Annual reducing-balance interest rate used for EMI affordability.
pub const ANNUAL_INTEREST_RATE: Decimal = dec!(0.12);

/// Default tenure for the affordability check.
pub const DEFAULT_TENURE_MONTHS: u32 = 36;

/// EMI must not exceed this share of effective income.
pub const MAX_EMI_RATIO: Decimal = dec!(0.5);

/// Outcome of the initial underwriting pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Amount within the pre-approved limit: approve on the spot.
    InstantApprove,
    /// Amount within 2x the limit: income proof required before deciding.
    RequestIncomeProof,
    Reject(RejectionReason),
}

/// Outcome of the document-verified affordability check.
#[derive(Debug, Clone, PartialEq)]
pub enum ProofDecision {
    Approved {
        monthly_emi: Decimal,
        tenure_months: u32,
    },
    Reject(RejectionReason),
}

/// Initial underwriting decision.
///
/// The credit gate applies first and is independent of amount; the amount
/// is then compared against the tiered pre-approved limit.
pub fn decide(credit_score: u32, requested_amount: i64, pre_approved_limit: i64) -> Decision {
    if credit_score < MIN_CREDIT_SCORE {
        return Decision::Reject(RejectionReason::CreditScore);
    }
    if requested_amount <= pre_approved_limit {
        Decision::InstantApprove
    } else if requested_amount <= 2 * pre_approved_limit {
        Decision::RequestIncomeProof
    } else {
        Decision::Reject(RejectionReason::AmountTooHigh)
    }
}

/// Standard reducing-balance annuity EMI, rounded to 2 decimal places.
///
/// EMI = P * i * (1+i)^n / ((1+i)^n - 1) with monthly rate i = annual/12.
pub fn monthly_emi(principal: i64, annual_rate: Decimal, tenure_months: u32) -> Decimal {
    let principal = Decimal::from(principal);
    let monthly_rate = annual_rate / dec!(12);
    let growth = (Decimal::ONE + monthly_rate).powi(tenure_months as i64);
    let emi = principal * monthly_rate * growth / (growth - Decimal::ONE);
    emi.round_dp(2)
}

/// Document-verified affordability check.
///
/// Approves iff EMI / effective income <= 0.5. A non-positive effective
/// income can never satisfy the ratio and rejects outright.
pub fn evaluate_proof(effective_income: i64, requested_amount: i64) -> ProofDecision {
    let emi = monthly_emi(requested_amount, ANNUAL_INTEREST_RATE, DEFAULT_TENURE_MONTHS);

    if effective_income <= 0 {
        return ProofDecision::Reject(RejectionReason::HighEmiRatio);
    }

    let ratio = emi / Decimal::from(effective_income);
    if ratio <= MAX_EMI_RATIO {
        ProofDecision::Approved {
            monthly_emi: emi,
            tenure_months: DEFAULT_TENURE_MONTHS,
        }
    } else {
        ProofDecision::Reject(RejectionReason::HighEmiRatio)
    }
}
