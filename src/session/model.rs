//! Per-applicant session record and the typed customer-data model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::stage::Stage;

/// How many history turns are fed back to the NL service as context.
pub const HISTORY_WINDOW: usize = 5;

/// Fields the pipeline knows how to store.
///
/// The first seven (see [`FieldName::REQUIRED`]) gate the transition out of
/// the collection stages; the rest arrive from the customer directory on a
/// verification match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Name,
    Phone,
    Email,
    City,
    MonthlyIncome,
    LoanAmount,
    LoanPurpose,
    Age,
    EmploymentType,
    CompanyName,
}

impl FieldName {
    /// Fields required before verification, in the fixed order used when
    /// asking for the next missing one.
    pub const REQUIRED: [FieldName; 7] = [
        FieldName::Name,
        FieldName::Phone,
        FieldName::Email,
        FieldName::City,
        FieldName::MonthlyIncome,
        FieldName::LoanAmount,
        FieldName::LoanPurpose,
    ];

    /// Map an extraction JSON key to a field, if recognized.
    pub fn from_key(key: &str) -> Option<FieldName> {
        Some(match key {
            "name" => FieldName::Name,
            "phone" => FieldName::Phone,
            "email" => FieldName::Email,
            "city" => FieldName::City,
            "monthly_income" => FieldName::MonthlyIncome,
            "loan_amount" => FieldName::LoanAmount,
            "loan_purpose" => FieldName::LoanPurpose,
            "age" => FieldName::Age,
            "employment_type" => FieldName::EmploymentType,
            "company_name" => FieldName::CompanyName,
            _ => return None,
        })
    }

    /// Whether this field is part of the required set.
    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }

    /// The snake_case key used in extraction JSON and prompts.
    pub fn key(&self) -> &'static str {
        match self {
            FieldName::Name => "name",
            FieldName::Phone => "phone",
            FieldName::Email => "email",
            FieldName::City => "city",
            FieldName::MonthlyIncome => "monthly_income",
            FieldName::LoanAmount => "loan_amount",
            FieldName::LoanPurpose => "loan_purpose",
            FieldName::Age => "age",
            FieldName::EmploymentType => "employment_type",
            FieldName::CompanyName => "company_name",
        }
    }
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A stored field value.
///
/// Numeric fields that fail integer coercion keep the raw extracted text
/// rather than being dropped — underwriting later coerces `Text` to 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(i64),
    Text(String),
}

impl FieldValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Number(_) => None,
        }
    }

    /// Whether the value carries any evidence. Empty strings do not.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Number(_) => false,
            FieldValue::Text(s) => s.trim().is_empty(),
        }
    }

    /// Coerce to an integer, defaulting to 0 for non-numeric text.
    ///
    /// This is the permissive underwriting policy inherited from the
    /// original system; see DESIGN.md before tightening it.
    pub fn coerce_i64(&self) -> i64 {
        match self {
            FieldValue::Number(n) => *n,
            FieldValue::Text(s) => s.trim().parse().unwrap_or(0),
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// A partial mapping of newly discovered fields, to be merged into a session.
///
/// An empty patch is valid and merging it is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldPatch(BTreeMap<FieldName, FieldValue>);

impl FieldPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: FieldName, value: FieldValue) {
        self.0.insert(field, value);
    }

    pub fn get(&self, field: FieldName) -> Option<&FieldValue> {
        self.0.get(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &FieldValue)> {
        self.0.iter()
    }
}

/// Accumulated structured data about the applicant.
///
/// Keys are never removed; see [`CustomerData::apply_patch`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_income: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_amount: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_purpose: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<FieldValue>,
}

impl CustomerData {
    pub fn get(&self, field: FieldName) -> Option<&FieldValue> {
        self.slot(field).as_ref()
    }

    pub fn has(&self, field: FieldName) -> bool {
        self.get(field).is_some()
    }

    /// Required fields not yet present, in the fixed `REQUIRED` order.
    pub fn missing_required(&self) -> Vec<FieldName> {
        FieldName::REQUIRED
            .into_iter()
            .filter(|f| !self.has(*f))
            .collect()
    }

    /// Merge a patch into the record, enforcing the monotonicity invariant:
    /// a field already set is only ever overwritten by a new non-empty value,
    /// never cleared. Returns how many fields were written.
    pub fn apply_patch(&mut self, patch: &FieldPatch) -> usize {
        let mut applied = 0;
        for (field, value) in patch.iter() {
            if value.is_empty() {
                continue;
            }
            *self.slot_mut(*field) = Some(value.clone());
            applied += 1;
        }
        applied
    }

    /// JSON view for embedding in NL prompts.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    fn slot(&self, field: FieldName) -> &Option<FieldValue> {
        match field {
            FieldName::Name => &self.name,
            FieldName::Phone => &self.phone,
            FieldName::Email => &self.email,
            FieldName::City => &self.city,
            FieldName::MonthlyIncome => &self.monthly_income,
            FieldName::LoanAmount => &self.loan_amount,
            FieldName::LoanPurpose => &self.loan_purpose,
            FieldName::Age => &self.age,
            FieldName::EmploymentType => &self.employment_type,
            FieldName::CompanyName => &self.company_name,
        }
    }

    fn slot_mut(&mut self, field: FieldName) -> &mut Option<FieldValue> {
        match field {
            FieldName::Name => &mut self.name,
            FieldName::Phone => &mut self.phone,
            FieldName::Email => &mut self.email,
            FieldName::City => &mut self.city,
            FieldName::MonthlyIncome => &mut self.monthly_income,
            FieldName::LoanAmount => &mut self.loan_amount,
            FieldName::LoanPurpose => &mut self.loan_purpose,
            FieldName::Age => &mut self.age,
            FieldName::EmploymentType => &mut self.employment_type,
            FieldName::CompanyName => &mut self.company_name,
        }
    }
}

/// Snapshot of the application written once at underwriting entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub requested_amount: i64,
    pub pre_approved_limit: i64,
    pub credit_score: u32,
}

/// A pre-approved offer, read-only once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub pre_approved_limit: i64,
    pub interest_rate: Decimal,
    pub tenure_max_months: u32,
}

/// EMI terms, set only on the document-verified approval path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmiDetails {
    pub monthly_emi: Decimal,
    pub tenure_months: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl Default for ApprovalStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// How an approval was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalKind {
    Instant,
    DocumentVerified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    CreditScore,
    AmountTooHigh,
    HighEmiRatio,
}

/// Outcome of the directory check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Unverified,
    Verified,
    NewCustomer,
}

impl Default for VerificationStatus {
    fn default() -> Self {
        Self::Unverified
    }
}

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Applicant,
    Assistant,
}

/// One conversation turn, appended to the session history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// One applicant conversation: created on connect, mutated on every turn,
/// discarded on disconnect or completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub stage: Stage,
    pub customer_data: CustomerData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_application: Option<LoanApplication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_details: Option<Offer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emi_details: Option<EmiDetails>,
    pub approval_status: ApprovalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_kind: Option<ApprovalKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<RejectionReason>,
    pub verification: VerificationStatus,
    /// Filename of the generated sanction letter, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sanction_letter: Option<String>,
    pub history: Vec<Turn>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            stage: Stage::default(),
            customer_data: CustomerData::default(),
            loan_application: None,
            offer_details: None,
            emi_details: None,
            approval_status: ApprovalStatus::default(),
            approval_kind: None,
            rejection_reason: None,
            verification: VerificationStatus::default(),
            sanction_letter: None,
            history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Append a turn to the history (append-only).
    pub fn record_turn(&mut self, speaker: Speaker, text: &str, agent: Option<&str>) {
        self.history.push(Turn {
            speaker,
            text: text.to_string(),
            agent: agent.map(String::from),
            timestamp: Utc::now(),
        });
    }

    /// The bounded history window used as extraction/intent context.
    pub fn recent_history(&self) -> &[Turn] {
        let start = self.history.len().saturating_sub(HISTORY_WINDOW);
        &self.history[start..]
    }

    /// Move to a new stage, enforcing the transition table.
    ///
    /// Invalid transitions are logged and ignored rather than panicking —
    /// a turn must never abort the session.
    pub fn set_stage(&mut self, target: Stage) {
        if self.stage == target {
            return;
        }
        if self.stage.can_transition_to(target) {
            tracing::debug!(from = %self.stage, to = %target, session = %self.id, "stage transition");
            self.stage = target;
        } else {
            tracing::warn!(from = %self.stage, to = %target, session = %self.id, "invalid stage transition ignored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(entries: &[(FieldName, FieldValue)]) -> FieldPatch {
        let mut p = FieldPatch::new();
        for (f, v) in entries {
            p.insert(*f, v.clone());
        }
        p
    }

    #[test]
    fn apply_patch_adds_new_fields() {
        let mut data = CustomerData::default();
        let applied = data.apply_patch(&patch(&[
            (FieldName::Name, FieldValue::Text("Rajesh Kumar".into())),
            (FieldName::MonthlyIncome, FieldValue::Number(85000)),
        ]));
        assert_eq!(applied, 2);
        assert_eq!(data.get(FieldName::Name).unwrap().as_str(), Some("Rajesh Kumar"));
        assert_eq!(data.get(FieldName::MonthlyIncome).unwrap().as_i64(), Some(85000));
    }

    #[test]
    fn apply_patch_is_monotone() {
        let mut data = CustomerData::default();
        data.apply_patch(&patch(&[(FieldName::City, FieldValue::Text("Mumbai".into()))]));

        // Empty values never clear an existing field.
        let applied = data.apply_patch(&patch(&[(FieldName::City, FieldValue::Text("  ".into()))]));
        assert_eq!(applied, 0);
        assert_eq!(data.get(FieldName::City).unwrap().as_str(), Some("Mumbai"));

        // New non-empty evidence may overwrite.
        data.apply_patch(&patch(&[(FieldName::City, FieldValue::Text("Delhi".into()))]));
        assert_eq!(data.get(FieldName::City).unwrap().as_str(), Some("Delhi"));
    }

    #[test]
    fn empty_patch_merge_is_identity() {
        let mut data = CustomerData::default();
        data.apply_patch(&patch(&[
            (FieldName::Name, FieldValue::Text("Priya".into())),
            (FieldName::LoanAmount, FieldValue::Number(300000)),
        ]));
        let before = data.clone();
        let applied = data.apply_patch(&FieldPatch::new());
        assert_eq!(applied, 0);
        assert_eq!(data, before);
    }

    #[test]
    fn missing_required_preserves_fixed_order() {
        let mut data = CustomerData::default();
        data.apply_patch(&patch(&[
            (FieldName::Name, FieldValue::Text("Amit".into())),
            (FieldName::Phone, FieldValue::Text("9876543212".into())),
            (FieldName::MonthlyIncome, FieldValue::Number(120000)),
            (FieldName::LoanAmount, FieldValue::Number(500000)),
            (FieldName::LoanPurpose, FieldValue::Text("business".into())),
        ]));
        // email comes before city, always.
        assert_eq!(data.missing_required(), vec![FieldName::Email, FieldName::City]);
    }

    #[test]
    fn coerce_keeps_numbers_and_zeroes_text() {
        assert_eq!(FieldValue::Number(45000).coerce_i64(), 45000);
        assert_eq!(FieldValue::Text("45000".into()).coerce_i64(), 45000);
        assert_eq!(FieldValue::Text("about five lakhs".into()).coerce_i64(), 0);
    }

    #[test]
    fn recent_history_is_bounded() {
        let mut session = Session::new(Uuid::new_v4());
        for i in 0..12 {
            session.record_turn(Speaker::Applicant, &format!("turn {i}"), None);
        }
        let window = session.recent_history();
        assert_eq!(window.len(), HISTORY_WINDOW);
        assert_eq!(window[0].text, "turn 7");
        assert_eq!(session.history.len(), 12);
    }

    #[test]
    fn set_stage_rejects_invalid_edges() {
        let mut session = Session::new(Uuid::new_v4());
        session.set_stage(Stage::SalesPitch);
        assert_eq!(session.stage, Stage::SalesPitch);
        // Backward jump ignored.
        session.set_stage(Stage::Initial);
        assert_eq!(session.stage, Stage::SalesPitch);
    }

    #[test]
    fn field_value_serde_is_untagged() {
        let n: FieldValue = serde_json::from_str("45000").unwrap();
        assert_eq!(n, FieldValue::Number(45000));
        let s: FieldValue = serde_json::from_str("\"wedding\"").unwrap();
        assert_eq!(s, FieldValue::Text("wedding".into()));
    }
}
