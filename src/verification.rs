//! Verification adapter — wraps the customer directory lookup.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::services::{CustomerDirectory, DirectoryRecord};
use crate::session::{FieldName, FieldPatch, FieldValue};

/// KYC state after the directory check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    Complete,
    Required,
}

/// Outcome of a verification attempt.
///
/// Both branches proceed to underwriting; they differ only in the patch and
/// KYC status.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationOutcome {
    pub verified: bool,
    pub kyc_status: KycStatus,
    pub patch: FieldPatch,
}

/// Wraps `CustomerDirectory` behind the pipeline's verified/unverified
/// contract. A lookup miss is the new-customer branch, not an error.
pub struct VerificationAdapter {
    directory: Arc<dyn CustomerDirectory>,
}

impl VerificationAdapter {
    pub fn new(directory: Arc<dyn CustomerDirectory>) -> Self {
        Self { directory }
    }

    /// Verify an applicant by phone.
    ///
    /// Directory data takes precedence over self-reported values on a match;
    /// the returned patch may overwrite fields already collected. Backend
    /// failures degrade to the unverified branch.
    pub async fn verify(&self, phone: &str) -> VerificationOutcome {
        if phone.is_empty() {
            return VerificationOutcome {
                verified: false,
                kyc_status: KycStatus::Required,
                patch: FieldPatch::new(),
            };
        }

        let record = match self.directory.lookup(phone).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "directory lookup failed, treating as new customer");
                None
            }
        };

        match record {
            Some(record) => VerificationOutcome {
                verified: true,
                kyc_status: KycStatus::Complete,
                patch: directory_patch(&record),
            },
            None => VerificationOutcome {
                verified: false,
                kyc_status: KycStatus::Required,
                patch: FieldPatch::new(),
            },
        }
    }
}

/// Project a directory record onto the customer-data vocabulary.
fn directory_patch(record: &DirectoryRecord) -> FieldPatch {
    let mut patch = FieldPatch::new();
    patch.insert(FieldName::Name, FieldValue::Text(record.name.clone()));
    patch.insert(FieldName::Email, FieldValue::Text(record.email.clone()));
    patch.insert(FieldName::City, FieldValue::Text(record.city.clone()));
    patch.insert(FieldName::MonthlyIncome, FieldValue::Number(record.monthly_income));
    patch.insert(FieldName::Age, FieldValue::Number(record.age));
    patch.insert(
        FieldName::EmploymentType,
        FieldValue::Text(record.employment_type.clone()),
    );
    patch.insert(
        FieldName::CompanyName,
        FieldValue::Text(record.company_name.clone()),
    );
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryDirectory;
    use crate::session::CustomerData;

    #[tokio::test]
    async fn match_returns_directory_patch() {
        let adapter =
            VerificationAdapter::new(Arc::new(InMemoryDirectory::with_demo_customers()));
        let outcome = adapter.verify("9876543210").await;
        assert!(outcome.verified);
        assert_eq!(outcome.kyc_status, KycStatus::Complete);
        assert_eq!(
            outcome.patch.get(FieldName::Name),
            Some(&FieldValue::Text("Rajesh Kumar".into()))
        );
        assert_eq!(
            outcome.patch.get(FieldName::MonthlyIncome),
            Some(&FieldValue::Number(85000))
        );
    }

    #[tokio::test]
    async fn directory_data_overwrites_self_reported() {
        let adapter =
            VerificationAdapter::new(Arc::new(InMemoryDirectory::with_demo_customers()));

        let mut data = CustomerData::default();
        let mut claimed = FieldPatch::new();
        claimed.insert(FieldName::MonthlyIncome, FieldValue::Number(999_999));
        claimed.insert(FieldName::City, FieldValue::Text("Goa".into()));
        data.apply_patch(&claimed);

        let outcome = adapter.verify("9876543211").await;
        data.apply_patch(&outcome.patch);

        assert_eq!(data.get(FieldName::MonthlyIncome).unwrap().as_i64(), Some(65000));
        assert_eq!(data.get(FieldName::City).unwrap().as_str(), Some("Delhi"));
    }

    #[tokio::test]
    async fn miss_is_new_customer_branch() {
        let adapter = VerificationAdapter::new(Arc::new(InMemoryDirectory::new()));
        let outcome = adapter.verify("5550001111").await;
        assert!(!outcome.verified);
        assert_eq!(outcome.kyc_status, KycStatus::Required);
        assert!(outcome.patch.is_empty());
    }

    #[tokio::test]
    async fn empty_phone_short_circuits() {
        let adapter =
            VerificationAdapter::new(Arc::new(InMemoryDirectory::with_demo_customers()));
        let outcome = adapter.verify("").await;
        assert!(!outcome.verified);
        assert!(outcome.patch.is_empty());
    }
}
