//! Pipeline stage state machine — tracks where an applicant is.

use serde::{Deserialize, Serialize};

/// The stages of the loan-origination pipeline.
///
/// A successful run visits a subsequence of: Initial → Greeting → SalesPitch →
/// CollectInfo → Verification → Underwriting → DocumentUpload → Sanction →
/// Completed. Rejection can branch off from Underwriting or DocumentUpload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Initial,
    Greeting,
    SalesPitch,
    CollectInfo,
    Verification,
    Underwriting,
    DocumentUpload,
    Sanction,
    Rejected,
    Completed,
}

impl Stage {
    /// Check if a transition from `self` to `target` is valid.
    ///
    /// Self-transitions (staying in place while collecting) are allowed for
    /// the conversational stages; everything else follows the pipeline edges.
    pub fn can_transition_to(&self, target: Stage) -> bool {
        use Stage::*;
        if self == &target {
            return matches!(self, Greeting | SalesPitch | CollectInfo | DocumentUpload);
        }
        matches!(
            (self, target),
            (Initial, Greeting)
                | (Initial, SalesPitch)
                | (Greeting, SalesPitch)
                | (SalesPitch, CollectInfo)
                | (SalesPitch, Verification)
                | (CollectInfo, Verification)
                | (Verification, Underwriting)
                | (Underwriting, Sanction)
                | (Underwriting, DocumentUpload)
                | (Underwriting, Rejected)
                | (DocumentUpload, Sanction)
                | (DocumentUpload, Rejected)
                | (Sanction, Completed)
        )
    }

    /// Whether this stage is terminal — no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::Initial
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Initial => "initial",
            Self::Greeting => "greeting",
            Self::SalesPitch => "sales_pitch",
            Self::CollectInfo => "collect_info",
            Self::Verification => "verification",
            Self::Underwriting => "underwriting",
            Self::DocumentUpload => "document_upload",
            Self::Sanction => "sanction",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}
