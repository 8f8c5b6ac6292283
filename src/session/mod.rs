//! Applicant session: stage machine, typed data model, and the live store.

pub mod model;
pub mod stage;
pub mod store;

pub use model::{
    ApprovalKind, ApprovalStatus, CustomerData, EmiDetails, FieldName, FieldPatch, FieldValue,
    LoanApplication, Offer, RejectionReason, Session, Speaker, Turn, VerificationStatus,
    HISTORY_WINDOW,
};
pub use stage::Stage;
pub use store::{InMemorySessionStore, SessionHandle, SessionStore};
