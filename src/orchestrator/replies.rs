//! Canned applicant-facing replies.
//!
//! Everything scripted lives here; NL-generated text is only used for the
//! persuasive sales conversation.

use crate::session::{FieldName, RejectionReason};

pub const WELCOME: &str = "Hello! Welcome to Tata Capital Personal Loans. I'm here to help you \
    find the perfect personal loan solution for your needs. Whether you're looking to consolidate \
    debt, fund a major purchase, or cover unexpected expenses, we have competitive rates and \
    flexible terms. How can I assist you today?";

pub const GREETING_REPROMPT: &str = "I understand you might be exploring financial options. \
    Personal loans can be a great solution for various needs - from home improvements to debt \
    consolidation or unexpected expenses. Would you like to know more about our personal loan \
    offerings and see if you qualify for pre-approved rates?";

pub const SALES_COMPLETE: &str = "Perfect! I have all the information I need. Let me verify your \
    details and check your eligibility for our best rates. This will just take a moment...";

pub const COLLECT_COMPLETE: &str = "Excellent! I have all your details. Let me quickly verify \
    your information in our system and check your pre-approved loan offers...";

/// Fallback when the NL service is unavailable mid-pitch.
pub const SALES_FALLBACK: &str = "We offer personal loans with competitive rates, quick approval, \
    and flexible repayment terms. Could you tell me a little more about what you're looking for?";

pub const VERIFIED: &str = "Great news! I've verified your details in our system. I can see \
    you're an existing customer with us. Let me now check your eligibility and pre-approved loan \
    offers...";

pub const NEW_CUSTOMER: &str = "I don't see you as an existing customer, but that's perfectly \
    fine! As a new customer, you're eligible for our special introductory rates. Let me check \
    your eligibility and loan options...";

pub const INSTANT_APPROVAL: &str = "Congratulations! Your loan has been instantly approved! \
    Based on your excellent credit profile and our relationship, we're pleased to offer you the \
    requested amount at our best rates. Let me generate your sanction letter now...";

pub const REQUEST_SALARY_SLIP: &str = "Your application looks promising! To approve the \
    requested amount, I need to verify your income. Please upload your latest salary slip or \
    income proof, and I'll process your application immediately.";

pub const UPLOAD_REPROMPT: &str = "Please upload your latest salary slip so we can finalize your \
    loan application. This helps us verify your income and complete the approval process.";

pub const UPLOAD_NOT_EXPECTED: &str = "Thanks! I don't need any documents from you at this point \
    — let's continue with your application.";

pub const COURTESY: &str = "Thank you for your interest in our personal loan services. Have a \
    great day!";

pub const LETTER_DELAYED: &str = "Your loan is approved! I'm finalizing your sanction letter — \
    one moment please.";

pub fn sanction_message(customer_name: &str) -> String {
    format!(
        "🎉 Congratulations {customer_name}! Your personal loan has been approved! I've generated \
         your official sanction letter with all the loan details. You can download it using the \
         link below. Our team will contact you within 24 hours to complete the formalities. \
         Welcome to the Tata Capital family!"
    )
}

pub fn rejection_message(reason: RejectionReason) -> &'static str {
    match reason {
        RejectionReason::CreditScore => {
            "I appreciate your interest in our personal loan. Unfortunately, based on current \
             credit bureau information, we're unable to approve your application at this time. \
             We'd be happy to reconsider in the future as your credit profile improves."
        }
        RejectionReason::AmountTooHigh => {
            "Thank you for considering us for your loan needs. The requested amount exceeds our \
             current lending criteria for your profile. We'd be happy to discuss a smaller loan \
             amount that fits your eligibility."
        }
        RejectionReason::HighEmiRatio => {
            "Thank you for providing your income documentation. While we appreciate your \
             application, the EMI for the requested amount would exceed our comfortable lending \
             ratio. We'd be glad to discuss a smaller loan amount."
        }
    }
}

/// The scripted question for the first missing required field.
pub fn next_question(field: FieldName) -> &'static str {
    match field {
        FieldName::Name => "Great! Could you please tell me your full name?",
        FieldName::Phone => "Perfect! What's the best phone number to reach you at?",
        FieldName::Email => "And your email address for our records?",
        FieldName::City => "Which city are you currently residing in?",
        FieldName::MonthlyIncome => {
            "To find the best loan options for you, what's your approximate monthly income?"
        }
        FieldName::LoanAmount => {
            "How much would you like to borrow? We offer loans from ₹50,000 to ₹40 lakhs."
        }
        FieldName::LoanPurpose => {
            "What will you be using this loan for? This helps us tailor the best terms for you."
        }
        _ => "Could you provide more details about your requirements?",
    }
}
