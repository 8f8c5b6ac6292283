//! Sanction letter generation and artifact storage.
//!
//! The letter body is produced by a [`LetterRenderer`] — the seam where a
//! real PDF engine plugs in. The artifact store owns the output directory
//! and the download-safety rules: sanitized names, fixed `.pdf` extension,
//! no path traversal.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::ArtifactError;
use crate::session::{FieldName, Session};

/// Valid artifact filenames: single path segment, `.pdf` only.
static FILENAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+\.pdf$").expect("valid filename regex"));

/// Everything a letter needs from a finalized application.
#[derive(Debug, Clone)]
pub struct SanctionRecord {
    pub customer_name: String,
    pub sanctioned_amount: i64,
    pub interest_rate: Decimal,
    pub tenure_months: u32,
    pub monthly_emi: Option<Decimal>,
    pub loan_purpose: String,
    pub reference: String,
    pub issued_on: DateTime<Utc>,
}

impl SanctionRecord {
    /// Assemble the letter record from an approved session.
    pub fn from_session(session: &Session) -> Self {
        let customer_name = session
            .customer_data
            .get(FieldName::Name)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "Valued Customer".to_string());
        let sanctioned_amount = session
            .customer_data
            .get(FieldName::LoanAmount)
            .map(|v| v.coerce_i64())
            .unwrap_or(0);
        let interest_rate = session
            .offer_details
            .as_ref()
            .map(|offer| offer.interest_rate)
            .unwrap_or(dec!(12.0));
        let loan_purpose = session
            .customer_data
            .get(FieldName::LoanPurpose)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "personal".to_string());
        let (monthly_emi, tenure_months) = match session.emi_details.as_ref() {
            Some(emi) => (Some(emi.monthly_emi), emi.tenure_months),
            None => (None, 36),
        };

        use rand::Rng;
        let reference = format!(
            "TC/PL/{}/{}",
            Utc::now().format("%Y"),
            rand::thread_rng().gen_range(100_000..=999_999)
        );

        Self {
            customer_name,
            sanctioned_amount,
            interest_rate,
            tenure_months,
            monthly_emi,
            loan_purpose,
            reference,
            issued_on: Utc::now(),
        }
    }
}

/// Renders a sanction record into artifact bytes.
pub trait LetterRenderer: Send + Sync {
    fn render(&self, record: &SanctionRecord) -> Vec<u8>;
}

/// Plain-text renderer. Layout is out of scope; a PDF engine implements the
/// same trait.
pub struct TextLetterRenderer;

impl LetterRenderer for TextLetterRenderer {
    fn render(&self, record: &SanctionRecord) -> Vec<u8> {
        let emi_line = match record.monthly_emi {
            Some(emi) => format!("Rs. {emi}"),
            None => "As per agreed terms".to_string(),
        };
        let purpose = title_case(&record.loan_purpose);

        let body = format!(
            "TATA CAPITAL LIMITED\n\
             Personal Loan Sanction Letter\n\n\
             Reference No: {reference}\n\
             Date: {date}\n\n\
             Dear {name},\n\n\
             We are pleased to inform you that your application for a Personal Loan\n\
             has been approved. The sanction is subject to the terms and conditions\n\
             mentioned below and execution of necessary documents.\n\n\
             Sanctioned Amount        : Rs. {amount}\n\
             Interest Rate (Per Annum): {rate}%\n\
             Loan Tenure              : {tenure} months\n\
             Monthly EMI              : {emi}\n\
             Processing Fee           : Rs. 2,500 + GST\n\
             Loan Purpose             : {purpose}\n\n\
             Terms and Conditions:\n\
             1. This sanction letter is valid for 30 days from the date of issue.\n\
             2. Loan disbursal is subject to verification of documents and completion of legal formalities.\n\
             3. EMI payment will commence from the month following the disbursal.\n\
             4. Prepayment of loan is allowed with applicable charges as per loan agreement.\n\
             5. Loan is subject to terms and conditions of the loan agreement.\n\n\
             We look forward to serving you and thank you for choosing Tata Capital\n\
             for your financial needs.\n\n\
             Warm Regards,\n\
             Credit Team\n\
             Tata Capital Limited\n",
            reference = record.reference,
            date = record.issued_on.format("%B %d, %Y"),
            name = record.customer_name,
            amount = record.sanctioned_amount,
            rate = record.interest_rate,
            tenure = record.tenure_months,
            emi = emi_line,
        );
        body.into_bytes()
    }
}

fn title_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Owns the sanction-letter output directory.
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn ensure_dir(&self) -> Result<(), ArtifactError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Write letter bytes under a generated filename; returns the filename.
    pub async fn store(
        &self,
        customer_name: &str,
        bytes: &[u8],
    ) -> Result<String, ArtifactError> {
        self.ensure_dir().await?;
        let name_part = sanitize_name(customer_name);
        let filename = format!(
            "sanction_letter_{}_{}.pdf",
            name_part,
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        tokio::fs::write(self.dir.join(&filename), bytes).await?;
        tracing::info!(filename = %filename, "sanction letter generated");
        Ok(filename)
    }

    /// Validate a filename and resolve it inside the letters directory.
    ///
    /// Rejects anything that is not a plain `*.pdf` segment, so traversal
    /// attempts never reach the filesystem.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf, ArtifactError> {
        if !FILENAME_RE.is_match(filename) || filename.contains("..") {
            return Err(ArtifactError::InvalidFilename(filename.to_string()));
        }
        Ok(self.dir.join(filename))
    }

    /// Read a previously generated letter; `NotFound` when absent.
    pub async fn read(&self, filename: &str) -> Result<Vec<u8>, ArtifactError> {
        let path = self.resolve(filename)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ArtifactError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Keep alphanumerics, map whitespace to underscores, drop the rest.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "customer".to_string()
    } else {
        cleaned
    }
}
