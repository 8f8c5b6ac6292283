//! Income-proof evaluation seam.
//!
//! Real document OCR / income verification plugs in behind
//! [`IncomeProofEvaluator`]. The default wired implementation is the
//! deterministic declared-income pass-through; the variance double exists
//! only for demo walkthroughs and is explicitly a mock, not business logic.

use async_trait::async_trait;

/// Derives an effective monthly income from an uploaded proof document.
#[async_trait]
pub trait IncomeProofEvaluator: Send + Sync {
    /// `declared_income` is what the applicant told us; `file_bytes` /
    /// `file_type` are the uploaded document, passed through opaque.
    async fn effective_income(
        &self,
        declared_income: i64,
        file_bytes: &[u8],
        file_type: &str,
    ) -> i64;
}

/// Deterministic evaluator: trusts the declared income as-is.
pub struct DeclaredIncomeEvaluator;

#[async_trait]
impl IncomeProofEvaluator for DeclaredIncomeEvaluator {
    async fn effective_income(
        &self,
        declared_income: i64,
        _file_bytes: &[u8],
        _file_type: &str,
    ) -> i64 {
        declared_income
    }
}

/// Demo evaluator: declared income with a bounded ±10% variance, simulating
/// the spread between a declared figure and what a parsed salary slip shows.
pub struct VarianceDemoEvaluator;

#[async_trait]
impl IncomeProofEvaluator for VarianceDemoEvaluator {
    async fn effective_income(
        &self,
        declared_income: i64,
        _file_bytes: &[u8],
        _file_type: &str,
    ) -> i64 {
        use rand::Rng;
        let variance: f64 = rand::thread_rng().gen_range(0.9..=1.1);
        (declared_income as f64 * variance) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn declared_evaluator_is_identity() {
        let evaluator = DeclaredIncomeEvaluator;
        assert_eq!(evaluator.effective_income(45_000, b"pdf bytes", "pdf").await, 45_000);
        assert_eq!(evaluator.effective_income(0, b"", "png").await, 0);
    }

    #[tokio::test]
    async fn variance_evaluator_stays_within_bounds() {
        let evaluator = VarianceDemoEvaluator;
        for _ in 0..50 {
            let income = evaluator.effective_income(100_000, b"slip", "pdf").await;
            assert!((90_000..=110_000).contains(&income), "income {income} out of bounds");
        }
    }
}
