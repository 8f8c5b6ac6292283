//! Credit-score lookup — pluggable bureau interface.
//!
//! The decision engine never sees randomness: the deterministic bureau is
//! the default, and the randomized one is a demo double for new-customer
//! walkthroughs.

use std::collections::HashMap;

use async_trait::async_trait;

use super::directory::demo_customers;

/// Bureau scores are on the 300–900 scale.
#[async_trait]
pub trait CreditScoreService: Send + Sync {
    async fn credit_score(&self, phone: &str) -> u32;
}

/// Deterministic bureau: per-phone table with a fixed fallback for
/// unknown customers.
pub struct FixedCreditBureau {
    scores: HashMap<String, u32>,
    fallback: u32,
}

impl FixedCreditBureau {
    pub fn new(scores: HashMap<String, u32>, fallback: u32) -> Self {
        Self { scores, fallback }
    }

    /// Bureau seeded with the synthetic customers. Unknown phones score a
    /// flat 760 — the "good" band the original weighted new customers toward.
    pub fn demo() -> Self {
        let scores = demo_customers()
            .into_iter()
            .map(|c| (c.phone, c.credit_score))
            .collect();
        Self::new(scores, 760)
    }
}

#[async_trait]
impl CreditScoreService for FixedCreditBureau {
    async fn credit_score(&self, phone: &str) -> u32 {
        self.scores.get(phone).copied().unwrap_or(self.fallback)
    }
}

/// Demo bureau: known phones score from the table, unknown phones draw a
/// weighted random score (20% poor, 30% fair, 30% good, 20% excellent).
pub struct RandomizedCreditBureau {
    table: FixedCreditBureau,
}

impl RandomizedCreditBureau {
    pub fn demo() -> Self {
        Self {
            table: FixedCreditBureau::demo(),
        }
    }
}

#[async_trait]
impl CreditScoreService for RandomizedCreditBureau {
    async fn credit_score(&self, phone: &str) -> u32 {
        if let Some(score) = self.table.scores.get(phone) {
            return *score;
        }
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let roll: f64 = rng.r#gen();
        let (lo, hi): (u32, u32) = if roll <= 0.2 {
            (650, 700)
        } else if roll <= 0.5 {
            (700, 750)
        } else if roll <= 0.8 {
            (750, 800)
        } else {
            (800, 850)
        };
        rng.gen_range(lo..=hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_bureau_is_deterministic() {
        let bureau = FixedCreditBureau::demo();
        assert_eq!(bureau.credit_score("9876543210").await, 785);
        assert_eq!(bureau.credit_score("9876543216").await, 650);
        // Unknown phone: fixed fallback, same on every call.
        assert_eq!(bureau.credit_score("5550001111").await, 760);
        assert_eq!(bureau.credit_score("5550001111").await, 760);
    }

    #[tokio::test]
    async fn randomized_bureau_keeps_known_phones_stable() {
        let bureau = RandomizedCreditBureau::demo();
        assert_eq!(bureau.credit_score("9876543215").await, 800);
        let unknown = bureau.credit_score("5550001111").await;
        assert!((650..=850).contains(&unknown));
    }
}
