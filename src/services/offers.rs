//! Pre-approved offer catalog.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::session::{CustomerData, FieldName, Offer};

/// Offers are capped at 40 lakhs regardless of income.
const MAX_PRE_APPROVED_LIMIT: i64 = 4_000_000;

/// Income assumed for new customers whose declared income is missing or
/// unparseable.
const DEFAULT_MONTHLY_INCOME: i64 = 50_000;

/// Read-only pre-approved offer lookup.
#[async_trait]
pub trait OfferCatalog: Send + Sync {
    /// Offer for a customer: per-phone table hit, or the income-tier
    /// fallback for new customers.
    async fn offer_for(&self, customer: &CustomerData) -> Offer;
}

/// Deterministic catalog: seeded per-phone offers plus the tiered fallback.
pub struct FixedOfferCatalog {
    offers: HashMap<String, Offer>,
}

impl FixedOfferCatalog {
    pub fn new(offers: HashMap<String, Offer>) -> Self {
        Self { offers }
    }

    /// Catalog seeded with offers for the synthetic customers.
    pub fn demo() -> Self {
        let entry = |limit: i64, rate: Decimal, tenure: u32| Offer {
            pre_approved_limit: limit,
            interest_rate: rate,
            tenure_max_months: tenure,
        };
        let offers = HashMap::from([
            ("9876543210".to_string(), entry(500000, dec!(10.5), 60)),
            ("9876543211".to_string(), entry(300000, dec!(12.0), 48)),
            ("9876543212".to_string(), entry(600000, dec!(11.0), 60)),
            ("9876543213".to_string(), entry(250000, dec!(13.5), 36)),
            ("9876543214".to_string(), entry(400000, dec!(11.5), 48)),
            ("9876543215".to_string(), entry(700000, dec!(10.0), 72)),
            ("9876543216".to_string(), entry(200000, dec!(14.0), 36)),
            ("9876543217".to_string(), entry(350000, dec!(12.5), 48)),
            ("9876543218".to_string(), entry(550000, dec!(10.8), 60)),
            ("9876543219".to_string(), entry(280000, dec!(13.0), 42)),
            ("9876543220".to_string(), entry(450000, dec!(11.2), 54)),
            ("9876543221".to_string(), entry(380000, dec!(11.8), 48)),
        ]);
        Self::new(offers)
    }

    /// Income-tier fallback for customers outside the table.
    fn fallback_offer(monthly_income: i64) -> Offer {
        let income = if monthly_income > 0 {
            monthly_income
        } else {
            DEFAULT_MONTHLY_INCOME
        };

        let (multiplier, interest_rate, tenure_max_months) = if income > 100_000 {
            (dec!(8.0), dec!(10.5), 72)
        } else if income > 75_000 {
            (dec!(7.5), dec!(11.5), 60)
        } else if income > 50_000 {
            (dec!(7.0), dec!(12.5), 48)
        } else {
            (dec!(6.5), dec!(14.0), 36)
        };

        let raw_limit = Decimal::from(income) * multiplier;
        let pre_approved_limit = raw_limit.trunc().to_i64().unwrap_or(MAX_PRE_APPROVED_LIMIT);

        Offer {
            pre_approved_limit: i64::min(pre_approved_limit, MAX_PRE_APPROVED_LIMIT),
            interest_rate,
            tenure_max_months,
        }
    }
}

#[async_trait]
impl OfferCatalog for FixedOfferCatalog {
    async fn offer_for(&self, customer: &CustomerData) -> Offer {
        let phone = customer
            .get(FieldName::Phone)
            .and_then(|v| v.as_str())
            .unwrap_or("");
        if let Some(offer) = self.offers.get(phone) {
            return offer.clone();
        }

        let income = customer
            .get(FieldName::MonthlyIncome)
            .map(|v| v.coerce_i64())
            .unwrap_or(0);
        Self::fallback_offer(income)
    }
}
