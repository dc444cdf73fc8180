//! Tiered platform fee model.
//!
//! | subscription          | annual | extra in year 1 |
//! |-----------------------|--------|-----------------|
//! | < 30,000              | 1.7%   | 3.0%            |
//! | 30,000 ≤ x < 100,000  | 1.5%   | 2.5%            |
//! | ≥ 100,000             | 1.2%   | 2.0%            |
//!
//! Fees are deducted from final value, never from capital deployed.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::params::MAX_FUND_LIFETIME_YEARS;
use crate::error::SimulatorError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::SimulatorResult;

/// Rates of the fee tier a subscription falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTier {
    /// Inclusive lower bound of the tier.
    pub lower_bound: Money,
    pub annual_rate: Rate,
    pub first_year_extra_rate: Rate,
}

const TIERS: [FeeTier; 3] = [
    FeeTier {
        lower_bound: dec!(100000),
        annual_rate: dec!(0.012),
        first_year_extra_rate: dec!(0.020),
    },
    FeeTier {
        lower_bound: dec!(30000),
        annual_rate: dec!(0.015),
        first_year_extra_rate: dec!(0.025),
    },
    FeeTier {
        lower_bound: Decimal::ZERO,
        annual_rate: dec!(0.017),
        first_year_extra_rate: dec!(0.030),
    },
];

/// Tier lookup; a subscription equal to a bound belongs to the upper tier.
pub fn fee_tier(subscription: Money) -> FeeTier {
    TIERS
        .iter()
        .find(|tier| subscription >= tier.lower_bound)
        .copied()
        .unwrap_or(TIERS[TIERS.len() - 1])
}

/// Platform fee charged in `year` (1-based). Year 0 is inception and carries no fee.
pub fn annual_fee(subscription: Money, year: u32) -> Money {
    if year == 0 {
        return Decimal::ZERO;
    }
    let tier = fee_tier(subscription);
    let mut fee = subscription * tier.annual_rate;
    if year == 1 {
        fee += subscription * tier.first_year_extra_rate;
    }
    fee
}

/// Sum of [`annual_fee`] over years 1..=lifetime.
pub fn total_fees(subscription: Money, fund_lifetime_years: u32) -> Money {
    (1..=fund_lifetime_years)
        .map(|year| annual_fee(subscription, year))
        .sum()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeScheduleInput {
    pub subscription: Money,
    #[serde(default = "default_fee_horizon")]
    pub fund_lifetime_years: u32,
}

fn default_fee_horizon() -> u32 {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearFee {
    pub year: u32,
    pub fee: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub tier: FeeTier,
    pub yearly: Vec<YearFee>,
    pub total: Money,
}

/// Year-by-year platform fees of a subscription, years 1..=lifetime.
pub fn fee_schedule(input: &FeeScheduleInput) -> SimulatorResult<ComputationOutput<FeeSchedule>> {
    let start = Instant::now();

    if input.subscription <= Decimal::ZERO {
        return Err(SimulatorError::InvalidInput {
            field: "subscription".into(),
            reason: "Subscription must be positive.".into(),
        });
    }
    if input.fund_lifetime_years == 0 || input.fund_lifetime_years > MAX_FUND_LIFETIME_YEARS {
        return Err(SimulatorError::InvalidInput {
            field: "fund_lifetime_years".into(),
            reason: format!("Fund lifetime must be between 1 and {MAX_FUND_LIFETIME_YEARS} years."),
        });
    }

    let yearly: Vec<YearFee> = (1..=input.fund_lifetime_years)
        .map(|year| YearFee {
            year,
            fee: annual_fee(input.subscription, year),
        })
        .collect();
    let total = yearly.iter().map(|y| y.fee).sum();

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Tiered platform fee: annual rate plus first-year extra",
        &serde_json::json!({
            "subscription": input.subscription.to_string(),
            "fund_lifetime_years": input.fund_lifetime_years,
        }),
        Vec::new(),
        elapsed,
        FeeSchedule {
            tier: fee_tier(input.subscription),
            yearly,
            total,
        },
    ))
}
