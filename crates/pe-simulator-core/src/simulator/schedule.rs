//! Raw (pre-recycling) capital-call and distribution schedules.
//!
//! Each [`Strategy`] maps to one [`ScheduleStrategy`] implementor. All vectors
//! are indexed by year, `0..=fund_lifetime_years`; year 0 is inception.
//! Capital calls are negative, distributions positive.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::params::{ManualCalendar, SimulationInput, Strategy};
use crate::types::{Money, Rate};

/// Interest credited on prepaid capital the fund has not yet drawn (small tickets).
pub const UNCALLED_CAPITAL_RATE: Rate = dec!(0.02);

/// Raw per-year flows consumed by the recycling engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSchedule {
    /// Capital drawn each year (≤ 0).
    pub capital_calls: Vec<Money>,
    /// Gross cash returned each year, including `uncalled_interest`.
    pub gross_distributions: Vec<Money>,
    /// Small-ticket interest credit on undrawn capital.
    pub uncalled_interest: Vec<Money>,
}

/// Calls and distributions produced by a strategy formula.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyFlows {
    pub capital_calls: Vec<Money>,
    pub distributions: Vec<Money>,
}

impl StrategyFlows {
    fn empty(fund_lifetime_years: u32) -> Self {
        let len = fund_lifetime_years as usize + 1;
        StrategyFlows {
            capital_calls: vec![Decimal::ZERO; len],
            distributions: vec![Decimal::ZERO; len],
        }
    }

    /// Spread `amount` evenly as calls over `years` consecutive years from `first_year`.
    fn call_evenly(&mut self, amount: Money, first_year: u32, years: u32) {
        if years == 0 {
            return;
        }
        let per_year = amount / Decimal::from(years);
        for year in first_year..first_year + years {
            add_at(&mut self.capital_calls, year, -per_year);
        }
    }

    fn distribute(&mut self, year: u32, amount: Money) {
        add_at(&mut self.distributions, year, amount);
    }

    /// Spread `amount` with increasing weights over `first_year..=last_year`.
    fn distribute_increasing(&mut self, amount: Money, first_year: u32, last_year: u32) {
        if last_year < first_year {
            return;
        }
        let shares = increasing_weights(amount, last_year - first_year + 1);
        for (offset, share) in shares.into_iter().enumerate() {
            add_at(&mut self.distributions, first_year + offset as u32, share);
        }
    }
}

fn add_at(series: &mut [Money], year: u32, amount: Money) {
    if let Some(slot) = series.get_mut(year as usize) {
        *slot += amount;
    }
}

/// Increasing-weight allocation of `total` over a block of `n` years.
///
/// Year k (1-based) receives `total/n × 2k/(n+1)`. The weights sum to `n`, so
/// the shares sum to `total` and strictly increase with k.
pub fn increasing_weights(total: Money, n: u32) -> Vec<Money> {
    if n == 0 {
        return Vec::new();
    }
    let denominator = Decimal::from(n) * Decimal::from(n + 1);
    (1..=n)
        .map(|k| total * Decimal::from(2 * k) / denominator)
        .collect()
}

// ---------------------------------------------------------------------------
// Strategy formulas
// ---------------------------------------------------------------------------

/// Common contract of the per-strategy schedule formulas.
pub trait ScheduleStrategy {
    fn generate(&self, input: &SimulationInput) -> StrategyFlows;
}

/// Even calls over the call period; 3% seed in year 3; principal over years
/// 4-7; profit over the final three years.
pub struct BuyoutSchedule;

impl ScheduleStrategy for BuyoutSchedule {
    fn generate(&self, input: &SimulationInput) -> StrategyFlows {
        let s = input.subscription;
        let n = input.fund_lifetime_years;
        let mut flows = StrategyFlows::empty(n);
        flows.call_evenly(s, 1, input.call_period_years);

        let seed = s * dec!(0.03);
        flows.distribute(3, seed);
        flows.distribute_increasing(s - seed, 4, 7);

        let profit = s * input.target_multiple - s;
        flows.distribute_increasing(profit, n.saturating_sub(2), n);
        flows
    }
}

/// Calls over years 1-5; 8% seed in year 5; remainder over years 6-10.
pub struct VentureCapitalSchedule;

impl ScheduleStrategy for VentureCapitalSchedule {
    fn generate(&self, input: &SimulationInput) -> StrategyFlows {
        let s = input.subscription;
        let mut flows = StrategyFlows::empty(input.fund_lifetime_years);
        flows.call_evenly(s, 1, 5);

        let seed = s * dec!(0.08);
        flows.distribute(5, seed);
        flows.distribute_increasing(s * input.target_multiple - seed, 6, 10);
        flows
    }
}

/// Calls over years 1-5; seeds of 5% (year 4) and 15% (year 5); remainder over years 6-10.
pub struct GrowthCapitalSchedule;

impl ScheduleStrategy for GrowthCapitalSchedule {
    fn generate(&self, input: &SimulationInput) -> StrategyFlows {
        let s = input.subscription;
        let mut flows = StrategyFlows::empty(input.fund_lifetime_years);
        flows.call_evenly(s, 1, 5);

        let early = s * dec!(0.05);
        let seed = s * dec!(0.15);
        flows.distribute(4, early);
        flows.distribute(5, seed);
        flows.distribute_increasing(s * input.target_multiple - early - seed, 6, 10);
        flows
    }
}

/// Calls over years 1-2; everything distributed over years 2-6.
pub struct SecondarySchedule;

impl ScheduleStrategy for SecondarySchedule {
    fn generate(&self, input: &SimulationInput) -> StrategyFlows {
        let s = input.subscription;
        let mut flows = StrategyFlows::empty(input.fund_lifetime_years);
        flows.call_evenly(s, 1, 2);
        flows.distribute_increasing(s * input.target_multiple, 2, 6);
        flows
    }
}

/// Tranche drawdowns, coupon on outstanding principal, equal amortization.
pub struct DebtFundSchedule;

impl ScheduleStrategy for DebtFundSchedule {
    fn generate(&self, input: &SimulationInput) -> StrategyFlows {
        let s = input.subscription;
        let n = input.fund_lifetime_years;
        let mut flows = StrategyFlows::empty(n);

        for (i, fraction) in input.debt_schedule.call_fractions().iter().enumerate() {
            add_at(&mut flows.capital_calls, i as u32 + 1, -(s * *fraction));
        }

        let (first_repayment, last_repayment) = input.debt_schedule.repayment_years();
        let installments = Decimal::from(last_repayment - first_repayment + 1);
        let installment = s / installments;

        let mut called = Decimal::ZERO;
        let mut repaid = Decimal::ZERO;
        for year in 1..=n {
            called -= flows.capital_calls[year as usize];
            // Principal is repaid at year end, so this year's coupon still accrues on it.
            let outstanding = (called - repaid).max(Decimal::ZERO);
            let coupon = input.target_yield * outstanding;
            let principal = if (first_repayment..=last_repayment).contains(&year) {
                installment.min(outstanding)
            } else {
                Decimal::ZERO
            };
            repaid += principal;
            flows.distribute(year, coupon + principal);
        }
        flows
    }
}

fn generator(strategy: Strategy) -> &'static dyn ScheduleStrategy {
    match strategy {
        Strategy::Buyout => &BuyoutSchedule,
        Strategy::VentureCapital => &VentureCapitalSchedule,
        Strategy::GrowthCapital => &GrowthCapitalSchedule,
        Strategy::Secondary => &SecondarySchedule,
        Strategy::Debt => &DebtFundSchedule,
    }
}

/// Formula flows of the selected strategy, before any override.
pub fn strategy_flows(input: &SimulationInput) -> StrategyFlows {
    generator(input.strategy).generate(input)
}

// ---------------------------------------------------------------------------
// Raw schedule
// ---------------------------------------------------------------------------

/// Build the raw schedule: manual calendar if present, otherwise the strategy
/// formula with the small-ticket single drawdown applied.
pub fn raw_schedule(input: &SimulationInput) -> RawSchedule {
    if let Some(calendar) = &input.manual_calendar {
        return manual_schedule(calendar, input.subscription);
    }

    let flows = strategy_flows(input);
    let len = flows.capital_calls.len();
    let mut uncalled_interest = vec![Decimal::ZERO; len];

    if !input.is_small_ticket() {
        return RawSchedule {
            capital_calls: flows.capital_calls,
            gross_distributions: flows.distributions,
            uncalled_interest,
        };
    }

    trace!(
        subscription = %input.subscription,
        "small ticket: collapsing calls into a single year-1 drawdown"
    );

    let s = input.subscription;
    let mut capital_calls = vec![Decimal::ZERO; len];
    if len > 1 {
        capital_calls[1] = -s;
    }

    let mut gross_distributions = flows.distributions;
    let mut nominally_called = Decimal::ZERO;
    for year in 1..len {
        nominally_called -= flows.capital_calls[year];
        let undrawn = (s - nominally_called).max(Decimal::ZERO);
        let interest = undrawn * UNCALLED_CAPITAL_RATE;
        uncalled_interest[year] = interest;
        gross_distributions[year] += interest;
    }

    RawSchedule {
        capital_calls,
        gross_distributions,
        uncalled_interest,
    }
}

fn manual_schedule(calendar: &ManualCalendar, subscription: Money) -> RawSchedule {
    let len = calendar.capital_call_pcts.len() + 1;
    let mut capital_calls = vec![Decimal::ZERO; len];
    let mut gross_distributions = vec![Decimal::ZERO; len];

    for (i, pct) in calendar.capital_call_pcts.iter().enumerate() {
        if !pct.is_zero() {
            capital_calls[i + 1] = -(subscription * *pct);
        }
    }
    for (i, pct) in calendar.distribution_pcts.iter().enumerate().take(len - 1) {
        gross_distributions[i + 1] = subscription * *pct;
    }

    RawSchedule {
        capital_calls,
        gross_distributions,
        uncalled_interest: vec![Decimal::ZERO; len],
    }
}
