//! Recycling & cash engine.
//!
//! Walks the raw schedule in year order. Each year's recycling depends on the
//! cumulative calls and recycled amounts of every prior year, so the walk is
//! strictly sequential.
//!
//! The formula strategies call the full subscription, which leaves no headroom.
//! Their same-year recycling is therefore capped to zero, as in SECONDARY's
//! year 2 where the last call meets the first distribution. Only a manual
//! calendar calling less than 100 % recycles.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::fees::annual_fee;
use super::params::{SimulationInput, Strategy};
use super::schedule::RawSchedule;
use crate::time_value::compound_factor;
use crate::types::Money;

/// One projected year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearRecord {
    pub year: u32,
    /// Capital drawn this year (≤ 0).
    pub capital_call: Money,
    /// Cash returned by the fund before recycling, including `uncalled_interest`.
    pub gross_distribution: Money,
    /// Small-ticket interest credit on undrawn capital.
    pub uncalled_interest: Money,
    /// Portion of the gross distribution kept by the fund to cover this year's call.
    pub recycled_distribution: Money,
    /// Cash the investor actually disburses (≤ 0).
    pub actual_cash_out: Money,
    /// Gross distribution less recycled amount.
    pub net_distribution: Money,
    /// gross - recycled + call. The IRR series.
    pub net_cash_flow: Money,
    /// Running sum of `net_cash_flow` (the J-curve).
    pub cumulative_net_cash_flow: Money,
    /// Net distribution compounded at the reinvest rate to the terminal year.
    pub future_value: Money,
    /// Subscription less prior calls and prior recycled amounts, floored at zero.
    pub outstanding_commitment_before_year: Money,
    pub platform_fee: Money,
}

/// Amount of this year's gross distribution the fund retains.
///
/// Recycling happens only when a call and a distribution fall in the same
/// year, never for debt. It is capped by the distribution, the call, the
/// outstanding commitment and the headroom: commitment left over once every
/// scheduled call and every earlier recycled amount is counted. The headroom
/// cap keeps calls plus recycled amounts within the subscription.
pub fn recycled_amount(
    strategy: Strategy,
    capital_call: Money,
    gross_distribution: Money,
    outstanding_before: Money,
    headroom: Money,
) -> Money {
    if strategy == Strategy::Debt
        || capital_call >= Decimal::ZERO
        || gross_distribution <= Decimal::ZERO
    {
        return Decimal::ZERO;
    }
    gross_distribution
        .min(capital_call.abs())
        .min(outstanding_before)
        .min(headroom)
        .max(Decimal::ZERO)
}

/// Produce one [`YearRecord`] per year of the raw schedule, in ascending order.
///
/// Assumes a validated input.
pub fn build_year_records(input: &SimulationInput, raw: &RawSchedule) -> Vec<YearRecord> {
    let terminal_year = input.terminal_year();
    let scheduled_calls: Money = raw.capital_calls.iter().map(|c| c.abs()).sum();
    let mut records = Vec::with_capacity(raw.capital_calls.len());

    let mut called_so_far = Decimal::ZERO;
    let mut recycled_so_far = Decimal::ZERO;
    let mut cumulative_net_cash_flow = Decimal::ZERO;

    for (i, (&capital_call, &gross_distribution)) in raw
        .capital_calls
        .iter()
        .zip(raw.gross_distributions.iter())
        .enumerate()
    {
        let year = i as u32;
        let outstanding =
            (input.subscription - called_so_far - recycled_so_far).max(Decimal::ZERO);

        let headroom = input.subscription - scheduled_calls - recycled_so_far;
        let recycled = recycled_amount(
            input.strategy,
            capital_call,
            gross_distribution,
            outstanding,
            headroom,
        );

        let actual_cash_out = if capital_call < Decimal::ZERO {
            capital_call + recycled
        } else {
            Decimal::ZERO
        };
        let net_cash_flow = gross_distribution - recycled + capital_call;
        let net_distribution = gross_distribution - recycled;
        cumulative_net_cash_flow += net_cash_flow;

        let future_value = if net_distribution > Decimal::ZERO {
            let years_left = terminal_year.saturating_sub(year);
            net_distribution * compound_factor(input.reinvest_rate, years_left)
        } else {
            Decimal::ZERO
        };

        records.push(YearRecord {
            year,
            capital_call,
            gross_distribution,
            uncalled_interest: raw.uncalled_interest.get(i).copied().unwrap_or_default(),
            recycled_distribution: recycled,
            actual_cash_out,
            net_distribution,
            net_cash_flow,
            cumulative_net_cash_flow,
            future_value,
            outstanding_commitment_before_year: outstanding,
            platform_fee: annual_fee(input.subscription, year),
        });

        called_so_far += capital_call.abs();
        recycled_so_far += recycled;
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::params::ManualCalendar;
    use crate::simulator::schedule::raw_schedule;
    use rust_decimal_macros::dec;
    use rust_decimal::MathematicalOps;

    fn manual_input(calls: Vec<Decimal>, dists: Vec<Decimal>) -> SimulationInput {
        SimulationInput {
            subscription: dec!(100000),
            fund_lifetime_years: calls.len() as u32,
            reinvest_rate: Decimal::ZERO,
            manual_calendar: Some(ManualCalendar {
                capital_call_pcts: calls,
                distribution_pcts: dists,
            }),
            ..Default::default()
        }
    }

    fn records_for(input: &SimulationInput) -> Vec<YearRecord> {
        build_year_records(input, &raw_schedule(input))
    }

    #[test]
    fn test_no_recycling_without_same_year_call() {
        assert_eq!(
            recycled_amount(
                Strategy::Buyout,
                Decimal::ZERO,
                dec!(5000),
                dec!(50000),
                dec!(50000)
            ),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_debt_never_recycles() {
        assert_eq!(
            recycled_amount(
                Strategy::Debt,
                dec!(-30000),
                dec!(5000),
                dec!(60000),
                dec!(60000)
            ),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_recycling_caps() {
        // headroom binds
        assert_eq!(
            recycled_amount(
                Strategy::Buyout,
                dec!(-20000),
                dec!(25000),
                dec!(40000),
                dec!(10000)
            ),
            dec!(10000)
        );
        // outstanding commitment binds
        assert_eq!(
            recycled_amount(
                Strategy::Buyout,
                dec!(-20000),
                dec!(25000),
                dec!(15000),
                dec!(30000)
            ),
            dec!(15000)
        );
        // call binds
        assert_eq!(
            recycled_amount(
                Strategy::Buyout,
                dec!(-20000),
                dec!(25000),
                dec!(80000),
                dec!(50000)
            ),
            dec!(20000)
        );
        // distribution binds
        assert_eq!(
            recycled_amount(
                Strategy::Buyout,
                dec!(-20000),
                dec!(3000),
                dec!(80000),
                dec!(50000)
            ),
            dec!(3000)
        );
    }

    #[test]
    fn test_no_recycling_when_calls_use_full_commitment() {
        assert_eq!(
            recycled_amount(
                Strategy::Buyout,
                dec!(-20000),
                dec!(3000),
                dec!(60000),
                Decimal::ZERO
            ),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_manual_calendar_recycling() {
        // 80% called overall leaves room to recycle
        let input = manual_input(
            vec![dec!(0.3), dec!(0.3), dec!(0.2), Decimal::ZERO, Decimal::ZERO],
            vec![Decimal::ZERO, Decimal::ZERO, dec!(0.25), dec!(0.5), dec!(1.0)],
        );
        let records = records_for(&input);
        assert_eq!(records.len(), 6);

        let y3 = &records[3];
        assert_eq!(y3.outstanding_commitment_before_year, dec!(40000));
        assert_eq!(y3.recycled_distribution, dec!(20000));
        assert_eq!(y3.actual_cash_out, Decimal::ZERO);
        assert_eq!(y3.net_distribution, dec!(5000));
        // gross - recycled + call
        assert_eq!(y3.net_cash_flow, dec!(-15000));

        let y4 = &records[4];
        assert_eq!(y4.outstanding_commitment_before_year, Decimal::ZERO);
        assert_eq!(y4.recycled_distribution, Decimal::ZERO);
        assert_eq!(y4.actual_cash_out, Decimal::ZERO);
    }

    #[test]
    fn test_recycling_invariants_hold_every_year() {
        let inputs = vec![
            SimulationInput::default(),
            SimulationInput {
                strategy: Strategy::Secondary,
                ..Default::default()
            },
            manual_input(
                vec![dec!(0.5), dec!(0.3), dec!(0.1), Decimal::ZERO],
                vec![Decimal::ZERO, dec!(0.4), dec!(0.4), dec!(1.2)],
            ),
        ];
        for input in inputs {
            let records = records_for(&input);
            let mut contributed = Decimal::ZERO;
            for r in &records {
                let cap = r
                    .gross_distribution
                    .min(r.capital_call.abs())
                    .min(r.outstanding_commitment_before_year);
                assert!(r.recycled_distribution <= cap, "year {}", r.year);
                assert!(r.recycled_distribution >= Decimal::ZERO);
                contributed += r.capital_call.abs() + r.recycled_distribution;
                assert!(contributed <= input.subscription, "year {}", r.year);
            }
        }
    }

    #[test]
    fn test_buyout_cash_walk() {
        let input = SimulationInput::default();
        let records = records_for(&input);
        assert_eq!(records.len(), 11);
        assert_eq!(records[0].net_cash_flow, Decimal::ZERO);
        assert_eq!(records[1].actual_cash_out, dec!(-20000));
        assert_eq!(records[3].outstanding_commitment_before_year, dec!(60000));
        // Calls consume the whole commitment, so nothing is recycled
        assert!(records.iter().all(|r| r.recycled_distribution.is_zero()));
        assert_eq!(records[3].net_cash_flow, dec!(-17000));
        assert_eq!(records[5].outstanding_commitment_before_year, dec!(20000));
        assert_eq!(records[6].outstanding_commitment_before_year, Decimal::ZERO);
    }

    #[test]
    fn test_future_value_compounds_to_terminal_year() {
        let input = SimulationInput::default();
        let records = records_for(&input);
        // 3,000 at year 3 compounded 7 years at 15%
        let expected = dec!(3000) * dec!(1.15).powi(7);
        assert_eq!(records[3].future_value, expected);
        assert_eq!(records[10].future_value, records[10].net_distribution);
        assert_eq!(records[2].future_value, Decimal::ZERO);
    }

    #[test]
    fn test_secondary_compounds_to_year_six() {
        let input = SimulationInput {
            strategy: Strategy::Secondary,
            ..Default::default()
        };
        let records = records_for(&input);
        assert_eq!(records[6].future_value, records[6].net_distribution);
        assert_eq!(
            records[5].future_value,
            records[5].net_distribution * dec!(1.15)
        );
    }

    #[test]
    fn test_secondary_year_two_capped_by_headroom() {
        let input = SimulationInput {
            strategy: Strategy::Secondary,
            ..Default::default()
        };
        let records = records_for(&input);
        let y2 = &records[2];
        assert_eq!(y2.capital_call, dec!(-50000));
        assert!(y2.gross_distribution > Decimal::ZERO);
        assert_eq!(y2.outstanding_commitment_before_year, dec!(50000));
        assert_eq!(y2.recycled_distribution, Decimal::ZERO);
        assert_eq!(y2.actual_cash_out, dec!(-50000));
        assert_eq!(y2.net_distribution, y2.gross_distribution);

        // The same year with commitment to spare would recycle
        let uncapped = recycled_amount(
            Strategy::Secondary,
            y2.capital_call,
            y2.gross_distribution,
            y2.outstanding_commitment_before_year,
            dec!(50000),
        );
        assert_eq!(uncapped, y2.gross_distribution);
    }

    #[test]
    fn test_cumulative_net_cash_flow_is_running_sum() {
        let records = records_for(&SimulationInput::default());
        let mut running = Decimal::ZERO;
        for r in &records {
            running += r.net_cash_flow;
            assert_eq!(r.cumulative_net_cash_flow, running);
        }
    }

    #[test]
    fn test_platform_fee_per_year() {
        let records = records_for(&SimulationInput::default());
        assert_eq!(records[0].platform_fee, Decimal::ZERO);
        assert_eq!(records[1].platform_fee, dec!(3200));
        assert_eq!(records[2].platform_fee, dec!(1200));
    }
}
