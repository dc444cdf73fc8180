//! Aggregation of the yearly table into summary results.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::fees::total_fees;
use super::params::{InvestorProfile, ReturnMethod, SimulationInput, Strategy};
use super::recycling::YearRecord;
use crate::time_value::{annualized_return, compound_factor, newton_irr};
use crate::types::{Money, Multiple, Rate};

/// Flat tax on capital gains for individual investors.
pub const INDIVIDUAL_TAX_RATE: Rate = dec!(0.30);

/// Summary metrics of one projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResults {
    pub total_capital_called: Money,
    pub total_actual_cash_out: Money,
    pub total_gross_distributions: Money,
    pub total_recycled: Money,
    pub total_fees: Money,
    /// Σ future value.
    pub final_value_before_fees: Money,
    pub final_value: Money,
    /// Final value / actual cash out (TVPI).
    pub moic: Multiple,
    /// Gross distributions / capital called.
    pub dpi: Multiple,
    /// Annualized return under `return_method`.
    pub irr: Rate,
    pub return_method: ReturnMethod,
    pub terminal_year: u32,
    /// `None` when taxes are not computed for the investor profile.
    pub taxes_owed: Option<Money>,
    pub net_proceeds: Money,
    pub j_curve_trough_year: u32,
    pub j_curve_trough_value: Money,
}

/// Net distribution of one year reinvested at the alternate target IRR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReinvestedYear {
    pub year: u32,
    pub net_distribution: Money,
    pub reinvested_value: Money,
    pub plus_value: Money,
}

/// Second result set, with every net distribution reinvested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReinvestmentResults {
    pub reinvestment_strategy: Strategy,
    pub reinvestment_rate: Rate,
    pub reinvested_values: Vec<ReinvestedYear>,
    pub total_plus_value: Money,
    pub final_value: Money,
    pub moic: Multiple,
    pub irr: Rate,
    pub taxes_owed: Option<Money>,
    pub net_proceeds: Money,
}

/// Ratio guarded against a zero or negative denominator.
pub fn multiple_of(value: Money, invested: Money) -> Multiple {
    if invested <= Decimal::ZERO {
        Decimal::ZERO
    } else {
        value / invested
    }
}

/// Taxes owed on a capital gain. `None` means not applicable.
pub fn taxes_on_gain(profile: InvestorProfile, gain: Money) -> Option<Money> {
    match profile {
        InvestorProfile::Individual => Some(gain.max(Decimal::ZERO) * INDIVIDUAL_TAX_RATE),
        InvestorProfile::Entity => None,
    }
}

/// Taxes owed on the capital gain of the distributions over the subscription.
pub fn compute_taxes(
    profile: InvestorProfile,
    subscription: Money,
    total_distributions: Money,
) -> Option<Money> {
    taxes_on_gain(profile, total_distributions - subscription)
}

/// Annualized return under the requested method.
///
/// `Irr` runs Newton-Raphson on `cash_flows` and reports a warning when it
/// does not converge; `Annualized` uses the closed-form root of the multiple.
fn annualized(
    method: ReturnMethod,
    cash_flows: &[Money],
    final_value: Money,
    invested: Money,
    years: u32,
    label: &str,
    warnings: &mut Vec<String>,
) -> Rate {
    match method {
        ReturnMethod::Irr => {
            let estimate = newton_irr(cash_flows);
            if !estimate.converged {
                warn!(
                    series = label,
                    rate = %estimate.rate,
                    iterations = estimate.iterations,
                    residual = %estimate.npv,
                    "IRR did not converge"
                );
                warnings.push(format!(
                    "{label} IRR did not converge after {} iterations (NPV residual {}); \
                     reporting last estimate",
                    estimate.iterations,
                    estimate.npv.round_dp(6)
                ));
            }
            estimate.rate
        }
        ReturnMethod::Annualized => annualized_return(final_value, invested, years),
    }
}

/// Sum the yearly table into [`FinalResults`].
pub fn aggregate(
    input: &SimulationInput,
    records: &[YearRecord],
    warnings: &mut Vec<String>,
) -> FinalResults {
    let terminal_year = input.terminal_year();

    let total_capital_called: Money = records.iter().map(|r| r.capital_call.abs()).sum();
    let total_actual_cash_out: Money = records.iter().map(|r| r.actual_cash_out.abs()).sum();
    let total_gross_distributions: Money = records.iter().map(|r| r.gross_distribution).sum();
    let total_recycled: Money = records.iter().map(|r| r.recycled_distribution).sum();
    let final_value_before_fees: Money = records.iter().map(|r| r.future_value).sum();

    let fees = total_fees(input.subscription, input.fund_lifetime_years);
    let final_value = final_value_before_fees - fees;

    let moic = multiple_of(final_value, total_actual_cash_out);
    let dpi = multiple_of(total_gross_distributions, total_capital_called);

    if total_actual_cash_out.is_zero() {
        warnings.push("No capital disbursed; MOIC reported as zero".into());
    }

    let net_cash_flows: Vec<Money> = records.iter().map(|r| r.net_cash_flow).collect();
    let irr = annualized(
        input.return_method,
        &net_cash_flows,
        final_value,
        total_actual_cash_out,
        terminal_year,
        "Net cash flow",
        warnings,
    );

    let taxes_owed = compute_taxes(
        input.investor_profile,
        input.subscription,
        total_gross_distributions,
    );
    let net_proceeds = final_value - taxes_owed.unwrap_or(Decimal::ZERO);

    let (j_curve_trough_year, j_curve_trough_value) = records.iter().fold(
        (0u32, Decimal::ZERO),
        |(year, value), r| {
            if r.cumulative_net_cash_flow < value {
                (r.year, r.cumulative_net_cash_flow)
            } else {
                (year, value)
            }
        },
    );

    FinalResults {
        total_capital_called,
        total_actual_cash_out,
        total_gross_distributions,
        total_recycled,
        total_fees: fees,
        final_value_before_fees,
        final_value,
        moic,
        dpi,
        irr,
        return_method: input.return_method,
        terminal_year,
        taxes_owed,
        net_proceeds,
        j_curve_trough_year,
        j_curve_trough_value,
    }
}

/// Alternate scenario: every net distribution is reinvested at the target IRR
/// of the reinvestment strategy until the terminal year. Taxed on the fund's
/// capital gain plus the plus-value earned by reinvesting.
pub fn reinvestment_results(
    input: &SimulationInput,
    records: &[YearRecord],
    results: &FinalResults,
    warnings: &mut Vec<String>,
) -> ReinvestmentResults {
    let reinvestment_strategy = input.effective_reinvestment_strategy();
    let rate = reinvestment_strategy.reinvestment_target_irr();
    let terminal_year = results.terminal_year;

    let reinvested_values: Vec<ReinvestedYear> = records
        .iter()
        .filter(|r| r.net_distribution > Decimal::ZERO)
        .map(|r| {
            let reinvested_value = r.net_distribution
                * compound_factor(rate, terminal_year.saturating_sub(r.year));
            ReinvestedYear {
                year: r.year,
                net_distribution: r.net_distribution,
                reinvested_value,
                plus_value: reinvested_value - r.net_distribution,
            }
        })
        .collect();

    let total_reinvested: Money = reinvested_values.iter().map(|y| y.reinvested_value).sum();
    let total_plus_value: Money = reinvested_values.iter().map(|y| y.plus_value).sum();
    let final_value = total_reinvested - results.total_fees;
    let moic = multiple_of(final_value, results.total_actual_cash_out);

    // Investor pays the actual cash out and receives everything at the terminal year.
    let mut cash_flows: Vec<Money> = records.iter().map(|r| r.actual_cash_out).collect();
    if let Some(last) = cash_flows.get_mut(terminal_year as usize) {
        *last += final_value;
    }
    let irr = annualized(
        input.return_method,
        &cash_flows,
        final_value,
        results.total_actual_cash_out,
        terminal_year,
        "Reinvestment",
        warnings,
    );

    let capital_gain = (results.total_gross_distributions - input.subscription).max(Decimal::ZERO);
    let taxes_owed = taxes_on_gain(input.investor_profile, capital_gain + total_plus_value);
    let net_proceeds = final_value - taxes_owed.unwrap_or(Decimal::ZERO);

    ReinvestmentResults {
        reinvestment_strategy,
        reinvestment_rate: rate,
        reinvested_values,
        total_plus_value,
        final_value,
        moic,
        irr,
        taxes_owed,
        net_proceeds,
    }
}
