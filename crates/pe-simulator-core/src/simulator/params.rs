use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SimulatorError;
use crate::types::{Money, Multiple, Rate};
use crate::SimulatorResult;

/// Longest projection horizon accepted by [`validate_input`].
pub const MAX_FUND_LIFETIME_YEARS: u32 = 30;

/// Upper bounds keeping every projected amount inside `Decimal` range over
/// the longest horizon.
pub const MAX_SUBSCRIPTION: Money = dec!(1000000000000000);
pub const MAX_REINVEST_RATE: Rate = Decimal::ONE;
pub const MAX_TARGET_MULTIPLE: Multiple = dec!(100);
pub const MAX_TARGET_YIELD: Rate = Decimal::ONE;
/// Largest single manual calendar entry (100x the subscription).
pub const MAX_CALENDAR_PCT: Rate = dec!(100);

/// Subscriptions strictly below this amount are drawn in a single call.
pub const SMALL_TICKET_THRESHOLD: Money = dec!(30000);

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Fund strategy. Selects the schedule-generation policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    #[default]
    Buyout,
    VentureCapital,
    GrowthCapital,
    Secondary,
    Debt,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::Buyout,
        Strategy::VentureCapital,
        Strategy::GrowthCapital,
        Strategy::Secondary,
        Strategy::Debt,
    ];

    /// Alternate target IRR used when distributions are reinvested.
    pub fn reinvestment_target_irr(self) -> Rate {
        match self {
            Strategy::VentureCapital => dec!(0.15),
            Strategy::GrowthCapital => dec!(0.133),
            Strategy::Secondary => dec!(0.082),
            Strategy::Buyout | Strategy::Debt => dec!(0.096),
        }
    }

    /// Shortest horizon on which the strategy's formula schedule fits.
    pub fn min_lifetime_years(self, debt_schedule: DebtSchedule) -> u32 {
        match self {
            Strategy::Buyout | Strategy::VentureCapital | Strategy::GrowthCapital => 10,
            Strategy::Secondary => 6,
            Strategy::Debt => debt_schedule.terminal_year(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Strategy::Buyout => "Buyout",
            Strategy::VentureCapital => "Venture Capital",
            Strategy::GrowthCapital => "Growth Capital",
            Strategy::Secondary => "Secondary",
            Strategy::Debt => "Private Debt",
        }
    }
}

/// Tax treatment of the investor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvestorProfile {
    /// Flat 30% on the capital gain.
    #[default]
    Individual,
    /// Taxes are not computed; proceeds pass through untaxed.
    Entity,
}

/// Drawdown and amortization layout of a private debt fund.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DebtSchedule {
    /// 35/35/30 over years 1-3, principal repaid over years 4-7.
    #[default]
    ThreeTranche,
    /// 55/15/20/10 over years 1-4, principal repaid over years 5-8.
    FourTranche,
}

impl DebtSchedule {
    /// Fraction of the subscription called in years 1, 2, ...
    pub fn call_fractions(self) -> &'static [Rate] {
        const THREE: [Decimal; 3] = [dec!(0.35), dec!(0.35), dec!(0.30)];
        const FOUR: [Decimal; 4] = [dec!(0.55), dec!(0.15), dec!(0.20), dec!(0.10)];
        match self {
            DebtSchedule::ThreeTranche => &THREE,
            DebtSchedule::FourTranche => &FOUR,
        }
    }

    /// Inclusive range of years in which principal is repaid.
    pub fn repayment_years(self) -> (u32, u32) {
        match self {
            DebtSchedule::ThreeTranche => (4, 7),
            DebtSchedule::FourTranche => (5, 8),
        }
    }

    pub fn terminal_year(self) -> u32 {
        self.repayment_years().1
    }
}

/// Which annualized-return measure the results report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnMethod {
    /// Newton-Raphson IRR on the net cash-flow series.
    #[default]
    Irr,
    /// (final value / cash out)^(1/years) - 1.
    Annualized,
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// User-supplied per-year calendar, replacing the strategy formulas.
///
/// Index `i` holds year `i + 1`. Values are fractions of the subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualCalendar {
    pub capital_call_pcts: Vec<Rate>,
    pub distribution_pcts: Vec<Rate>,
}

/// Parameters of one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationInput {
    /// Total capital committed by the investor.
    pub subscription: Money,
    /// Projection horizon in years.
    #[serde(default = "default_fund_lifetime")]
    pub fund_lifetime_years: u32,
    #[serde(default)]
    pub strategy: Strategy,
    /// Number of even call years starting year 1 (buyout only).
    #[serde(default = "default_call_period")]
    pub call_period_years: u32,
    /// Target MOIC/TVPI. Ignored for debt.
    #[serde(default = "default_target_multiple")]
    pub target_multiple: Multiple,
    /// Annual coupon rate (debt only).
    #[serde(default)]
    pub target_yield: Rate,
    #[serde(default)]
    pub debt_schedule: DebtSchedule,
    /// Annual compounding rate applied to net distributions.
    #[serde(default = "default_reinvest_rate")]
    pub reinvest_rate: Rate,
    #[serde(default)]
    pub investor_profile: InvestorProfile,
    /// Manual calendar mode when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_calendar: Option<ManualCalendar>,
    /// Compute the second result set with distributions reinvested.
    #[serde(default)]
    pub reinvest_distributions: bool,
    /// Strategy whose target IRR the reinvestment scenario uses. Defaults to `strategy`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reinvestment_strategy: Option<Strategy>,
    #[serde(default)]
    pub return_method: ReturnMethod,
}

fn default_fund_lifetime() -> u32 {
    10
}

fn default_call_period() -> u32 {
    5
}

fn default_target_multiple() -> Multiple {
    dec!(2.5)
}

fn default_reinvest_rate() -> Rate {
    dec!(0.15)
}

impl Default for SimulationInput {
    fn default() -> Self {
        SimulationInput {
            subscription: dec!(100000),
            fund_lifetime_years: default_fund_lifetime(),
            strategy: Strategy::Buyout,
            call_period_years: default_call_period(),
            target_multiple: default_target_multiple(),
            target_yield: Decimal::ZERO,
            debt_schedule: DebtSchedule::ThreeTranche,
            reinvest_rate: default_reinvest_rate(),
            investor_profile: InvestorProfile::Individual,
            manual_calendar: None,
            reinvest_distributions: false,
            reinvestment_strategy: None,
            return_method: ReturnMethod::Irr,
        }
    }
}

impl SimulationInput {
    pub fn is_small_ticket(&self) -> bool {
        self.subscription < SMALL_TICKET_THRESHOLD
    }

    /// Year to which net distributions are compounded.
    pub fn terminal_year(&self) -> u32 {
        if self.manual_calendar.is_some() {
            return self.fund_lifetime_years;
        }
        match self.strategy {
            Strategy::Secondary => 6,
            Strategy::Debt => self.debt_schedule.terminal_year(),
            _ => self.fund_lifetime_years,
        }
    }

    /// Shortest horizon this input can be projected on.
    pub fn min_lifetime_years(&self) -> u32 {
        if self.manual_calendar.is_some() {
            1
        } else {
            self.strategy.min_lifetime_years(self.debt_schedule)
        }
    }

    pub fn effective_reinvestment_strategy(&self) -> Strategy {
        self.reinvestment_strategy.unwrap_or(self.strategy)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject inputs the engine assumes away.
pub fn validate_input(input: &SimulationInput) -> SimulatorResult<()> {
    if input.subscription <= Decimal::ZERO {
        return Err(SimulatorError::InvalidInput {
            field: "subscription".into(),
            reason: "Subscription must be positive.".into(),
        });
    }
    if input.subscription > MAX_SUBSCRIPTION {
        return Err(SimulatorError::InvalidInput {
            field: "subscription".into(),
            reason: format!("Subscription cannot exceed {MAX_SUBSCRIPTION}."),
        });
    }
    if input.fund_lifetime_years == 0 {
        return Err(SimulatorError::InvalidInput {
            field: "fund_lifetime_years".into(),
            reason: "Fund lifetime must be at least 1 year.".into(),
        });
    }
    if input.fund_lifetime_years > MAX_FUND_LIFETIME_YEARS {
        return Err(SimulatorError::InvalidInput {
            field: "fund_lifetime_years".into(),
            reason: format!("Fund lifetime cannot exceed {MAX_FUND_LIFETIME_YEARS} years."),
        });
    }
    if input.reinvest_rate < Decimal::ZERO {
        return Err(SimulatorError::InvalidInput {
            field: "reinvest_rate".into(),
            reason: "Reinvestment rate cannot be negative.".into(),
        });
    }
    if input.reinvest_rate > MAX_REINVEST_RATE {
        return Err(SimulatorError::InvalidInput {
            field: "reinvest_rate".into(),
            reason: format!("Reinvestment rate cannot exceed {MAX_REINVEST_RATE} (100%)."),
        });
    }

    if let Some(calendar) = &input.manual_calendar {
        return validate_calendar(calendar, input.fund_lifetime_years);
    }

    let min_years = input.min_lifetime_years();
    if input.fund_lifetime_years < min_years {
        return Err(SimulatorError::InvalidInput {
            field: "fund_lifetime_years".into(),
            reason: format!(
                "{} schedule needs a fund lifetime of at least {} years.",
                input.strategy.label(),
                min_years
            ),
        });
    }

    match input.strategy {
        Strategy::Debt => {
            if input.target_yield < Decimal::ZERO {
                return Err(SimulatorError::InvalidInput {
                    field: "target_yield".into(),
                    reason: "Target yield cannot be negative.".into(),
                });
            }
            if input.target_yield > MAX_TARGET_YIELD {
                return Err(SimulatorError::InvalidInput {
                    field: "target_yield".into(),
                    reason: format!("Target yield cannot exceed {MAX_TARGET_YIELD} (100%)."),
                });
            }
        }
        strategy => {
            if input.target_multiple < Decimal::ONE {
                return Err(SimulatorError::InvalidInput {
                    field: "target_multiple".into(),
                    reason: "Target multiple must be at least 1.0x.".into(),
                });
            }
            if input.target_multiple > MAX_TARGET_MULTIPLE {
                return Err(SimulatorError::InvalidInput {
                    field: "target_multiple".into(),
                    reason: format!("Target multiple cannot exceed {MAX_TARGET_MULTIPLE}x."),
                });
            }
            if strategy == Strategy::Buyout
                && (input.call_period_years == 0
                    || input.call_period_years > input.fund_lifetime_years)
            {
                return Err(SimulatorError::InvalidInput {
                    field: "call_period_years".into(),
                    reason: "Call period must be between 1 and the fund lifetime.".into(),
                });
            }
        }
    }

    Ok(())
}

fn validate_calendar(calendar: &ManualCalendar, lifetime: u32) -> SimulatorResult<()> {
    let expected = lifetime as usize;
    for (field, pcts) in [
        ("manual_calendar.capital_call_pcts", &calendar.capital_call_pcts),
        ("manual_calendar.distribution_pcts", &calendar.distribution_pcts),
    ] {
        if pcts.len() != expected {
            return Err(SimulatorError::InvalidInput {
                field: field.into(),
                reason: format!("Expected {expected} entries, got {}.", pcts.len()),
            });
        }
        if let Some(i) = pcts.iter().position(|p| *p < Decimal::ZERO) {
            return Err(SimulatorError::InvalidInput {
                field: format!("{field}[{i}]"),
                reason: "Percentages cannot be negative.".into(),
            });
        }
        if let Some(i) = pcts.iter().position(|p| *p > MAX_CALENDAR_PCT) {
            return Err(SimulatorError::InvalidInput {
                field: format!("{field}[{i}]"),
                reason: format!("Percentages cannot exceed {MAX_CALENDAR_PCT}."),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_input_is_valid() {
        assert!(validate_input(&SimulationInput::default()).is_ok());
    }

    #[test]
    fn test_reject_zero_subscription() {
        let input = SimulationInput {
            subscription: Decimal::ZERO,
            ..Default::default()
        };
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn test_reject_negative_subscription() {
        let input = SimulationInput {
            subscription: dec!(-5000),
            ..Default::default()
        };
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn test_reject_reinvest_rate_above_bound() {
        let input = SimulationInput {
            fund_lifetime_years: 30,
            reinvest_rate: dec!(9),
            ..Default::default()
        };
        assert!(matches!(
            validate_input(&input),
            Err(SimulatorError::InvalidInput { ref field, .. }) if field == "reinvest_rate"
        ));
    }

    #[test]
    fn test_reject_subscription_above_bound() {
        let input = SimulationInput {
            subscription: MAX_SUBSCRIPTION + Decimal::ONE,
            ..Default::default()
        };
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn test_reject_multiple_above_bound() {
        let input = SimulationInput {
            target_multiple: dec!(101),
            ..Default::default()
        };
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn test_reject_manual_calendar_entry_above_bound() {
        let input = SimulationInput {
            fund_lifetime_years: 2,
            manual_calendar: Some(ManualCalendar {
                capital_call_pcts: vec![Decimal::ONE, Decimal::ZERO],
                distribution_pcts: vec![Decimal::ZERO, dec!(1000)],
            }),
            ..Default::default()
        };
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn test_reject_zero_lifetime() {
        let input = SimulationInput {
            fund_lifetime_years: 0,
            ..Default::default()
        };
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn test_reject_lifetime_shorter_than_strategy() {
        let input = SimulationInput {
            strategy: Strategy::VentureCapital,
            fund_lifetime_years: 8,
            ..Default::default()
        };
        let err = validate_input(&input).unwrap_err();
        assert!(err.to_string().contains("fund_lifetime_years"));
    }

    #[test]
    fn test_secondary_fits_six_years() {
        let input = SimulationInput {
            strategy: Strategy::Secondary,
            fund_lifetime_years: 6,
            ..Default::default()
        };
        assert!(validate_input(&input).is_ok());
    }

    #[test]
    fn test_reject_call_period_beyond_lifetime() {
        let input = SimulationInput {
            call_period_years: 11,
            ..Default::default()
        };
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn test_reject_multiple_below_one() {
        let input = SimulationInput {
            target_multiple: dec!(0.8),
            ..Default::default()
        };
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn test_debt_ignores_multiple() {
        let input = SimulationInput {
            strategy: Strategy::Debt,
            target_multiple: Decimal::ZERO,
            target_yield: dec!(0.08),
            ..Default::default()
        };
        assert!(validate_input(&input).is_ok());
    }

    #[test]
    fn test_reject_manual_calendar_wrong_length() {
        let input = SimulationInput {
            manual_calendar: Some(ManualCalendar {
                capital_call_pcts: vec![dec!(0.5), dec!(0.5)],
                distribution_pcts: vec![Decimal::ZERO; 10],
            }),
            ..Default::default()
        };
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn test_reject_manual_calendar_negative_entry() {
        let mut calls = vec![Decimal::ZERO; 10];
        calls[2] = dec!(-0.1);
        let input = SimulationInput {
            manual_calendar: Some(ManualCalendar {
                capital_call_pcts: calls,
                distribution_pcts: vec![Decimal::ZERO; 10],
            }),
            ..Default::default()
        };
        let err = validate_input(&input).unwrap_err();
        assert!(err.to_string().contains("capital_call_pcts[2]"));
    }

    #[test]
    fn test_manual_calendar_allows_short_horizon() {
        let input = SimulationInput {
            fund_lifetime_years: 3,
            manual_calendar: Some(ManualCalendar {
                capital_call_pcts: vec![dec!(1), Decimal::ZERO, Decimal::ZERO],
                distribution_pcts: vec![Decimal::ZERO, Decimal::ZERO, dec!(1.5)],
            }),
            ..Default::default()
        };
        assert!(validate_input(&input).is_ok());
        assert_eq!(input.terminal_year(), 3);
    }

    #[test]
    fn test_terminal_years() {
        let secondary = SimulationInput {
            strategy: Strategy::Secondary,
            ..Default::default()
        };
        assert_eq!(secondary.terminal_year(), 6);
        let debt = SimulationInput {
            strategy: Strategy::Debt,
            debt_schedule: DebtSchedule::FourTranche,
            ..Default::default()
        };
        assert_eq!(debt.terminal_year(), 8);
        assert_eq!(SimulationInput::default().terminal_year(), 10);
    }

    #[test]
    fn test_strategy_serde_tags() {
        let json = serde_json::to_string(&Strategy::VentureCapital).unwrap();
        assert_eq!(json, "\"VENTURE_CAPITAL\"");
        let parsed: InvestorProfile = serde_json::from_str("\"ENTITY\"").unwrap();
        assert_eq!(parsed, InvestorProfile::Entity);
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let input: SimulationInput =
            serde_json::from_str(r#"{"subscription": "50000", "strategy": "GROWTH_CAPITAL"}"#)
                .unwrap();
        assert_eq!(input.fund_lifetime_years, 10);
        assert_eq!(input.call_period_years, 5);
        assert_eq!(input.target_multiple, dec!(2.5));
        assert_eq!(input.return_method, ReturnMethod::Irr);
        assert!(input.manual_calendar.is_none());
    }
}
