use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::aggregate::{aggregate, reinvestment_results, FinalResults, ReinvestmentResults};
use super::params::{validate_input, ReturnMethod, SimulationInput, SMALL_TICKET_THRESHOLD};
use super::recycling::{build_year_records, YearRecord};
use super::schedule::{raw_schedule, UNCALLED_CAPITAL_RATE};
use crate::types::*;
use crate::SimulatorResult;

/// Full projection: yearly table, summary and optional reinvestment scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub years: Vec<YearRecord>,
    pub results: FinalResults,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reinvestment: Option<ReinvestmentResults>,
}

/// Run the engine on an already validated input.
///
/// Never fails: numerical degeneracies are absorbed and described in
/// `warnings`.
pub fn project(input: &SimulationInput, warnings: &mut Vec<String>) -> SimulationOutput {
    debug!(
        strategy = ?input.strategy,
        subscription = %input.subscription,
        years = input.fund_lifetime_years,
        manual = input.manual_calendar.is_some(),
        "projecting investment"
    );

    let raw = raw_schedule(input);
    let years = build_year_records(input, &raw);
    let results = aggregate(input, &years, warnings);
    let reinvestment = input
        .reinvest_distributions
        .then(|| reinvestment_results(input, &years, &results, warnings));

    SimulationOutput {
        years,
        results,
        reinvestment,
    }
}

/// Validate, project and wrap the output with methodology and metadata.
pub fn simulate(input: &SimulationInput) -> SimulatorResult<ComputationOutput<SimulationOutput>> {
    let start = Instant::now();
    validate_input(input)?;

    let mut warnings: Vec<String> = Vec::new();

    if let Some(calendar) = &input.manual_calendar {
        let called: Rate = calendar.capital_call_pcts.iter().copied().sum();
        if called > Decimal::ONE {
            warnings.push(format!(
                "Manual calendar calls {}% of the subscription",
                (called * Decimal::ONE_HUNDRED).round_dp(2)
            ));
        }
    } else if input.is_small_ticket() {
        warnings.push(format!(
            "Subscription below {SMALL_TICKET_THRESHOLD}: capital drawn in full in year 1, \
             undrawn capital credited at {}% a year",
            UNCALLED_CAPITAL_RATE * Decimal::ONE_HUNDRED
        ));
    }

    let output = project(input, &mut warnings);

    let method = if input.manual_calendar.is_some() {
        "manual calendar".to_string()
    } else {
        format!("{} schedule", input.strategy.label())
    };
    let return_measure = match input.return_method {
        ReturnMethod::Irr => "Newton-Raphson IRR on net cash flow",
        ReturnMethod::Annualized => "annualized multiple",
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &format!(
            "Investment simulation: {method}, same-year recycling, {return_measure}"
        ),
        &serde_json::json!({
            "subscription": input.subscription.to_string(),
            "strategy": input.strategy,
            "fund_lifetime_years": input.fund_lifetime_years,
            "terminal_year": input.terminal_year(),
            "reinvest_rate": input.reinvest_rate.to_string(),
            "investor_profile": input.investor_profile,
            "return_method": input.return_method,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::params::{
        ManualCalendar, Strategy, MAX_REINVEST_RATE, MAX_SUBSCRIPTION, MAX_TARGET_MULTIPLE,
    };
    use rust_decimal_macros::dec;

    #[test]
    fn test_simulate_default_buyout() {
        let out = simulate(&SimulationInput::default()).unwrap();
        assert_eq!(out.result.years.len(), 11);
        assert!(out.result.reinvestment.is_none());
        assert!(out.methodology.contains("Buyout"));
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
    }

    #[test]
    fn test_simulate_rejects_invalid_input() {
        let input = SimulationInput {
            subscription: Decimal::ZERO,
            ..Default::default()
        };
        assert!(simulate(&input).is_err());
    }

    #[test]
    fn test_reinvest_rate_overflow_rejected() {
        let input = SimulationInput {
            fund_lifetime_years: 30,
            reinvest_rate: dec!(9),
            ..Default::default()
        };
        assert!(simulate(&input).is_err());
    }

    #[test]
    fn test_largest_accepted_input_projects() {
        let input = SimulationInput {
            subscription: MAX_SUBSCRIPTION,
            fund_lifetime_years: 30,
            target_multiple: MAX_TARGET_MULTIPLE,
            reinvest_rate: MAX_REINVEST_RATE,
            reinvest_distributions: true,
            ..Default::default()
        };
        let out = simulate(&input).unwrap();
        assert_eq!(out.result.years.len(), 31);
        assert!(out.result.results.final_value > Decimal::ZERO);
    }

    #[test]
    fn test_reinvestment_present_when_enabled() {
        let input = SimulationInput {
            reinvest_distributions: true,
            ..Default::default()
        };
        let out = simulate(&input).unwrap();
        let alt = out.result.reinvestment.unwrap();
        assert_eq!(alt.reinvestment_rate, dec!(0.096));
    }

    #[test]
    fn test_small_ticket_warning() {
        let input = SimulationInput {
            subscription: dec!(10000),
            ..Default::default()
        };
        let out = simulate(&input).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("year 1")));
        assert_eq!(out.result.years[1].capital_call, dec!(-10000));
    }

    #[test]
    fn test_manual_overcall_warning() {
        let input = SimulationInput {
            fund_lifetime_years: 2,
            manual_calendar: Some(ManualCalendar {
                capital_call_pcts: vec![dec!(0.8), dec!(0.4)],
                distribution_pcts: vec![Decimal::ZERO, dec!(2)],
            }),
            ..Default::default()
        };
        let out = simulate(&input).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("120")));
    }

    #[test]
    fn test_project_is_deterministic() {
        let input = SimulationInput {
            strategy: Strategy::GrowthCapital,
            reinvest_distributions: true,
            ..Default::default()
        };
        let mut w1 = Vec::new();
        let mut w2 = Vec::new();
        assert_eq!(project(&input, &mut w1), project(&input, &mut w2));
    }

    #[test]
    fn test_output_serializes() {
        let out = simulate(&SimulationInput::default()).unwrap();
        let json = serde_json::to_value(&out).unwrap();
        assert!(json["result"]["years"].is_array());
        assert!(json["result"].get("reinvestment").is_none());
        assert_eq!(json["result"]["results"]["return_method"], "IRR");
    }
}
