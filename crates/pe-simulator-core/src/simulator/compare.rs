//! Side-by-side projection of one subscription under every strategy.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::engine::project;
use super::params::{validate_input, SimulationInput, Strategy};
use crate::error::SimulatorError;
use crate::types::*;
use crate::SimulatorResult;

/// Headline metrics of one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyOutcome {
    pub strategy: Strategy,
    pub fund_lifetime_years: u32,
    pub total_actual_cash_out: Money,
    pub final_value: Money,
    pub moic: Multiple,
    pub irr: Rate,
    pub net_proceeds: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub outcomes: Vec<StrategyOutcome>,
    /// Strategy with the highest net proceeds.
    pub best_by_net_proceeds: Strategy,
    /// Strategy with the highest annualized return.
    pub best_by_irr: Strategy,
}

/// Project `input` under each strategy. The manual calendar is ignored and the
/// lifetime is raised to each strategy's minimum where needed. A strategy the
/// inputs are invalid for is skipped with a warning; the comparison fails only
/// when every strategy is skipped.
pub fn compare_strategies(
    input: &SimulationInput,
) -> SimulatorResult<ComputationOutput<StrategyComparison>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.manual_calendar.is_some() {
        warnings.push("Manual calendar ignored when comparing strategies".into());
    }

    let mut outcomes = Vec::with_capacity(Strategy::ALL.len());
    for strategy in Strategy::ALL {
        let mut scenario = SimulationInput {
            strategy,
            manual_calendar: None,
            ..input.clone()
        };
        let min_years = scenario.min_lifetime_years();
        if scenario.fund_lifetime_years < min_years {
            warnings.push(format!(
                "{}: fund lifetime raised from {} to {} years",
                strategy.label(),
                scenario.fund_lifetime_years,
                min_years
            ));
            scenario.fund_lifetime_years = min_years;
        }
        if let Err(e) = validate_input(&scenario) {
            warnings.push(format!("{}: skipped, {e}", strategy.label()));
            continue;
        }

        let mut run_warnings = Vec::new();
        let output = project(&scenario, &mut run_warnings);
        warnings.extend(
            run_warnings
                .into_iter()
                .map(|w| format!("{}: {w}", strategy.label())),
        );

        let r = &output.results;
        outcomes.push(StrategyOutcome {
            strategy,
            fund_lifetime_years: scenario.fund_lifetime_years,
            total_actual_cash_out: r.total_actual_cash_out,
            final_value: r.final_value,
            moic: r.moic,
            irr: r.irr,
            net_proceeds: r.net_proceeds,
        });
    }

    if outcomes.is_empty() {
        return Err(SimulatorError::InsufficientData(
            "No strategy accepts the given inputs".into(),
        ));
    }

    let best_by_net_proceeds = outcomes
        .iter()
        .max_by_key(|o| o.net_proceeds)
        .map(|o| o.strategy)
        .unwrap_or_default();
    let best_by_irr = outcomes
        .iter()
        .max_by_key(|o| o.irr)
        .map(|o| o.strategy)
        .unwrap_or_default();

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Strategy comparison: identical subscription projected under each strategy",
        &serde_json::json!({
            "subscription": input.subscription.to_string(),
            "target_multiple": input.target_multiple.to_string(),
            "target_yield": input.target_yield.to_string(),
            "reinvest_rate": input.reinvest_rate.to_string(),
            "return_method": input.return_method,
        }),
        warnings,
        elapsed,
        StrategyComparison {
            outcomes,
            best_by_net_proceeds,
            best_by_irr,
        },
    ))
}
