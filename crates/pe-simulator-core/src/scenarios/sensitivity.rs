use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::SimulatorError;
use crate::simulator::{project, validate_input, SimulationInput};
use crate::types::*;
use crate::SimulatorResult;

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// Simulation parameter that can be swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationParameter {
    Subscription,
    TargetMultiple,
    TargetYield,
    ReinvestRate,
    CallPeriodYears,
    FundLifetimeYears,
}

impl SimulationParameter {
    pub fn field_name(self) -> &'static str {
        match self {
            SimulationParameter::Subscription => "subscription",
            SimulationParameter::TargetMultiple => "target_multiple",
            SimulationParameter::TargetYield => "target_yield",
            SimulationParameter::ReinvestRate => "reinvest_rate",
            SimulationParameter::CallPeriodYears => "call_period_years",
            SimulationParameter::FundLifetimeYears => "fund_lifetime_years",
        }
    }

    /// Return a copy of `base` with this parameter set to `value`.
    pub fn apply(self, base: &SimulationInput, value: Decimal) -> SimulatorResult<SimulationInput> {
        let mut input = base.clone();
        match self {
            SimulationParameter::Subscription => input.subscription = value,
            SimulationParameter::TargetMultiple => input.target_multiple = value,
            SimulationParameter::TargetYield => input.target_yield = value,
            SimulationParameter::ReinvestRate => input.reinvest_rate = value,
            SimulationParameter::CallPeriodYears => input.call_period_years = whole_years(self, value)?,
            SimulationParameter::FundLifetimeYears => {
                input.fund_lifetime_years = whole_years(self, value)?
            }
        }
        Ok(input)
    }
}

fn whole_years(param: SimulationParameter, value: Decimal) -> SimulatorResult<u32> {
    if value.fract() != Decimal::ZERO {
        return Err(SimulatorError::InvalidInput {
            field: param.field_name().into(),
            reason: format!("{value} is not a whole number of years"),
        });
    }
    value.to_u32().ok_or_else(|| SimulatorError::InvalidInput {
        field: param.field_name().into(),
        reason: format!("{value} is out of range"),
    })
}

/// Result metric read off each grid point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMetric {
    Moic,
    #[default]
    Irr,
    FinalValue,
    NetProceeds,
}

/// Sweep range of one parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityVariable {
    pub name: SimulationParameter,
    pub min: Decimal,
    pub max: Decimal,
    pub step: Decimal,
}

/// Input for 1- or 2-way sensitivity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    /// Base case; swept parameters are overridden per grid point
    pub base: SimulationInput,
    pub variable_1: SensitivityVariable,
    /// Omit for a 1-way table
    #[serde(default)]
    pub variable_2: Option<SensitivityVariable>,
    #[serde(default)]
    pub output_metric: OutputMetric,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub variable_1_name: SimulationParameter,
    pub variable_2_name: Option<SimulationParameter>,
    pub variable_1_values: Vec<Decimal>,
    pub variable_2_values: Vec<Decimal>,
    pub output_metric: OutputMetric,
    /// Matrix[i][j] = output when variable_1 = variable_1_values[i], variable_2 = variable_2_values[j].
    /// A 1-way table has a single column.
    pub matrix: Vec<Vec<Decimal>>,
    pub base_case_value: Decimal,
    /// (row, col) of the grid point closest to the midpoint of each range
    pub base_case_position: (usize, usize),
}

// ---------------------------------------------------------------------------
// Grid helpers
// ---------------------------------------------------------------------------

/// Sweep values from min to max with step, max appended if not landed on.
fn generate_sweep_values(var: &SensitivityVariable) -> SimulatorResult<Vec<Decimal>> {
    if var.step <= Decimal::ZERO {
        return Err(SimulatorError::InvalidInput {
            field: format!("variable:{}", var.name.field_name()),
            reason: "Step must be positive".into(),
        });
    }
    if var.min > var.max {
        return Err(SimulatorError::InvalidInput {
            field: format!("variable:{}", var.name.field_name()),
            reason: "Min must be <= max".into(),
        });
    }

    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        values.push(current);
        current += var.step;
    }
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }

    Ok(values)
}

fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn midpoint(var: &SensitivityVariable) -> Decimal {
    (var.min + var.max) / dec!(2)
}

fn evaluate_point(input: &SimulationInput, metric: OutputMetric) -> SimulatorResult<Decimal> {
    validate_input(input)?;
    let mut warnings = Vec::new();
    let results = project(input, &mut warnings).results;
    Ok(match metric {
        OutputMetric::Moic => results.moic,
        OutputMetric::Irr => results.irr,
        OutputMetric::FinalValue => results.final_value,
        OutputMetric::NetProceeds => results.net_proceeds,
    })
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Project the base case at every grid point.
///
/// Grid points whose input fails validation are recorded as zero with a
/// warning; only a malformed sweep range fails the whole run.
pub fn run_sensitivity(
    input: &SensitivityInput,
) -> SimulatorResult<ComputationOutput<SensitivityOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let v1_values = generate_sweep_values(&input.variable_1)?;
    let v2_values = match &input.variable_2 {
        Some(var) => generate_sweep_values(var)?,
        None => Vec::new(),
    };

    let v1_param = input.variable_1.name;
    let v2_param = input.variable_2.as_ref().map(|v| v.name);

    let mut matrix = Vec::with_capacity(v1_values.len());
    for v1 in &v1_values {
        let row_input = v1_param.apply(&input.base, *v1);
        let row = match (v2_param, &row_input) {
            (Some(param), Ok(row_base)) => v2_values
                .iter()
                .map(|v2| {
                    let value = param
                        .apply(row_base, *v2)
                        .and_then(|point| evaluate_point(&point, input.output_metric));
                    value.unwrap_or_else(|e| {
                        warnings.push(format!("Evaluation failed at ({v1}, {v2}): {e}"));
                        Decimal::ZERO
                    })
                })
                .collect(),
            (None, Ok(point)) => {
                let value = evaluate_point(point, input.output_metric).unwrap_or_else(|e| {
                    warnings.push(format!("Evaluation failed at {v1}: {e}"));
                    Decimal::ZERO
                });
                vec![value]
            }
            (_, Err(e)) => {
                warnings.push(format!("Evaluation failed at {v1}: {e}"));
                vec![Decimal::ZERO; v2_values.len().max(1)]
            }
        };
        matrix.push(row);
    }

    let base_row = closest_index(&v1_values, midpoint(&input.variable_1));
    let base_col = input
        .variable_2
        .as_ref()
        .map(|var| closest_index(&v2_values, midpoint(var)))
        .unwrap_or(0);
    let base_case_value = matrix
        .get(base_row)
        .and_then(|row| row.get(base_col))
        .copied()
        .unwrap_or_default();

    let output = SensitivityOutput {
        variable_1_name: v1_param,
        variable_2_name: v2_param,
        variable_1_values: v1_values,
        variable_2_values: v2_values,
        output_metric: input.output_metric,
        matrix,
        base_case_value,
        base_case_position: (base_row, base_col),
    };

    let methodology = if v2_param.is_some() {
        "2-Way Sensitivity Analysis (Evaluated)"
    } else {
        "1-Way Sensitivity Analysis (Evaluated)"
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        methodology,
        &serde_json::json!({
            "variable_1": v1_param,
            "variable_2": v2_param,
            "output_metric": input.output_metric,
            "strategy": input.base.strategy,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
