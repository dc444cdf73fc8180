use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pe_simulator_core::simulator::fees::{self, FeeTier};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

#[napi]
pub fn simulate_investment(input_json: String) -> NapiResult<String> {
    let input: pe_simulator_core::simulator::SimulationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = pe_simulator_core::simulator::simulate(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compare_strategies(input_json: String) -> NapiResult<String> {
    let input: pe_simulator_core::simulator::SimulationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = pe_simulator_core::simulator::compare::compare_strategies(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[napi]
pub fn run_sensitivity(input_json: String) -> NapiResult<String> {
    let input: pe_simulator_core::scenarios::SensitivityInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        pe_simulator_core::scenarios::run_sensitivity(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Fees & returns
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct AnnualFeeInput {
    subscription: Decimal,
    year: u32,
}

#[derive(Serialize)]
struct AnnualFeeOutput {
    year: u32,
    fee: Decimal,
    tier: FeeTier,
}

#[napi]
pub fn annual_fee(input_json: String) -> NapiResult<String> {
    let input: AnnualFeeInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    if input.subscription <= Decimal::ZERO {
        return Err(to_napi_error("subscription must be positive"));
    }
    let output = AnnualFeeOutput {
        year: input.year,
        fee: fees::annual_fee(input.subscription, input.year),
        tier: fees::fee_tier(input.subscription),
    };
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn fee_schedule(input_json: String) -> NapiResult<String> {
    let input: fees::FeeScheduleInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = fees::fee_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn solve_irr(input_json: String) -> NapiResult<String> {
    let input: pe_simulator_core::time_value::IrrInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = pe_simulator_core::time_value::solve_irr(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
