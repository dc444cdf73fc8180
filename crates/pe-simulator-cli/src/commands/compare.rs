use clap::Args;
use serde_json::Value;

use pe_simulator_core::simulator::compare;

use super::simulate::SimulationArgs;

/// Arguments for the strategy comparison
#[derive(Args)]
pub struct CompareArgs {
    #[command(flatten)]
    pub params: SimulationArgs,
}

pub fn run_compare(args: CompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let base = args.params.resolve()?;
    let result = compare::compare_strategies(&base)?;
    Ok(serde_json::to_value(result)?)
}
