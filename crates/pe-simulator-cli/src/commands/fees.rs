use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use pe_simulator_core::simulator::fees::{self, FeeScheduleInput};

use crate::input;

/// Arguments for the platform fee schedule
#[derive(Args)]
pub struct FeesArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount committed to the fund
    #[arg(long)]
    pub subscription: Option<Decimal>,

    /// Number of fee-paying years
    #[arg(long, default_value_t = 10)]
    pub lifetime: u32,
}

pub fn run_fees(args: FeesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let fee_input: FeeScheduleInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let subscription = args
            .subscription
            .ok_or("--subscription is required (or provide --input)")?;
        FeeScheduleInput {
            subscription,
            fund_lifetime_years: args.lifetime,
        }
    };

    let result = fees::fee_schedule(&fee_input)?;
    Ok(serde_json::to_value(result)?)
}
