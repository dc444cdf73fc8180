use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use pe_simulator_core::time_value::{self, IrrInput};

use crate::input;

/// Arguments for a standalone IRR solve
#[derive(Args)]
pub struct IrrArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Annual cash flows starting at year 0 (comma-separated, e.g. "-100,0,0,250")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let irr_input: IrrInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let cash_flows = args
            .cash_flows
            .ok_or("--cash-flows is required (or provide --input)")?;
        IrrInput { cash_flows }
    };

    let result = time_value::solve_irr(&irr_input)?;
    Ok(serde_json::to_value(result)?)
}
