use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use pe_simulator_core::scenarios::{
    self, OutputMetric, SensitivityInput, SensitivityVariable, SimulationParameter,
};
use pe_simulator_core::simulator::SimulationInput;

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MetricArg {
    Moic,
    Irr,
    FinalValue,
    NetProceeds,
}

impl From<MetricArg> for OutputMetric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Moic => OutputMetric::Moic,
            MetricArg::Irr => OutputMetric::Irr,
            MetricArg::FinalValue => OutputMetric::FinalValue,
            MetricArg::NetProceeds => OutputMetric::NetProceeds,
        }
    }
}

/// Arguments for sensitivity analysis
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to a full sensitivity input file, JSON or YAML (overrides other flags)
    #[arg(long)]
    pub input: Option<String>,

    /// First sensitivity variable in format name:min:max:step
    /// (e.g. "target_multiple:1.5:3.5:0.5")
    #[arg(long)]
    pub var1: Option<String>,

    /// Second sensitivity variable (optional, creates a 2D table)
    #[arg(long)]
    pub var2: Option<String>,

    /// Metric reported at each grid point
    #[arg(long, value_enum, default_value = "irr")]
    pub metric: MetricArg,

    /// Path to JSON or YAML file with the base case simulation input
    #[arg(long)]
    pub base_inputs: Option<String>,
}

fn parse_sens_var(spec: &str) -> Result<SensitivityVariable, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 4 {
        return Err(format!(
            "Sensitivity variable must be name:min:max:step, got '{}'",
            spec
        )
        .into());
    }
    let name: SimulationParameter = serde_json::from_value(Value::String(parts[0].to_string()))
        .map_err(|_| {
            format!(
                "Unknown parameter '{}' (expected subscription, target_multiple, target_yield, \
                 reinvest_rate, call_period_years or fund_lifetime_years)",
                parts[0]
            )
        })?;
    Ok(SensitivityVariable {
        name,
        min: parts[1].parse::<Decimal>()?,
        max: parts[2].parse::<Decimal>()?,
        step: parts[3].parse::<Decimal>()?,
    })
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sens_input: SensitivityInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let var1 = args
            .var1
            .as_deref()
            .ok_or("--var1 is required (or provide --input)")?;
        let base: SimulationInput = match args.base_inputs {
            Some(ref path) => input::file::read_input(path)?,
            None => SimulationInput::default(),
        };
        SensitivityInput {
            base,
            variable_1: parse_sens_var(var1)?,
            variable_2: args.var2.as_deref().map(parse_sens_var).transpose()?,
            output_metric: args.metric.into(),
        }
    };

    let result = scenarios::run_sensitivity(&sens_input)?;
    Ok(serde_json::to_value(result)?)
}
