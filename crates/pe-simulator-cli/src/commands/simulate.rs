use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use pe_simulator_core::simulator::{
    self, DebtSchedule, InvestorProfile, ManualCalendar, ReturnMethod, SimulationInput, Strategy,
};

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    Buyout,
    VentureCapital,
    GrowthCapital,
    Secondary,
    Debt,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Buyout => Strategy::Buyout,
            StrategyArg::VentureCapital => Strategy::VentureCapital,
            StrategyArg::GrowthCapital => Strategy::GrowthCapital,
            StrategyArg::Secondary => Strategy::Secondary,
            StrategyArg::Debt => Strategy::Debt,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProfileArg {
    Individual,
    Entity,
}

impl From<ProfileArg> for InvestorProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Individual => InvestorProfile::Individual,
            ProfileArg::Entity => InvestorProfile::Entity,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DebtScheduleArg {
    ThreeTranche,
    FourTranche,
}

impl From<DebtScheduleArg> for DebtSchedule {
    fn from(arg: DebtScheduleArg) -> Self {
        match arg {
            DebtScheduleArg::ThreeTranche => DebtSchedule::ThreeTranche,
            DebtScheduleArg::FourTranche => DebtSchedule::FourTranche,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReturnMethodArg {
    Irr,
    Annualized,
}

impl From<ReturnMethodArg> for ReturnMethod {
    fn from(arg: ReturnMethodArg) -> Self {
        match arg {
            ReturnMethodArg::Irr => ReturnMethod::Irr,
            ReturnMethodArg::Annualized => ReturnMethod::Annualized,
        }
    }
}

/// Simulation parameters, shared by `simulate` and `compare`
#[derive(Args)]
pub struct SimulationArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount committed to the fund
    #[arg(long)]
    pub subscription: Option<Decimal>,

    /// Investment strategy
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Fund lifetime in years
    #[arg(long)]
    pub lifetime: Option<u32>,

    /// Buyout call period in years
    #[arg(long)]
    pub call_period: Option<u32>,

    /// Target gross multiple (e.g. 2.5)
    #[arg(long)]
    pub multiple: Option<Decimal>,

    /// Annual coupon yield of a debt fund (e.g. 0.09)
    #[arg(long = "yield")]
    pub target_yield: Option<Decimal>,

    /// Tranche calendar of a debt fund
    #[arg(long, value_enum)]
    pub debt_schedule: Option<DebtScheduleArg>,

    /// Rate at which distributions compound to the terminal year
    #[arg(long)]
    pub reinvest_rate: Option<Decimal>,

    /// Tax profile of the investor
    #[arg(long, value_enum)]
    pub profile: Option<ProfileArg>,

    /// Also report the scenario where distributions are reinvested
    #[arg(long)]
    pub reinvest_distributions: bool,

    /// Strategy whose target IRR applies to reinvested distributions
    #[arg(long, value_enum)]
    pub reinvestment_strategy: Option<StrategyArg>,

    /// How the annualized return is computed
    #[arg(long, value_enum)]
    pub return_method: Option<ReturnMethodArg>,

    /// Manual capital calls per year as fractions (comma-separated, e.g. "0.3,0.3,0.4")
    #[arg(long, value_delimiter = ',')]
    pub calls: Option<Vec<Decimal>>,

    /// Manual distributions per year as fractions (requires --calls)
    #[arg(long, value_delimiter = ',')]
    pub distributions: Option<Vec<Decimal>>,
}

impl SimulationArgs {
    /// Resolve the input from file, stdin or flags, in that order.
    pub fn resolve(self) -> Result<SimulationInput, Box<dyn std::error::Error>> {
        if let Some(ref path) = self.input {
            debug!(path = %path, "reading simulation input from file");
            return input::file::read_input(path);
        }
        if let Some(data) = input::stdin::read_stdin()? {
            debug!("reading simulation input from stdin");
            return Ok(serde_json::from_value(data)?);
        }
        self.into_input()
    }

    fn into_input(self) -> Result<SimulationInput, Box<dyn std::error::Error>> {
        let defaults = SimulationInput::default();

        let manual_calendar = match (self.calls, self.distributions) {
            (Some(capital_call_pcts), Some(distribution_pcts)) => Some(ManualCalendar {
                capital_call_pcts,
                distribution_pcts,
            }),
            (None, None) => None,
            _ => return Err("--calls and --distributions must be given together".into()),
        };
        // A manual calendar spans one entry per year unless the lifetime is explicit
        let calendar_years = manual_calendar
            .as_ref()
            .map(|c| c.capital_call_pcts.len() as u32);

        Ok(SimulationInput {
            subscription: self.subscription.unwrap_or(defaults.subscription),
            fund_lifetime_years: self
                .lifetime
                .or(calendar_years)
                .unwrap_or(defaults.fund_lifetime_years),
            strategy: self.strategy.map(Into::into).unwrap_or(defaults.strategy),
            call_period_years: self.call_period.unwrap_or(defaults.call_period_years),
            target_multiple: self.multiple.unwrap_or(defaults.target_multiple),
            target_yield: self.target_yield.unwrap_or(defaults.target_yield),
            debt_schedule: self
                .debt_schedule
                .map(Into::into)
                .unwrap_or(defaults.debt_schedule),
            reinvest_rate: self.reinvest_rate.unwrap_or(defaults.reinvest_rate),
            investor_profile: self
                .profile
                .map(Into::into)
                .unwrap_or(defaults.investor_profile),
            manual_calendar,
            reinvest_distributions: self.reinvest_distributions,
            reinvestment_strategy: self.reinvestment_strategy.map(Into::into),
            return_method: self
                .return_method
                .map(Into::into)
                .unwrap_or(defaults.return_method),
        })
    }
}

/// Arguments for a single simulation
#[derive(Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub params: SimulationArgs,

    /// Print only the summary results, without the yearly table
    #[arg(long)]
    pub summary: bool,
}

pub fn run_simulate(args: SimulateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let summary_only = args.summary;
    let sim_input = args.params.resolve()?;
    let result = simulator::simulate(&sim_input)?;

    let mut value = serde_json::to_value(result)?;
    if summary_only {
        if let Some(result) = value.get_mut("result").and_then(Value::as_object_mut) {
            result.remove("years");
        }
    }
    Ok(value)
}
