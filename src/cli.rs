use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::api::{ApiState, run_http_server};
use crate::core::{
    CompoundFrequency, DEFAULT_LIFE_EXPECTANCY, DEFAULT_WITHDRAWAL_RATE, GoalSolveConfig,
    GrowthInput, MAX_PROJECTION_YEARS, ProjectionError, RetirementAssumptions, RetirementInput,
    project_growth, project_retirement_with, solve_monthly_contribution, validate_assumptions,
};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error("failed to encode result: {0}")]
    Json(#[from] serde_json::Error),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCompoundFrequency {
    Monthly,
    Quarterly,
    Annually,
}

impl From<CliCompoundFrequency> for CompoundFrequency {
    fn from(value: CliCompoundFrequency) -> Self {
        match value {
            CliCompoundFrequency::Monthly => CompoundFrequency::Monthly,
            CliCompoundFrequency::Quarterly => CompoundFrequency::Quarterly,
            CliCompoundFrequency::Annually => CompoundFrequency::Annually,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "projection",
    about = "Compound growth and retirement projection calculators"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "info",
        help = "Log level used when RUST_LOG is unset"
    )]
    pub log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the calculators over HTTP
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[command(flatten)]
        assumptions: AssumptionArgs,
    },
    /// Project compound growth with monthly contributions
    Growth(GrowthArgs),
    /// Project savings at retirement and the income they support
    Retirement {
        #[command(flatten)]
        args: RetirementArgs,
        #[command(flatten)]
        assumptions: AssumptionArgs,
    },
    /// Find the monthly contribution that reaches a target balance
    Solve {
        #[command(flatten)]
        args: SolveArgs,
    },
}

#[derive(Args, Debug)]
struct GrowthArgs {
    #[arg(long, default_value_t = 0.0)]
    principal: f64,
    #[arg(long, default_value_t = 0.0)]
    monthly_contribution: f64,
    #[arg(long, help = "Nominal annual rate in percent, e.g. 7")]
    annual_rate: f64,
    #[arg(long, value_parser = clap::value_parser!(u32).range(..=i64::from(MAX_PROJECTION_YEARS)))]
    years: u32,
    #[arg(long, value_enum, default_value_t = CliCompoundFrequency::Monthly)]
    compound_frequency: CliCompoundFrequency,
}

impl From<&GrowthArgs> for GrowthInput {
    fn from(args: &GrowthArgs) -> Self {
        GrowthInput {
            principal: args.principal,
            monthly_contribution: args.monthly_contribution,
            annual_rate_percent: args.annual_rate,
            years: args.years,
            compound_frequency: args.compound_frequency.into(),
        }
    }
}

#[derive(Args, Debug)]
struct RetirementArgs {
    #[arg(long)]
    current_age: u32,
    #[arg(long)]
    retirement_age: u32,
    #[arg(long, default_value_t = 0.0)]
    current_savings: f64,
    #[arg(long, default_value_t = 0.0)]
    monthly_contribution: f64,
    #[arg(long, help = "Expected annual return in percent, e.g. 7")]
    expected_return: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Expected inflation in percent (reported only, not applied)"
    )]
    inflation_rate: f64,
    #[arg(long)]
    retirement_goal: f64,
}

impl From<&RetirementArgs> for RetirementInput {
    fn from(args: &RetirementArgs) -> Self {
        RetirementInput {
            current_age: args.current_age,
            retirement_age: args.retirement_age,
            current_savings: args.current_savings,
            monthly_contribution: args.monthly_contribution,
            expected_return_percent: args.expected_return,
            inflation_rate_percent: args.inflation_rate,
            retirement_goal: args.retirement_goal,
        }
    }
}

#[derive(Args, Debug)]
struct AssumptionArgs {
    #[arg(long, default_value_t = DEFAULT_LIFE_EXPECTANCY, help = "Age savings must last until")]
    life_expectancy: u32,
    #[arg(
        long,
        default_value_t = DEFAULT_WITHDRAWAL_RATE * 100.0,
        help = "Annual withdrawal rate in percent"
    )]
    withdrawal_rate: f64,
}

impl AssumptionArgs {
    fn build(&self) -> Result<RetirementAssumptions, ProjectionError> {
        let assumptions = RetirementAssumptions {
            life_expectancy: self.life_expectancy,
            withdrawal_rate: self.withdrawal_rate / 100.0,
        };
        validate_assumptions(&assumptions)?;
        Ok(assumptions)
    }
}

#[derive(Args, Debug)]
struct SolveArgs {
    #[arg(long)]
    target_amount: f64,
    #[arg(long, default_value_t = 0.0)]
    principal: f64,
    #[arg(long, help = "Nominal annual rate in percent, e.g. 7")]
    annual_rate: f64,
    #[arg(long, value_parser = clap::value_parser!(u32).range(..=i64::from(MAX_PROJECTION_YEARS)))]
    years: u32,
    #[arg(long, value_enum, default_value_t = CliCompoundFrequency::Monthly)]
    compound_frequency: CliCompoundFrequency,
    #[arg(long, default_value_t = 100_000.0, help = "Largest monthly contribution to try")]
    search_max: f64,
    #[arg(long, default_value_t = 0.01)]
    tolerance: f64,
    #[arg(long, default_value_t = 64)]
    max_iterations: u32,
}

impl SolveArgs {
    fn build(&self) -> (GrowthInput, GoalSolveConfig) {
        let input = GrowthInput {
            principal: self.principal,
            monthly_contribution: 0.0,
            annual_rate_percent: self.annual_rate,
            years: self.years,
            compound_frequency: self.compound_frequency.into(),
        };
        let mut config = GoalSolveConfig::for_target(self.target_amount);
        config.search_max = self.search_max;
        config.tolerance = self.tolerance;
        config.max_iterations = self.max_iterations;
        (input, config)
    }
}

pub async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Serve { port, assumptions } => {
            let state = ApiState {
                assumptions: assumptions.build()?,
            };
            run_http_server(port, state).await?;
        }
        Command::Growth(args) => {
            let result = project_growth(&GrowthInput::from(&args))?;
            print_json(&result)?;
        }
        Command::Retirement { args, assumptions } => {
            let result =
                project_retirement_with(&RetirementInput::from(&args), &assumptions.build()?)?;
            print_json(&result)?;
        }
        Command::Solve { args } => {
            let (input, config) = args.build();
            let result = solve_monthly_contribution(&input, config)?;
            print_json(&result)?;
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
