use acos_forecast::OutputOptions;
use acos_forecast::core::Calculation;
use acos_forecast::core::log::init_logging;
use acos_forecast::core::metrics::{AcosInput, BudgetInput, ForecastInput};
use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct OutputArgs {
    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Export the report to a .json or .csv file
    #[arg(short, long)]
    export: Option<PathBuf>,
}

impl From<OutputArgs> for OutputOptions {
    fn from(args: OutputArgs) -> Self {
        OutputOptions {
            json: args.json,
            export: args.export,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// ACOS, ROI and profit from sales, ad spend and margin
    Acos {
        /// Forecast sales
        #[arg(long, allow_negative_numbers = true)]
        sales: f64,
        /// Forecast ad spend
        #[arg(long, allow_negative_numbers = true)]
        spend: f64,
        /// Gross margin (%)
        #[arg(long, allow_negative_numbers = true)]
        margin: f64,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Funnel forecast from impressions, CTR, CVR, CPC and AOV
    Forecast {
        /// Expected impressions
        #[arg(long)]
        impressions: u64,
        /// Target click-through rate (%)
        #[arg(long, allow_negative_numbers = true)]
        ctr: f64,
        /// Target conversion rate (%)
        #[arg(long, allow_negative_numbers = true)]
        cvr: f64,
        /// Target cost per click
        #[arg(long, allow_negative_numbers = true)]
        cpc: f64,
        /// Target average order value
        #[arg(long, allow_negative_numbers = true)]
        aov: f64,
        /// Gross margin (%)
        #[arg(long, allow_negative_numbers = true)]
        margin: f64,
        /// Display currency, defaults to the configured one
        #[arg(long)]
        currency: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Marketing budget from a sales target and TACOS
    Budget {
        /// Target sales
        #[arg(long, allow_negative_numbers = true)]
        sales: f64,
        /// Target TACOS (%)
        #[arg(long, allow_negative_numbers = true)]
        tacos: f64,
        /// Gross margin (%)
        #[arg(long, allow_negative_numbers = true)]
        margin: f64,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Show the current EUR/PLN exchange rate
    Rate,
}

impl From<Commands> for acos_forecast::AppCommand {
    fn from(cmd: Commands) -> acos_forecast::AppCommand {
        let calculate = |calculation, output: OutputArgs| acos_forecast::AppCommand::Calculate {
            calculation,
            output: output.into(),
        };
        match cmd {
            Commands::Acos {
                sales,
                spend,
                margin,
                output,
            } => calculate(
                Calculation::Acos(AcosInput {
                    sales,
                    spend,
                    margin,
                }),
                output,
            ),
            Commands::Forecast {
                impressions,
                ctr,
                cvr,
                cpc,
                aov,
                margin,
                currency,
                output,
            } => calculate(
                Calculation::Forecast(ForecastInput {
                    gross_margin: margin,
                    target_aov: aov,
                    target_ctr: ctr,
                    target_cpc: cpc,
                    target_cvr: cvr,
                    impressions,
                    currency: currency.unwrap_or_default(),
                }),
                output,
            ),
            Commands::Budget {
                sales,
                tacos,
                margin,
                output,
            } => calculate(
                Calculation::Budget(BudgetInput {
                    target_sales: sales,
                    target_tacos: tacos,
                    gross_margin: margin,
                }),
                output,
            ),
            Commands::Rate => acos_forecast::AppCommand::Rate,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => acos_forecast::cli::setup::setup(),
        Some(cmd) => acos_forecast::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
