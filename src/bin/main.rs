use clap::{Args, Parser, Subcommand};
use life_insurance_advisor::{
    advisor::Advisor,
    config::{AdvisorConfig, Credentials},
    coverage::calculate_coverage_at,
    display::{render_breakdown, render_report},
    form::{ProfileForm, DEFAULT_AGE, DEFAULT_COUNTRY},
    models::MonetaryValue,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "advisor",
    about = "Life insurance coverage estimates with AI-assisted product discovery"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute the local income-replacement estimate only
    Calculate {
        #[command(flatten)]
        profile: ProfileArgs,
        /// Annual discount rate (defaults to DISCOUNT_RATE or 0.02)
        #[arg(long)]
        discount_rate: Option<f64>,
    },
    /// Compute the estimate and ask the agent to explain it and suggest products
    Recommend {
        #[command(flatten)]
        profile: ProfileArgs,
        #[command(flatten)]
        keys: KeyArgs,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
struct ProfileArgs {
    #[arg(long, default_value_t = DEFAULT_AGE)]
    age: u32,
    /// Annual income, e.g. 85000 or "$85,000"
    #[arg(long)]
    income: String,
    #[arg(long, default_value = "0")]
    debt: String,
    #[arg(long, default_value = "0")]
    savings: String,
    #[arg(long, default_value = "0")]
    existing: String,
    /// Income replacement years: 5, 10 or 15
    #[arg(long, default_value_t = 5)]
    years: u32,
    #[arg(long, default_value = DEFAULT_COUNTRY)]
    country: String,
}

impl From<ProfileArgs> for ProfileForm {
    fn from(args: ProfileArgs) -> Self {
        ProfileForm {
            age: args.age,
            annual_income: MonetaryValue::from(args.income),
            total_debt: MonetaryValue::from(args.debt),
            savings: MonetaryValue::from(args.savings),
            existing_coverage: MonetaryValue::from(args.existing),
            income_replacement_years: args.years,
            country: args.country,
        }
    }
}

#[derive(Args)]
struct KeyArgs {
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_key: String,
    #[arg(long, env = "FIRECRAWL_API_KEY", hide_env_values = true)]
    firecrawl_key: String,
    #[arg(long, env = "E2B_API_KEY", hide_env_values = true)]
    e2b_key: String,
}

impl std::fmt::Debug for KeyArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyArgs([REDACTED])")
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AdvisorConfig::from_env()?;

    match cli.command {
        Command::Calculate {
            profile,
            discount_rate,
        } => {
            let profile = ProfileForm::from(profile).validate()?;
            let rate = discount_rate.unwrap_or(config.discount_rate);
            let breakdown = calculate_coverage_at(&profile, rate)?;

            print!("{}", render_breakdown(&breakdown));
        }
        Command::Recommend {
            profile,
            keys,
            json,
        } => {
            let profile = ProfileForm::from(profile).validate()?;
            let credentials = Credentials::new(keys.openai_key, keys.firecrawl_key, keys.e2b_key)?;
            let advisor = Advisor::with_credentials(&config, credentials)?;

            info!("Generating recommendation");
            let report = advisor.advise(&profile).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_report(&report));
            }
        }
    }

    Ok(())
}
