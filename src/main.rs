use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use horseman_core::export::{write_properties_csv, write_reviews_csv};
use horseman_core::{create_property_table, create_review_table, HorsemanError, PriceQuery, ScraperConfig};
use horseman_scrapers::{ChromiumBrowser, HeadlessScraper, PropertyOptions, ShapePolicy};
use serde::Serialize;
use std::io;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Shared secret presented to the scraper (-w, --watermark)
    #[arg(short = 'w', long, global = true)]
    watermark: Option<String>,

    /// Output format (-f, --format)
    #[arg(short = 'f', long, value_enum, global = true, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Show the browser window instead of running headless
    #[arg(long, global = true)]
    headful: bool,

    /// Navigation timeout in milliseconds (-t, --timeout-ms)
    #[arg(short = 't', long, global = true)]
    timeout_ms: Option<u64>,

    /// Path to the Chrome or Chromium executable
    #[arg(long, global = true)]
    chrome: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get a price quote for a stay
    #[command(long_about = "Get a price quote either from a listing page that embeds the pricing widget, or from a booking request built out of --property, --arrival and --departure.")]
    Price(PriceCommand),

    /// Scrape the guest reviews widget of a page
    Reviews(TargetCommand),

    /// Scrape every property of a listing, following its pager
    Properties(PropertiesCommand),

    /// Compute the availability calendar of a property page
    Availability(TargetCommand),

    /// Extract the VacationRental metadata embedded in a page
    Rentals(TargetCommand),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
    Csv,
}

#[derive(Args)]
struct TargetCommand {
    /// Page to scrape; https is assumed when the scheme is missing
    target: String,
}

#[derive(Args)]
struct PriceCommand {
    /// Listing or booking request URL
    #[arg(required_unless_present = "property")]
    target: Option<String>,

    /// Property id for a booking request (-p, --property)
    #[arg(short = 'p', long, requires_all = ["arrival", "departure"], conflicts_with = "target")]
    property: Option<String>,

    /// Arrival date, YYYY-MM-DD (-a, --arrival)
    #[arg(short = 'a', long)]
    arrival: Option<NaiveDate>,

    /// Departure date, YYYY-MM-DD (-d, --departure)
    #[arg(short = 'd', long)]
    departure: Option<NaiveDate>,

    /// Number of adults (-A, --adults)
    #[arg(short = 'A', long, default_value_t = 1)]
    adults: u32,

    /// Number of children (-c, --children)
    #[arg(short = 'c', long, default_value_t = 0)]
    children: u32,
}

#[derive(Args)]
struct PropertiesCommand {
    /// Listing page to start from
    target: String,

    /// Read both tile and list layouts instead of preferring tiles
    #[arg(long)]
    union: bool,

    /// Visit every property and attach its VacationRental metadata
    #[arg(long)]
    with_rental_details: bool,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Session failures are reported as "no result"; anything else is fatal.
fn or_no_result<T>(result: horseman_core::Result<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_session_failure() => {
            warn!("No result: {}", e);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn json_only(format: OutputFormat, what: &str) {
    if !matches!(format, OutputFormat::Json) {
        warn!("{} can only be printed as JSON", what);
    }
}

fn build_config(cli: &Cli) -> anyhow::Result<ScraperConfig> {
    let mut config = ScraperConfig::from_env().context("invalid HORSEMAN_* environment")?;
    if cli.headful {
        config.headless = false;
    }
    if let Some(ms) = cli.timeout_ms {
        config.navigation_timeout_ms = ms;
    }
    if let Some(path) = &cli.chrome {
        config.chrome_executable = Some(path.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let browser = Arc::new(ChromiumBrowser::new(config.clone()));
    let scraper = HeadlessScraper::new(browser, config)?;
    let watermark = cli.watermark.as_deref();

    match &cli.command {
        Commands::Price(cmd) => {
            let result = match (&cmd.target, &cmd.property) {
                (Some(target), _) => scraper.scrape_price(target, watermark).await,
                (None, Some(property)) => {
                    let (Some(arrival), Some(departure)) = (cmd.arrival, cmd.departure) else {
                        bail!("--arrival and --departure are required with --property");
                    };
                    let query = PriceQuery::new(property.clone(), arrival, departure, cmd.adults, cmd.children);
                    info!("Quoting {} nights at property {}", query.nights(), query.property);
                    scraper.scrape_price_query(&query, watermark).await
                }
                (None, None) => Err(HorsemanError::InvalidQuery("a target or --property is required".to_string())),
            };
            json_only(cli.format, "A price quote");
            print_json(&or_no_result(result)?.flatten())?;
        }
        Commands::Reviews(cmd) => {
            let reviews = or_no_result(scraper.scrape_reviews(&cmd.target, watermark).await)?.unwrap_or_default();
            match cli.format {
                OutputFormat::Json => print_json(&reviews)?,
                OutputFormat::Table => println!("{}", create_review_table(&reviews)),
                OutputFormat::Csv => write_reviews_csv(io::stdout(), &reviews)?,
            }
        }
        Commands::Properties(cmd) => {
            let options = PropertyOptions {
                policy: if cmd.union { ShapePolicy::Union } else { ShapePolicy::TilesFirst },
                with_rental_details: cmd.with_rental_details,
            };
            let properties =
                or_no_result(scraper.scrape_properties(&cmd.target, watermark, options).await)?.unwrap_or_default();
            match cli.format {
                OutputFormat::Json => print_json(&properties)?,
                OutputFormat::Table => println!("{}", create_property_table(&properties)),
                OutputFormat::Csv => write_properties_csv(io::stdout(), &properties)?,
            }
        }
        Commands::Availability(cmd) => {
            let calendar = or_no_result(scraper.scrape_availability(&cmd.target, watermark).await)?.flatten();
            json_only(cli.format, "An availability calendar");
            print_json(&calendar)?;
        }
        Commands::Rentals(cmd) => {
            let rentals = or_no_result(scraper.scrape_vacation_rentals(&cmd.target, watermark).await)?.unwrap_or_default();
            json_only(cli.format, "VacationRental metadata");
            print_json(&rentals)?;
        }
    }

    Ok(())
}
