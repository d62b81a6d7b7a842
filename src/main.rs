// src/main.rs
mod utils;
mod provider;
mod extractors;
mod storage;

use clap::Parser;
use extractors::financial::DEFAULT_MIN_YEAR;
use extractors::{FinancialExtractor, OutputFormat};
use provider::{YahooClient, DEFAULT_BASE_URL};
use storage::{StorageManager, TableSnapshot};
use utils::AppError;

/// Environment fallback for `--min-year`
const MIN_YEAR_ENV: &str = "MIN_FISCAL_YEAR";

/// Prints a company's recent annual Revenue, EBIT, Net Profit, EBITDA and ROI as JSON
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Ticker symbol of the company
    ticker: String,

    /// Earliest fiscal year to report (default: $MIN_FISCAL_YEAR, then 2021)
    #[arg(long)]
    min_year: Option<i32>,

    /// Output shape
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Save fetched statements and the rendered output under this directory
    #[arg(short, long)]
    output_dir: Option<String>,

    /// Financial data provider base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,
}

fn normalize_ticker(raw: &str) -> Result<String, AppError> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(AppError::Config("Usage: fin_table <TICKER>".to_string()));
    }
    Ok(ticker)
}

fn resolve_min_year(cli: Option<i32>) -> i32 {
    if let Some(year) = cli {
        tracing::debug!("Using minimum year {} from command-line argument", year);
        return year;
    }
    match std::env::var(MIN_YEAR_ENV).ok().map(|v| v.trim().parse::<i32>()) {
        Some(Ok(year)) => {
            tracing::debug!("Using minimum year {} from {}", year, MIN_YEAR_ENV);
            year
        }
        Some(Err(e)) => {
            tracing::warn!("Ignoring invalid {}: {}", MIN_YEAR_ENV, e);
            DEFAULT_MIN_YEAR
        }
        None => DEFAULT_MIN_YEAR,
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    let ticker = normalize_ticker(&args.ticker)?;
    let min_year = resolve_min_year(args.min_year);

    // 3. Fetch statements
    let client = YahooClient::new(&args.base_url)?;
    let (income, balance) = client.fetch_statements(&ticker).await;
    let (Some(income), Some(balance)) = (income, balance) else {
        return Err(AppError::FetchFailed(ticker));
    };
    tracing::debug!("Income statement line items: {:?}", income.labels().collect::<Vec<_>>());
    tracing::debug!("Balance sheet line items: {:?}", balance.labels().collect::<Vec<_>>());

    // 4. Build and render the table
    let extractor = FinancialExtractor::with_min_year(min_year);
    let json = extractor.build_table_json(&ticker, Some(&income), Some(&balance), args.format);
    println!("{}", json);

    // 5. Optionally keep a copy of everything
    if let Some(output_dir) = &args.output_dir {
        let snapshot = TableSnapshot {
            ticker: &ticker,
            format: args.format,
            min_year: extractor.min_year(),
            json: &json,
        };
        if let Err(e) = save_snapshot(output_dir, &income, &balance, &snapshot) {
            tracing::error!("Failed to save output: {}", e);
        }
    }

    tracing::info!("Processing finished for {}", ticker);
    Ok(())
}

fn save_snapshot(
    output_dir: &str,
    income: &extractors::FinancialStatement,
    balance: &extractors::FinancialStatement,
    snapshot: &TableSnapshot<'_>,
) -> Result<(), AppError> {
    let storage = StorageManager::new(output_dir)?;
    storage.save_statement(snapshot.ticker, "income_statement", income)?;
    storage.save_statement(snapshot.ticker, "balance_sheet", balance)?;
    storage.save_table(snapshot)?;
    storage.save_table_metadata(snapshot)?;
    Ok(())
}
