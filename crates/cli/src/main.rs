use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;

use restock_infra::{
    ForecastRequest, InMemoryCatalog, InMemoryDocumentStore, PipelineConfig, PipelineContext,
    PipelineError, forecast_upload, parse_documents,
};

#[derive(Parser)]
#[command(name = "restock", about = "Forecast product demand and recommend restock quantities")]
struct Cli {
    #[arg(
        long,
        short,
        global = true,
        action = ArgAction::SetTrue,
        help = "Log at debug level when RUST_LOG is unset"
    )]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast every product found in an order dump (JSON array or JSON lines).
    Orders(OrdersArgs),
    /// Forecast a single series from a CSV upload.
    Csv(CsvArgs),
}

#[derive(Args)]
struct OrdersArgs {
    /// Order documents.
    file: PathBuf,
    /// Only use orders mentioning this product id or name.
    #[arg(long)]
    product: Option<String>,
    /// Days to forecast (defaults to RESTOCK_HORIZON_DAYS or 30).
    #[arg(long, allow_negative_numbers = true)]
    horizon: Option<i64>,
    /// Product documents used for names and stock levels.
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[derive(Args)]
struct CsvArgs {
    /// CSV file with a date column and a quantity column.
    file: PathBuf,
    #[arg(long, allow_negative_numbers = true)]
    horizon: Option<i64>,
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    current_stock: i64,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    if cli.verbose {
        restock_observability::init_with_default("debug");
    } else {
        restock_observability::init();
    }

    let config = PipelineConfig::from_env().context("invalid RESTOCK_* configuration")?;

    let outcome = match cli.command {
        Commands::Orders(args) => run_orders(args, config).await?,
        Commands::Csv(args) => run_csv(args, config).await?,
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            tracing::warn!(kind = ?err.kind(), error = %err, "run failed");
            print_json(&err.report())?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Outer error: could not set up the run. Inner error: the run itself failed.
async fn run_orders(args: OrdersArgs, config: PipelineConfig) -> Result<Result<(), PipelineError>> {
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let orders = parse_documents(&text)
        .with_context(|| format!("failed to parse {}", args.file.display()))?;

    let store = InMemoryDocumentStore::with_collection(config.orders_collection.clone(), orders);
    let horizon = args.horizon.unwrap_or(config.horizon_days);
    let mut ctx = match PipelineContext::open(store, config).await {
        Ok(ctx) => ctx,
        Err(e) => return Ok(Err(e)),
    };

    if let Some(path) = &args.catalog {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let products = parse_documents(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        ctx = ctx.with_catalog(InMemoryCatalog::from_documents(products));
    }

    let request = ForecastRequest {
        product: args.product,
        horizon,
    };
    let result = ctx.run_orders(&request).await;
    ctx.close().await.context("failed to close document store")?;

    match result {
        Ok(report) => {
            print_json(&report)?;
            Ok(Ok(()))
        }
        Err(e) => Ok(Err(e)),
    }
}

async fn run_csv(args: CsvArgs, config: PipelineConfig) -> Result<Result<(), PipelineError>> {
    let bytes = fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let horizon = args.horizon.unwrap_or(config.horizon_days);

    let engine = match config.engine() {
        Ok(engine) => engine,
        Err(e) => return Ok(Err(e.into())),
    };

    match forecast_upload(&engine, &config, &bytes, horizon, args.current_stock).await {
        Ok(forecast) => {
            print_json(&forecast)?;
            Ok(Ok(()))
        }
        Err(e) => Ok(Err(e)),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
