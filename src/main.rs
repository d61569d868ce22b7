use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use pathcast::config::{SimulationConfig, SimulationRequest, TRADING_DAYS};
use pathcast::data_fetch::{CsvProvider, HistoryProvider, YahooProvider};
use pathcast::simulate_instrument;
use pathcast::visualisations::visualisations::plot_percentile_bands;

#[derive(Parser, Debug)]
#[command(version, about = "Monte Carlo percentile bands from historical volatility")]
struct Cli {
    /// Instrument symbol
    #[arg(long)]
    symbol: String,

    /// First day of the estimation window (YYYY-MM-DD)
    #[arg(long)]
    start_date: NaiveDate,

    #[arg(long, default_value_t = 10_000)]
    num_simulations: usize,

    /// Fix the random seed for reproducible bands
    #[arg(long)]
    seed: Option<u64>,

    /// Trading days used to estimate drift and volatility
    #[arg(long, default_value_t = TRADING_DAYS)]
    window: usize,

    /// Simulated business days, anchor day included
    #[arg(long, default_value_t = TRADING_DAYS)]
    horizon: usize,

    /// Horizon length in years
    #[arg(long, default_value_t = 1.0)]
    years: f64,

    /// Read history from a CSV file (date,close[,ticker]) instead of Yahoo
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write the combined table as CSV
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write a PNG chart of the bands
    #[arg(long)]
    chart: Option<PathBuf>,
}

fn init_log() {
    let (global_level, my_code_level) = if cfg!(debug_assertions) {
        (log::LevelFilter::Warn, log::LevelFilter::Debug)
    } else {
        (log::LevelFilter::Warn, log::LevelFilter::Info)
    };

    env_logger::Builder::new()
        .filter(None, global_level)
        .filter(Some("pathcast"), my_code_level)
        .parse_default_env()
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_log();
    let args = Cli::parse();

    let config = SimulationConfig {
        num_simulations: args.num_simulations,
        estimation_window: args.window,
        horizon_steps: args.horizon,
        horizon_years: args.years,
        seed: args.seed,
    };
    let request = SimulationRequest::new(args.symbol.clone(), args.start_date);

    let provider: Box<dyn HistoryProvider> = match &args.csv {
        Some(path) => Box::new(CsvProvider::new(path)),
        None => Box::new(YahooProvider::default()),
    };

    let run = simulate_instrument(provider.as_ref(), &request, &config).await?;

    println!(
        "{}: drift {:.4}, volatility {:.4}, start {:.4} on {}",
        request.instrument_id,
        run.parameters.drift,
        run.parameters.volatility,
        run.starting_price,
        run.anchor_date
    );
    print!("{}", run.table);

    if let Some(path) = &args.output {
        run.table.save_csv(path)?;
        log::info!("table written to {}", path.display());
    }
    if let Some(path) = &args.chart {
        let title = format!("{} Monte Carlo Bands ({} paths)", request.instrument_id, config.num_simulations);
        plot_percentile_bands(&run, &config, &title, path)?;
    }

    Ok(())
}
