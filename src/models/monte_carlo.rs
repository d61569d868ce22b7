use chrono::NaiveDate;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{SimulationConfig, SimulationRequest};
use crate::data_fetch::HistoryProvider;
use crate::error::{Result, SimulationError};
use crate::models::brownian::simulate_paths;
use crate::models::percentiles::{reduce_percentiles, PercentileTable};
use crate::models::returns::{estimate_parameters, ModelParameters};
use crate::models::series::HistoricalSeries;
use crate::report::{assemble, OutputTable};

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    pub parameters: ModelParameters,
    pub starting_price: f64,
    /// Last date of the estimation window; first simulated date.
    pub anchor_date: NaiveDate,
    pub percentiles: PercentileTable,
    pub table: OutputTable,
}

/// Seeded generator when `seed` is set, OS entropy otherwise.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    }
}

/// Estimate, simulate, reduce and assemble for one history.
///
/// Pure apart from the draws taken from `rng`; `config.seed` is ignored
/// here, see [`run_with_config`].
pub fn run_simulation<R: Rng>(
    history: &HistoricalSeries,
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<SimulationRun> {
    config.validate()?;

    let window = config.estimation_window;
    let parameters = estimate_parameters(history, window)?;

    let anchor = history
        .get(window - 1)
        .copied()
        .ok_or_else(|| SimulationError::insufficient_data(window + 1, history.len()))?;

    let ensemble = simulate_paths(
        anchor.price,
        &parameters,
        config.horizon_years,
        config.horizon_steps,
        config.num_simulations,
        rng,
    )?;
    let percentiles = reduce_percentiles(&ensemble);
    let table = assemble(&percentiles, history, anchor.date);

    if let Some(last) = percentiles.last() {
        info!(
            "simulated {} paths from {:.4} on {}: final band [{:.4}, {:.4}, {:.4}]",
            config.num_simulations, anchor.price, anchor.date, last.p5, last.median, last.p95
        );
    }

    Ok(SimulationRun {
        parameters,
        starting_price: anchor.price,
        anchor_date: anchor.date,
        percentiles,
        table,
    })
}

/// [`run_simulation`] with a generator built from `config.seed`.
pub fn run_with_config(history: &HistoricalSeries, config: &SimulationConfig) -> Result<SimulationRun> {
    let mut rng = make_rng(config.seed);
    run_simulation(history, config, &mut rng)
}

/// Fetch two years of history from `start_date` and run on it.
pub async fn simulate_instrument<P: HistoryProvider + ?Sized>(
    provider: &P,
    request: &SimulationRequest,
    config: &SimulationConfig,
) -> Result<SimulationRun> {
    config.validate()?;
    let end_date = request.end_date()?;
    info!(
        "requesting {} history {} to {}",
        request.instrument_id, request.start_date, end_date
    );
    let history = provider
        .get_history(&request.instrument_id, request.start_date, end_date)
        .await?;
    run_with_config(&history, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::series::PricePoint;
    use chrono::Duration;

    fn history(n: usize) -> HistoricalSeries {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        HistoricalSeries::new(
            (0..n)
                .map(|i| {
                    let price = 50.0 * (0.002 * i as f64 + 0.01 * (i as f64 * 0.7).sin()).exp();
                    PricePoint::new(start + Duration::days(i as i64), price)
                })
                .collect(),
        )
        .unwrap()
    }

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            num_simulations: 200,
            estimation_window: 20,
            horizon_steps: 15,
            horizon_years: 15.0 / 252.0,
            seed: Some(9),
        }
    }

    #[test]
    fn test_run_anchors_on_window_end() {
        let series = history(40);
        let run = run_with_config(&series, &small_config()).unwrap();

        assert_eq!(run.starting_price, series.points()[19].price);
        assert_eq!(run.anchor_date, series.points()[19].date);
        assert_eq!(run.percentiles.len(), 15);
        assert!(run.parameters.volatility > 0.0);
    }

    #[test]
    fn test_seeded_runs_are_identical() {
        let series = history(40);
        let a = run_with_config(&series, &small_config()).unwrap();
        let b = run_with_config(&series, &small_config()).unwrap();
        assert_eq!(a.percentiles, b.percentiles);
        assert_eq!(a.table, b.table);
    }

    #[test]
    fn test_short_history_is_insufficient() {
        let err = run_with_config(&history(20), &small_config()).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::InsufficientData {
                required: 21,
                available: 20
            }
        ));
    }

    #[test]
    fn test_invalid_config_fails_before_estimation() {
        let config = SimulationConfig {
            num_simulations: 0,
            ..small_config()
        };
        assert!(matches!(
            run_with_config(&history(5), &config),
            Err(SimulationError::InvalidParameter { .. })
        ));
    }
}
