use log::debug;
use statrs::statistics::Statistics;

use crate::error::{Result, SimulationError};
use crate::models::series::HistoricalSeries;

/// Annualized drift and volatility, fixed for a whole run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParameters {
    pub drift: f64,
    pub volatility: f64,
}

/// Log-returns `ln(p[i] / p[i-1])` over `prices`. Fails on the first
/// non-positive or non-finite price.
pub fn log_returns(prices: &[f64]) -> Result<Vec<f64>> {
    if let Some(index) = prices.iter().position(|p| !p.is_finite() || *p <= 0.0) {
        return Err(SimulationError::invalid_price(index, prices[index]));
    }
    Ok(prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect())
}

/// Estimate drift and volatility from the first `window` observations.
///
/// The window is also the annualization factor: drift is the mean return
/// times `window`, volatility the sample standard deviation times
/// `sqrt(window)`. The series must hold at least `window + 1` points.
pub fn estimate_parameters(history: &HistoricalSeries, window: usize) -> Result<ModelParameters> {
    if window < 3 {
        return Err(SimulationError::invalid_parameter(format!(
            "estimation window must be at least 3, got {window}"
        )));
    }
    let required = window + 1;
    if history.len() < required {
        return Err(SimulationError::insufficient_data(required, history.len()));
    }

    let prices: Vec<f64> = history.prices().take(window).collect();
    let returns = log_returns(&prices)?;

    let periods = window as f64;
    let drift = returns.iter().mean() * periods;
    let volatility = returns.iter().std_dev() * periods.sqrt();

    debug!(
        "estimated drift {:.6} volatility {:.6} from {} returns",
        drift,
        volatility,
        returns.len()
    );

    Ok(ModelParameters { drift, volatility })
}
