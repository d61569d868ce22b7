use log::debug;
use nalgebra::DMatrix;
use rand::distr::Open01;
use rand::Rng;
use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::{Result, SimulationError};
use crate::models::returns::ModelParameters;

pub(crate) fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| SimulationError::invalid_parameter(e.to_string()))
}

/// Closed-form GBM price at horizon `t` for the given quantile of the
/// terminal distribution.
pub fn gbm_price(s0: f64, mu: f64, sigma: f64, t: f64, quantile: f64) -> Result<f64> {
    if !(quantile > 0.0 && quantile < 1.0) {
        return Err(SimulationError::invalid_parameter(format!(
            "quantile must lie in (0, 1), got {quantile}"
        )));
    }
    let z = standard_normal()?.inverse_cdf(quantile);
    Ok(s0 * ((mu - 0.5 * sigma * sigma) * t + sigma * t.sqrt() * z).exp())
}

/// Simulated prices, one row per time step and one column per path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathEnsemble {
    prices: DMatrix<f64>,
}

impl PathEnsemble {
    pub fn num_timesteps(&self) -> usize {
        self.prices.nrows()
    }

    pub fn num_simulations(&self) -> usize {
        self.prices.ncols()
    }

    /// All path values at time step `t`.
    pub fn row(&self, t: usize) -> Vec<f64> {
        self.prices.row(t).iter().copied().collect()
    }

    /// One full trajectory.
    pub fn path(&self, i: usize) -> Vec<f64> {
        self.prices.column(i).iter().copied().collect()
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.prices
    }
}

/// Advance `num_simulations` independent GBM paths from `starting_price`.
///
/// Each step applies the exact lognormal update
/// `S[t] = S[t-1] * exp((mu - sigma^2/2) dt + sigma z sqrt(dt))` with a fresh
/// standard normal `z` per path, `dt = time / num_timesteps`. Row 0 is the
/// starting price. Draws are consumed row by row, path by path, so a seeded
/// `rng` reproduces the ensemble exactly.
pub fn simulate_paths<R: Rng>(
    starting_price: f64,
    params: &ModelParameters,
    time: f64,
    num_timesteps: usize,
    num_simulations: usize,
    rng: &mut R,
) -> Result<PathEnsemble> {
    if !starting_price.is_finite() || starting_price <= 0.0 {
        return Err(SimulationError::invalid_price(0, starting_price));
    }
    if num_simulations == 0 {
        return Err(SimulationError::invalid_parameter(
            "num_simulations must be at least 1",
        ));
    }
    if num_timesteps == 0 {
        return Err(SimulationError::invalid_parameter(
            "num_timesteps must be at least 1",
        ));
    }
    if !time.is_finite() || time < 0.0 {
        return Err(SimulationError::invalid_parameter(format!(
            "time horizon must be finite and non-negative, got {time}"
        )));
    }
    let ModelParameters { drift: mu, volatility: sigma } = *params;
    if !mu.is_finite() {
        return Err(SimulationError::invalid_parameter(format!("drift must be finite, got {mu}")));
    }
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(SimulationError::invalid_parameter(format!(
            "volatility must be finite and non-negative, got {sigma}"
        )));
    }

    let normal = standard_normal()?;
    let dt = time / num_timesteps as f64;
    let drift = (mu - 0.5 * sigma * sigma) * dt;
    let diffusion = sigma * dt.sqrt();

    debug!(
        "simulating {} paths x {} steps, dt {:.6}",
        num_simulations, num_timesteps, dt
    );

    let mut prices = DMatrix::from_element(num_timesteps, num_simulations, starting_price);
    for t in 1..num_timesteps {
        for i in 0..num_simulations {
            // Open01 keeps the inverse CDF finite.
            let u: f64 = rng.sample(Open01);
            let z = normal.inverse_cdf(u);
            prices[(t, i)] = prices[(t - 1, i)] * (drift + diffusion * z).exp();
        }
    }

    Ok(PathEnsemble { prices })
}
