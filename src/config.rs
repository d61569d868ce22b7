use chrono::{Months, NaiveDate};

use crate::error::{Result, SimulationError};

/// Trading days in a year; default length of both the estimation window and
/// the forward horizon.
pub const TRADING_DAYS: usize = 252;

/// How far past the start date history is requested.
pub const FETCH_SPAN_MONTHS: u32 = 24;

/// Parameters of a single simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub num_simulations: usize,
    /// Observations used for drift/volatility estimation, counted from the
    /// start of the series. The last one is the starting price.
    pub estimation_window: usize,
    /// Rows in the simulated ensemble, row 0 included.
    pub horizon_steps: usize,
    /// Forward horizon in years.
    pub horizon_years: f64,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_simulations: 10_000,
            estimation_window: TRADING_DAYS,
            horizon_steps: TRADING_DAYS,
            horizon_years: 1.0,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_simulations == 0 {
            return Err(SimulationError::invalid_parameter(
                "num_simulations must be at least 1",
            ));
        }
        if self.horizon_steps == 0 {
            return Err(SimulationError::invalid_parameter(
                "horizon_steps must be at least 1",
            ));
        }
        if self.estimation_window < 3 {
            return Err(SimulationError::invalid_parameter(format!(
                "estimation_window must be at least 3, got {}",
                self.estimation_window
            )));
        }
        if !self.horizon_years.is_finite() || self.horizon_years < 0.0 {
            return Err(SimulationError::invalid_parameter(format!(
                "horizon_years must be finite and non-negative, got {}",
                self.horizon_years
            )));
        }
        Ok(())
    }
}

/// What the parameter source hands to the core.
#[derive(Debug, Clone)]
pub struct SimulationRequest {
    pub instrument_id: String,
    pub start_date: NaiveDate,
}

impl SimulationRequest {
    pub fn new(instrument_id: impl Into<String>, start_date: NaiveDate) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            start_date,
        }
    }

    /// End of the history request: start date plus two years, clamped to the
    /// last day of the month when the day does not exist (29 Feb).
    pub fn end_date(&self) -> Result<NaiveDate> {
        self.start_date
            .checked_add_months(Months::new(FETCH_SPAN_MONTHS))
            .ok_or_else(|| {
                SimulationError::invalid_parameter(format!(
                    "start_date {} is out of range",
                    self.start_date
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.estimation_window, 252);
        assert_eq!(config.horizon_steps, 252);
    }

    #[test]
    fn test_rejects_zero_simulations() {
        let config = SimulationConfig {
            num_simulations: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimulationError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_steps_and_negative_horizon() {
        let steps = SimulationConfig {
            horizon_steps: 0,
            ..Default::default()
        };
        assert!(steps.validate().is_err());

        let years = SimulationConfig {
            horizon_years: -0.5,
            ..Default::default()
        };
        assert!(years.validate().is_err());

        let zero_years = SimulationConfig {
            horizon_years: 0.0,
            ..Default::default()
        };
        assert!(zero_years.validate().is_ok());
    }

    #[test]
    fn test_end_date_is_two_years_out() {
        let start = NaiveDate::from_ymd_opt(2020, 2, 29).unwrap();
        let request = SimulationRequest::new("AAPL", start);
        assert_eq!(
            request.end_date().unwrap(),
            NaiveDate::from_ymd_opt(2022, 2, 28).unwrap()
        );
    }
}
