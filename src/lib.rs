//! Monte Carlo price-path bands for a single instrument.
//!
//! Drift and volatility are estimated from a prefix window of daily closes,
//! geometric Brownian motion paths are simulated forward from the last close
//! of that window, and each time step is reduced to its 5th, 50th and 95th
//! percentiles. The bands are laid on business days and merged with the
//! history into an [`report::OutputTable`].

pub mod config;
pub mod data_fetch;
pub mod error;
pub mod models;
pub mod report;
pub mod visualisations;

pub use config::{SimulationConfig, SimulationRequest};
pub use error::{Result, SimulationError};
pub use models::monte_carlo::{run_simulation, run_with_config, simulate_instrument, SimulationRun};
pub use models::series::{HistoricalSeries, PricePoint};
pub use report::{OutputRow, OutputTable, COLUMNS};
