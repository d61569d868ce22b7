//! Error types for the simulation core and its data collaborators.

use thiserror::Error;

/// Result type alias for simulation operations.
pub type Result<T> = std::result::Result<T, SimulationError>;

/// Everything that can end a simulation run.
///
/// All variants are terminal for the current run: nothing is retried and no
/// partial output is produced.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Historical window shorter than the estimation window requires.
    #[error("Insufficient data: need at least {required} observations, got {available}")]
    InsufficientData { required: usize, available: usize },

    /// Non-positive (or non-finite) price where a logarithm is needed.
    #[error("Invalid price {price} at index {index}")]
    InvalidPrice { index: usize, price: f64 },

    /// Simulation parameter outside its domain.
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// Upstream history provider failure, passed through as-is.
    #[error("Data unavailable: {message}")]
    DataUnavailable { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl SimulationError {
    /// Create an insufficient data error.
    pub fn insufficient_data(required: usize, available: usize) -> Self {
        Self::InsufficientData {
            required,
            available,
        }
    }

    /// Create an invalid price error.
    pub fn invalid_price(index: usize, price: f64) -> Self {
        Self::InvalidPrice { index, price }
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Create a data unavailable error.
    pub fn data_unavailable(message: impl Into<String>) -> Self {
        Self::DataUnavailable {
            message: message.into(),
        }
    }
}
