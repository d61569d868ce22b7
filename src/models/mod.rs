pub mod brownian;
pub mod monte_carlo;
pub mod percentiles;
pub mod returns;
pub mod series;
