use rayon::prelude::*;

use crate::error::{Result, SimulationError};
use crate::models::brownian::PathEnsemble;

/// Ranks reported for every time step, in column order.
pub const PERCENTILE_RANKS: [f64; 3] = [5.0, 50.0, 95.0];

/// Rank `p` (0..=100) of `data` by linear interpolation between order
/// statistics. Identical inputs come back unchanged, bit for bit.
pub fn percentile(data: &[f64], p: f64) -> Result<f64> {
    if data.is_empty() {
        return Err(SimulationError::invalid_parameter("percentile of empty data"));
    }
    if !(0.0..=100.0).contains(&p) {
        return Err(SimulationError::invalid_parameter(format!(
            "percentile rank must lie in [0, 100], got {p}"
        )));
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Ok(interpolate(&sorted, p))
}

fn interpolate(sorted: &[f64], p: f64) -> f64 {
    let idx = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    let frac = idx - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// {p5, p50, p95} for one time step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentileRow {
    pub p5: f64,
    pub median: f64,
    pub p95: f64,
}

/// One [`PercentileRow`] per time step of the ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct PercentileTable {
    rows: Vec<PercentileRow>,
}

impl PercentileTable {
    pub fn rows(&self) -> &[PercentileRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&PercentileRow> {
        self.rows.last()
    }
}

/// Reduce each ensemble row to its percentile band. Rows are independent and
/// reduced in parallel; output order follows the time steps.
pub fn reduce_percentiles(ensemble: &PathEnsemble) -> PercentileTable {
    let rows = (0..ensemble.num_timesteps())
        .into_par_iter()
        .map(|t| {
            let mut values = ensemble.row(t);
            values.sort_by(|a, b| a.total_cmp(b));
            let [p5, median, p95] = PERCENTILE_RANKS.map(|p| interpolate(&values, p));
            PercentileRow { p5, median, p95 }
        })
        .collect();
    PercentileTable { rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::brownian::simulate_paths;
    use crate::models::returns::ModelParameters;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_linear_interpolation() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&data, 50.0).unwrap(), 3.0);
        assert!((percentile(&data, 5.0).unwrap() - 1.2).abs() < 1e-12);
        assert!((percentile(&data, 95.0).unwrap() - 4.8).abs() < 1e-12);
        assert_eq!(percentile(&[4.0, 1.0], 50.0).unwrap(), 2.5);
    }

    #[test]
    fn test_identical_values_are_exact() {
        let data = vec![101.37; 7];
        for p in PERCENTILE_RANKS {
            assert_eq!(percentile(&data, p).unwrap(), 101.37);
        }
        assert_eq!(percentile(&[3.3], 95.0).unwrap(), 3.3);
    }

    #[test]
    fn test_rejects_empty_and_out_of_range() {
        assert!(percentile(&[], 50.0).is_err());
        assert!(percentile(&[1.0], 101.0).is_err());
    }

    #[test]
    fn test_table_is_monotonic_and_anchored() {
        let params = ModelParameters {
            drift: 0.08,
            volatility: 0.35,
        };
        for sims in [1, 2, 17, 500] {
            let mut rng = StdRng::seed_from_u64(sims as u64);
            let ensemble = simulate_paths(87.5, &params, 1.0, 40, sims, &mut rng).unwrap();
            let table = reduce_percentiles(&ensemble);

            assert_eq!(table.len(), 40);
            let first = table.rows()[0];
            assert_eq!(first.p5, 87.5);
            assert_eq!(first.median, 87.5);
            assert_eq!(first.p95, 87.5);
            for row in table.rows() {
                assert!(row.p5 <= row.median && row.median <= row.p95);
            }
        }
    }

    #[test]
    fn test_matches_scalar_percentile_per_row() {
        let params = ModelParameters {
            drift: 0.0,
            volatility: 0.2,
        };
        let mut rng = StdRng::seed_from_u64(11);
        let ensemble = simulate_paths(20.0, &params, 0.5, 12, 33, &mut rng).unwrap();
        let table = reduce_percentiles(&ensemble);
        for (t, row) in table.rows().iter().enumerate() {
            let values = ensemble.row(t);
            assert_eq!(row.p5, percentile(&values, 5.0).unwrap());
            assert_eq!(row.median, percentile(&values, 50.0).unwrap());
            assert_eq!(row.p95, percentile(&values, 95.0).unwrap());
        }
    }
}
