use std::path::Path;

use log::info;
use plotters::prelude::*;

use crate::config::SimulationConfig;
use crate::models::brownian::gbm_price;
use crate::models::monte_carlo::SimulationRun;
use crate::report::OutputTable;

fn column_points(table: &OutputTable, column: usize) -> Vec<(f64, f64)> {
    table
        .rows()
        .iter()
        .enumerate()
        .filter_map(|(i, row)| row.values()[column].map(|v| (i as f64, v)))
        .collect()
}

/// Close history with the simulated percentile bands and the closed-form
/// GBM median, written as a PNG.
pub fn plot_percentile_bands(
    run: &SimulationRun,
    config: &SimulationConfig,
    title: &str,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = &run.table;
    if table.is_empty() {
        return Err("nothing to plot".into());
    }

    let root = BitMapBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut min_price = f64::INFINITY;
    let mut max_price = f64::NEG_INFINITY;
    for row in table.rows() {
        for v in row.values().into_iter().flatten() {
            min_price = min_price.min(v);
            max_price = max_price.max(v);
        }
    }
    let margin = ((max_price - min_price) * 0.1).max(max_price.abs() * 0.01);
    min_price -= margin;
    max_price += margin;

    let last_index = (table.len() - 1).max(1) as f64;
    let dates: Vec<String> = table.rows().iter().map(|r| r.date.to_string()).collect();

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(40)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..last_index, min_price..max_price)?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Price")
        .x_labels(8)
        .x_label_formatter(&|x: &f64| {
            dates
                .get(x.round() as usize)
                .cloned()
                .unwrap_or_default()
        })
        .draw()?;

    chart
        .draw_series(LineSeries::new(column_points(table, 3), BLACK.stroke_width(2)))?
        .label("Close")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.stroke_width(2)));

    let bands = [
        (0, "5th Percentile", RED.mix(0.7)),
        (1, "Median", BLUE.mix(0.9)),
        (2, "95th Percentile", GREEN.mix(0.7)),
    ];
    for (column, label, color) in bands {
        chart
            .draw_series(LineSeries::new(column_points(table, column), color.stroke_width(2)))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    // Closed-form median on the simulated rows; they are the rows carrying a band.
    let dt = config.horizon_years / config.horizon_steps as f64;
    let (mu, sigma) = (run.parameters.drift, run.parameters.volatility);
    let mut analytic = Vec::with_capacity(run.percentiles.len());
    for (step, (i, _)) in table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, r)| r.median.is_some())
        .enumerate()
    {
        let t = step as f64 * dt;
        let price = if t > 0.0 {
            gbm_price(run.starting_price, mu, sigma, t, 0.5)?
        } else {
            run.starting_price
        };
        analytic.push((i as f64, price));
    }

    chart
        .draw_series(LineSeries::new(analytic, MAGENTA.mix(0.5).stroke_width(1)))?
        .label("GBM Median")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], MAGENTA.mix(0.5).stroke_width(1)));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    info!("percentile chart saved to {}", path.display());
    Ok(())
}
