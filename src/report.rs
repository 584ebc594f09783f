use crate::stats::{BoxSummary, Histogram, SortedSample};
use crate::utils::check_num;
use anyhow::{Context, Result};
use plotters::prelude::*;
use std::{
    fs,
    ops::Range,
    path::{Path, PathBuf},
};

const CHART_SIZE: (u32, u32) = (800, 600);
const HIST_BINS: usize = 20;
const HIST_ALPHA: f64 = 0.6;

/// Writes the console summary and the three charts of a simulation.
pub struct Reporter {
    out_dir: PathBuf,
}

impl Reporter {
    pub fn new<P: AsRef<Path>>(out_dir: P) -> Result<Self> {
        let out_dir = out_dir.as_ref().to_path_buf();
        fs::create_dir_all(&out_dir).with_context(|| format!("failed to create {out_dir:?}"))?;
        Ok(Self { out_dir })
    }

    pub fn histogram_file(&self) -> PathBuf {
        self.out_dir.join("histogram.svg")
    }

    pub fn exceedance_file(&self) -> PathBuf {
        self.out_dir.join("exceedance_curve.svg")
    }

    pub fn box_plot_file(&self) -> PathBuf {
        self.out_dir.join("box_plot.svg")
    }

    /// Print the reserve loss and render all charts.
    pub fn report(&self, aggregate_losses: &[f64], reserve: f64) -> Result<()> {
        check_num(reserve, 0.0..=1.0).context("invalid reserve percentile")?;
        let sample = SortedSample::new(aggregate_losses).context("failed to sort losses")?;

        let reserve_loss = sample.percentile(100.0 * reserve);
        println!("{reserve_loss:?}");
        println!("{}", percentile_line(reserve, reserve_loss));

        let hist = Histogram::new(&sample, HIST_BINS).context("failed to compute histogram")?;
        let file = self.histogram_file();
        draw_histogram(&file, &hist).with_context(|| format!("failed to draw {file:?}"))?;
        log::info!("saved {file:?}");

        let curve = sample.percentile_curve();
        let file = self.exceedance_file();
        draw_exceedance_curve(&file, &curve, loss_range(sample.min(), sample.max()))
            .with_context(|| format!("failed to draw {file:?}"))?;
        log::info!("saved {file:?}");

        let summary = sample.box_summary();
        let file = self.box_plot_file();
        draw_box_plot(&file, &summary, loss_range(sample.min(), sample.max()))
            .with_context(|| format!("failed to draw {file:?}"))?;
        log::info!("saved {file:?}");

        Ok(())
    }
}

/// Format the headline result, e.g. `80.0th Percentile Loss: 98765.4`.
pub fn percentile_line(reserve: f64, reserve_loss: f64) -> String {
    format!("{:?}th Percentile Loss: {reserve_loss:?}", reserve * 100.0)
}

/// Axis range spanning `[lo, hi]` with a 5 % margin.
fn loss_range(lo: f64, hi: f64) -> Range<f64> {
    let pad = if hi > lo { 0.05 * (hi - lo) } else { 0.5 };
    (lo - pad)..(hi + pad)
}

fn draw_histogram(file: &Path, hist: &Histogram) -> Result<()> {
    let root = SVGBackend::new(file, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (x_lo, x_hi) = hist
        .bins()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (left, right, _)| {
            (lo.min(left), hi.max(right))
        });
    let y_hi = 1.05 * hist.max_density();

    let mut chart = ChartBuilder::on(&root)
        .caption("Simulated Losses Histogram", ("sans-serif", 24).into_font())
        .margin(16)
        .x_label_area_size(48)
        .y_label_area_size(96)
        .build_cartesian_2d(x_lo..x_hi, 0.0..y_hi)?;

    chart
        .configure_mesh()
        .x_desc("Loss")
        .y_desc("Probability Density")
        .draw()?;

    chart.draw_series(hist.bins().map(|(left, right, density)| {
        Rectangle::new([(left, 0.0), (right, density)], BLUE.mix(HIST_ALPHA).filled())
    }))?;
    chart.draw_series(hist.bins().map(|(left, right, density)| {
        Rectangle::new([(left, 0.0), (right, density)], BLACK.stroke_width(1))
    }))?;

    root.present()?;
    Ok(())
}

fn draw_exceedance_curve(file: &Path, curve: &[(f64, f64)], y_range: Range<f64>) -> Result<()> {
    let root = SVGBackend::new(file, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Loss Exceedance Curve", ("sans-serif", 24).into_font())
        .margin(16)
        .x_label_area_size(48)
        .y_label_area_size(96)
        .build_cartesian_2d(0.0..1.0, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Percentile")
        .y_desc("Loss")
        .draw()?;

    chart.draw_series(LineSeries::new(curve.iter().copied(), &BLUE))?;
    chart.draw_series(
        curve
            .iter()
            .map(|&(prob, loss)| Circle::new((prob, loss), 2, BLUE.filled())),
    )?;

    root.present()?;
    Ok(())
}

fn draw_box_plot(file: &Path, summary: &BoxSummary, y_range: Range<f64>) -> Result<()> {
    // Horizontal extent of the single box on a unit-width axis.
    const CENTER: f64 = 0.5;
    const HALF_WIDTH: f64 = 0.15;
    const CAP_HALF_WIDTH: f64 = 0.075;

    let root = SVGBackend::new(file, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Annual Loss Expectancy", ("sans-serif", 24).into_font())
        .margin(16)
        .x_label_area_size(24)
        .y_label_area_size(96)
        .build_cartesian_2d(0.0..1.0, y_range)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(0)
        .y_desc("Loss")
        .draw()?;

    let (left, right) = (CENTER - HALF_WIDTH, CENTER + HALF_WIDTH);
    chart.draw_series(std::iter::once(Rectangle::new(
        [(left, summary.q1), (right, summary.q3)],
        BLACK.stroke_width(1),
    )))?;
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(left, summary.median), (right, summary.median)],
        RED.stroke_width(2),
    )))?;

    let whiskers = [
        (summary.q1, summary.whisker_lo),
        (summary.q3, summary.whisker_hi),
    ];
    chart.draw_series(whiskers.iter().map(|&(edge, end)| {
        PathElement::new(vec![(CENTER, edge), (CENTER, end)], BLACK.stroke_width(1))
    }))?;
    chart.draw_series(whiskers.iter().map(|&(_, end)| {
        PathElement::new(
            vec![(CENTER - CAP_HALF_WIDTH, end), (CENTER + CAP_HALF_WIDTH, end)],
            BLACK.stroke_width(1),
        )
    }))?;

    chart.draw_series(
        summary
            .outliers
            .iter()
            .map(|&loss| Circle::new((CENTER, loss), 3, BLACK.stroke_width(1))),
    )?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_line_keeps_decimal_point() {
        assert_eq!(percentile_line(0.8, 30.0), "80.0th Percentile Loss: 30.0");
        assert_eq!(
            percentile_line(0.5, 98765.4321),
            "50.0th Percentile Loss: 98765.4321"
        );
    }

    #[test]
    fn loss_range_pads_both_sides() {
        assert_eq!(loss_range(0.0, 100.0), -5.0..105.0);
        assert_eq!(loss_range(0.0, 0.0), -0.5..0.5);
    }

    #[test]
    fn report_writes_all_charts() {
        let out_dir = std::env::temp_dir().join("riskquant_report_writes_all_charts");
        fs::remove_dir_all(&out_dir).ok();

        let reporter = Reporter::new(&out_dir).unwrap();
        let losses: Vec<f64> = (0..500).map(|i| (i % 37) as f64 * 1000.0).collect();
        reporter.report(&losses, 0.8).unwrap();

        for (file, title) in [
            (reporter.histogram_file(), "Simulated Losses Histogram"),
            (reporter.exceedance_file(), "Loss Exceedance Curve"),
            (reporter.box_plot_file(), "Annual Loss Expectancy"),
        ] {
            let contents = fs::read_to_string(&file).unwrap();
            assert!(contents.contains("<svg"), "{file:?} is not an SVG");
            assert!(contents.contains(title), "{file:?} is missing {title:?}");
        }

        fs::remove_dir_all(&out_dir).ok();
    }

    #[test]
    fn report_rejects_bad_reserve() {
        let out_dir = std::env::temp_dir().join("riskquant_report_rejects_bad_reserve");
        fs::remove_dir_all(&out_dir).ok();

        let reporter = Reporter::new(&out_dir).unwrap();
        assert!(reporter.report(&[1.0, 2.0], 1.5).is_err());
        assert!(reporter.report(&[], 0.8).is_err());
        assert!(!reporter.histogram_file().exists());

        fs::remove_dir_all(&out_dir).ok();
    }
}
