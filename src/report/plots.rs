// ============================================================
// Layer 7 - Plots
// ============================================================
// Three diagnostic charts, rendered to SVG:
//
//   plot_latest_aqi_bar       latest reading per city, one bar each
//   plot_actual_vs_predicted  held-out targets vs predictions, y = x line
//   plot_error_histogram      predicted - actual, 40 bins
//
// Each public function creates the parent directory, draws
// through a private helper that speaks plotters' error types
// and maps any failure into AqiError::Plot.

use std::{error::Error, fs, path::Path};

use plotters::prelude::*;

use crate::domain::error::{AqiError, Result};
use crate::domain::reading::Reading;

pub const HISTOGRAM_BINS: usize = 40;

const SIZE: (u32, u32) = (900, 600);
const FONT: &str = "sans-serif";

/// Bar chart of the latest AQI for every city that has one,
/// sorted by AQI ascending. Returns the number of bars drawn;
/// with no valid AQI nothing is written.
pub fn plot_latest_aqi_bar(latest: &[Reading], path: &Path) -> Result<usize> {
    let mut bars: Vec<(String, f64)> = latest
        .iter()
        .filter_map(|r| r.aqi.filter(|v| v.is_finite()).map(|v| (r.city.clone(), v)))
        .collect();
    if bars.is_empty() {
        tracing::warn!("No city has a valid AQI; skipping bar chart");
        return Ok(0);
    }
    bars.sort_by(|a, b| a.1.total_cmp(&b.1));

    prepare(path)?;
    draw_bar(&bars, path).map_err(plot_error)?;
    tracing::info!("Bar chart written to '{}'", path.display());
    Ok(bars.len())
}

/// Scatter of actual vs predicted with the MAE in the caption.
pub fn plot_actual_vs_predicted(
    actual:    &[f64],
    predicted: &[f64],
    mae:       f64,
    title:     &str,
    path:      &Path,
) -> Result<()> {
    check_pairs(actual, predicted)?;
    prepare(path)?;
    draw_scatter(actual, predicted, mae, title, path).map_err(plot_error)?;
    tracing::info!("Scatter plot written to '{}'", path.display());
    Ok(())
}

/// Histogram of `predicted - actual`.
pub fn plot_error_histogram(actual: &[f64], predicted: &[f64], title: &str, path: &Path) -> Result<()> {
    check_pairs(actual, predicted)?;
    let errors: Vec<f64> = predicted.iter().zip(actual).map(|(p, a)| p - a).collect();
    let bins = histogram(&errors, HISTOGRAM_BINS);

    prepare(path)?;
    draw_histogram(&bins, title, path).map_err(plot_error)?;
    tracing::info!("Error histogram written to '{}'", path.display());
    Ok(())
}

// ─── Binning ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width bins spanning [min, max]. The last bin is closed.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }

    let mut lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;

    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            lower: lo + width * i as f64,
            upper: lo + width * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for v in finite {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

// ─── Drawing ──────────────────────────────────────────────────────────────────
fn draw_bar(bars: &[(String, f64)], path: &Path) -> std::result::Result<(), Box<dyn Error>> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let n     = bars.len() as u32;
    let y_max = bars.iter().map(|(_, v)| *v).fold(1.0_f64, f64::max) * 1.15;

    let mut chart = ChartBuilder::on(&root)
        .caption("Latest AQI per city", (FONT, 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((0u32..n).into_segmented(), 0f64..y_max)?;

    let label = |x: &SegmentValue<u32>| match x {
        SegmentValue::CenterOf(i) => bars
            .get(*i as usize)
            .map(|(city, _)| city.clone())
            .unwrap_or_default(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&label)
        .x_desc("City")
        .y_desc("AQI")
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, (_, v))| {
        let i = i as u32;
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *v)],
            BLUE.mix(0.6).filled(),
        );
        bar.set_margin(0, 0, 8, 8);
        bar
    }))?;

    chart.draw_series(bars.iter().enumerate().map(|(i, (_, v))| {
        Text::new(
            format!("{v:.0}"),
            (SegmentValue::CenterOf(i as u32), v + y_max * 0.03),
            (FONT, 15),
        )
    }))?;

    root.present()?;
    Ok(())
}

fn draw_scatter(
    actual:    &[f64],
    predicted: &[f64],
    mae:       f64,
    title:     &str,
    path:      &Path,
) -> std::result::Result<(), Box<dyn Error>> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (lo, hi) = padded_range(actual.iter().chain(predicted));

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{title}: actual vs predicted (MAE {mae:.4})"), (FONT, 26))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(lo..hi, lo..hi)?;

    chart
        .configure_mesh()
        .x_desc("Actual")
        .y_desc("Predicted")
        .draw()?;

    chart.draw_series(
        actual
            .iter()
            .zip(predicted)
            .map(|(&a, &p)| Circle::new((a, p), 3, BLUE.mix(0.5).filled())),
    )?;

    chart
        .draw_series(LineSeries::new(vec![(lo, lo), (hi, hi)], &RED))?
        .label("y = x")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_histogram(bins: &[Bin], title: &str, path: &Path) -> std::result::Result<(), Box<dyn Error>> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let lo    = bins.first().map_or(-1.0, |b| b.lower);
    let hi    = bins.last().map_or(1.0, |b| b.upper);
    let y_max = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1) as f64 * 1.1;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{title}: prediction error"), (FONT, 26))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(lo..hi, 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Predicted - actual")
        .y_desc("Count")
        .draw()?;

    chart.draw_series(bins.iter().map(|b| {
        Rectangle::new([(b.lower, 0.0), (b.upper, b.count as f64)], GREEN.mix(0.6).filled())
    }))?;

    root.present()?;
    Ok(())
}

// ─── Helpers ──────────────────────────────────────────────────────────────────
fn prepare(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn check_pairs(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return Err(AqiError::Data(format!(
            "cannot plot {} actual against {} predicted values",
            actual.len(),
            predicted.len()
        )));
    }
    Ok(())
}

fn padded_range<'a>(values: impl Iterator<Item = &'a f64>) -> (f64, f64) {
    let (lo, hi) = values
        .copied()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((hi - lo) * 0.05).max(0.5);
    (lo - pad, hi + pad)
}

fn plot_error(e: Box<dyn Error>) -> AqiError {
    AqiError::Plot(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(city: &str, aqi: Option<f64>) -> Reading {
        let mut r = Reading::new(city, "2024-05-01T12:00:00Z");
        r.aqi = aqi;
        r
    }

    #[test]
    fn test_histogram_bins() {
        let bins = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 4);
        assert_eq!(bins.len(), 4);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 5);
        // max value lands in the last, closed bin
        assert_eq!(bins[3].count, 2);
        assert_eq!(bins[0].lower, 0.0);
        assert_eq!(bins[3].upper, 4.0);
    }

    #[test]
    fn test_histogram_constant_and_empty() {
        let bins = histogram(&[2.0, 2.0], HISTOGRAM_BINS);
        assert_eq!(bins.len(), HISTOGRAM_BINS);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
        assert!(histogram(&[], HISTOGRAM_BINS).is_empty());
    }

    #[test]
    fn test_bar_chart_skips_missing_aqi() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots").join("latest_aqi.svg");
        let latest = vec![
            reading("tehran", Some(153.0)),
            reading("ahvaz", None),
            reading("isfahan", Some(88.0)),
        ];

        assert_eq!(plot_latest_aqi_bar(&latest, &path).unwrap(), 2);
        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("153"));
    }

    #[test]
    fn test_bar_chart_with_nothing_to_draw() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest_aqi.svg");
        assert_eq!(plot_latest_aqi_bar(&[reading("ahvaz", None)], &path).unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_scatter_and_histogram_files() {
        let dir       = tempfile::tempdir().unwrap();
        let actual    = [1.0, 2.0, 3.0, 4.0];
        let predicted = [1.1, 1.8, 3.3, 3.9];

        let scatter = dir.path().join("m_actual_vs_pred.svg");
        plot_actual_vs_predicted(&actual, &predicted, 0.15, "m", &scatter).unwrap();
        assert!(scatter.exists());

        let hist = dir.path().join("m_error_hist.svg");
        plot_error_histogram(&actual, &predicted, "m", &hist).unwrap();
        assert!(hist.exists());
    }

    #[test]
    fn test_mismatched_lengths() {
        let dir = tempfile::tempdir().unwrap();
        let result = plot_error_histogram(&[1.0], &[], "m", &dir.path().join("h.svg"));
        assert!(matches!(result, Err(AqiError::Data(_))));
    }
}
