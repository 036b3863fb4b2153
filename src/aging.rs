//! HF aging figure: relative detector efficiency against integrated
//! luminosity, with a straight-line fit.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;
use serde_json::json;

use crate::color::resolve_colors;
use crate::data::loader::{open_records, LinePolicy};
use crate::data::model::{column, Record};
use crate::error::Result;
use crate::render::{Annotation, Figure, Marker, PlotPoint, PlotSeries, SeriesRole};

#[derive(Debug, Clone, Serialize)]
pub struct AgingConfig {
    pub name: String,
    pub input: String,
    pub detector: String,
    /// Inclusive x range used for the fit.
    pub fit_range: (f64, f64),
    /// Integrated luminosity at which the VdM scan took place.
    pub scan_marker: Option<Marker>,
    pub label: Option<Annotation>,
    pub color: String,
    pub fit_color: String,
    pub output_stem: String,
}

impl AgingConfig {
    pub fn hfoc_2018() -> Self {
        Self {
            name: "hfoc-aging-2018".into(),
            input: "HFOCAging.csv".into(),
            detector: "HFOC".into(),
            fit_range: (97.0, 167.0),
            scan_marker: Some(Marker {
                x: 121.658,
                y_from: 0.9,
                y_to: 1.1,
                label: "2018 VdM scan".into(),
            }),
            label: Some(Annotation {
                x: 140.0,
                y: 1.1,
                text: "CMS Preliminary".into(),
            }),
            color: "blue".into(),
            fit_color: "red".into(),
            output_stem: "HFOCAging2018".into(),
        }
    }

    pub fn input_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.input)
    }
}

/// Result of a straight-line chi-square fit `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub slope_err: f64,
    pub intercept_err: f64,
    pub chi2: f64,
    pub ndf: usize,
    /// Whether the point uncertainties were used as weights.
    pub weighted: bool,
}

impl LinearFit {
    pub fn eval(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// x = integrated luminosity, y = relative efficiency with its uncertainty.
pub fn read_aging_points<I>(records: I) -> Result<Vec<PlotPoint>>
where
    I: IntoIterator<Item = Result<Record>>,
{
    records
        .into_iter()
        .map(|record| {
            let record = record?;
            Ok(PlotPoint {
                x: record.number(column::AGING_X),
                y: record.number(column::AGING_VALUE),
                y_err: Some(record.number(column::AGING_ERROR)),
            })
        })
        .collect()
}

/// Fit a straight line to the points with `range.0 <= x <= range.1`.
///
/// Points are weighted by `1/σ²`. If any point in range has no positive
/// uncertainty all points get unit weight and the parameter errors are scaled
/// by the fit quality instead. Returns `None` with fewer than two points or
/// when all x coincide.
pub fn fit_linear(points: &[PlotPoint], range: (f64, f64)) -> Option<LinearFit> {
    let selected: Vec<&PlotPoint> = points
        .iter()
        .filter(|p| p.x >= range.0 && p.x <= range.1)
        .collect();
    if selected.len() < 2 {
        return None;
    }

    let weighted = selected
        .iter()
        .all(|p| p.y_err.is_some_and(|e| e > 0.0));
    let weight = |p: &PlotPoint| match (weighted, p.y_err) {
        (true, Some(e)) => 1.0 / (e * e),
        _ => 1.0,
    };

    let (mut s, mut sx, mut sy, mut sxx, mut sxy) = (0.0_f64, 0.0_f64, 0.0_f64, 0.0_f64, 0.0_f64);
    for p in &selected {
        let w = weight(*p);
        s += w;
        sx += w * p.x;
        sy += w * p.y;
        sxx += w * p.x * p.x;
        sxy += w * p.x * p.y;
    }
    let delta = s * sxx - sx * sx;
    if delta.abs() <= f64::EPSILON * s * sxx.abs().max(1.0) {
        return None;
    }

    let intercept = (sxx * sy - sx * sxy) / delta;
    let slope = (s * sxy - sx * sy) / delta;
    let chi2: f64 = selected
        .iter()
        .map(|p| {
            let r = p.y - intercept - slope * p.x;
            weight(*p) * r * r
        })
        .sum();
    let ndf = selected.len() - 2;

    let mut slope_var = s / delta;
    let mut intercept_var = sxx / delta;
    if !weighted && ndf > 0 {
        let scale = chi2 / ndf as f64;
        slope_var *= scale;
        intercept_var *= scale;
    }

    Some(LinearFit {
        slope,
        intercept,
        slope_err: slope_var.sqrt(),
        intercept_err: intercept_var.sqrt(),
        chi2,
        ndf,
        weighted,
    })
}

#[derive(Debug, Clone)]
pub struct AgingResult {
    pub points: Vec<PlotPoint>,
    pub fit: Option<LinearFit>,
    pub malformed: usize,
}

pub fn run_aging(config: &AgingConfig, data_dir: &Path) -> Result<AgingResult> {
    let mut reader = open_records(&config.input_path(data_dir), LinePolicy::NumericOnly)?;
    let points = read_aging_points(reader.by_ref())?;
    let malformed = reader.malformed();
    info!("Processed {} points for {}", points.len(), config.detector);

    let fit = fit_linear(&points, config.fit_range);
    match &fit {
        Some(fit) => info!(
            "linear fit over [{}, {}]: slope {:.5} ± {:.5}, intercept {:.4} ± {:.4}, chi2/ndf {:.2}/{}",
            config.fit_range.0,
            config.fit_range.1,
            fit.slope,
            fit.slope_err,
            fit.intercept,
            fit.intercept_err,
            fit.chi2,
            fit.ndf
        ),
        None => warn!(
            "{}: not enough distinct points in [{}, {}] for a fit",
            config.name, config.fit_range.0, config.fit_range.1
        ),
    }

    Ok(AgingResult {
        points,
        fit,
        malformed,
    })
}

impl AgingResult {
    pub fn figure(&self, config: &AgingConfig) -> Figure {
        let colors = resolve_colors(&[Some(config.color.as_str()), Some(config.fit_color.as_str())]);
        let mut series = vec![PlotSeries {
            label: config.detector.clone(),
            role: SeriesRole::Points,
            color: colors[0].clone(),
            points: self.points.clone(),
        }];
        if let Some(fit) = &self.fit {
            let (from, to) = config.fit_range;
            series.push(PlotSeries {
                label: "linear-fit".into(),
                role: SeriesRole::Fit,
                color: colors[1].clone(),
                points: vec![
                    PlotPoint::new(from, fit.eval(from)),
                    PlotPoint::new(to, fit.eval(to)),
                ],
            });
        }

        Figure {
            stem: config.output_stem.clone(),
            x_title: "Integrated luminosity (fb⁻¹)".into(),
            y_title: format!("Relative efficiency ({})", config.detector),
            series,
            annotations: config.label.iter().cloned().collect(),
            markers: config.scan_marker.iter().cloned().collect(),
            provenance: json!({
                "scenario": config,
                "fit": self.fit,
                "malformed": self.malformed,
            }),
            ..Default::default()
        }
    }
}
