/// Renderer seam: the cleaned data plus the cosmetic details a drawing backend
/// needs, and the backends that consume it.
pub mod export;

use std::path::PathBuf;

use serde::Serialize;

use crate::error::Result;

pub use export::CsvExport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeriesRole {
    /// Drawn as a line on the main pad.
    Main,
    /// Second, unconnected segment of a main series.
    Diverted,
    /// Drawn in the zoomed inset pad.
    Inset,
    /// Points with error bars.
    Points,
    /// A fitted curve.
    Fit,
}

impl SeriesRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesRole::Main => "main",
            SeriesRole::Diverted => "diverted",
            SeriesRole::Inset => "inset",
            SeriesRole::Points => "points",
            SeriesRole::Fit => "fit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
    pub y_err: Option<f64>,
}

impl PlotPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, y_err: None }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlotSeries {
    pub label: String,
    pub role: SeriesRole,
    /// `#rrggbb`.
    pub color: String,
    #[serde(skip)]
    pub points: Vec<PlotPoint>,
}

/// Shaded x range drawn behind the main series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Band {
    pub from: f64,
    pub to: f64,
}

/// Axis label override at a given x.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickLabel {
    pub at: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

/// Vertical marker line, e.g. the date of a scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub x: f64,
    pub y_from: f64,
    pub y_to: f64,
    pub label: String,
}

/// Everything needed to draw one figure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Figure {
    /// File name without extension.
    pub stem: String,
    pub x_title: String,
    pub y_title: String,
    pub x_range: Option<(f64, f64)>,
    pub series: Vec<PlotSeries>,
    pub bands: Vec<Band>,
    pub ticks: Vec<TickLabel>,
    pub annotations: Vec<Annotation>,
    pub markers: Vec<Marker>,
    pub inset_x_title: Option<String>,
    pub inset_y_title: Option<String>,
    pub inset_y_range: Option<(f64, f64)>,
    /// Configuration and bookkeeping that produced the figure.
    pub provenance: serde_json::Value,
}

impl Figure {
    pub fn series_with_role(&self, role: SeriesRole) -> impl Iterator<Item = &PlotSeries> + '_ {
        self.series.iter().filter(move |s| s.role == role)
    }
}

/// A drawing backend. Returns the files it produced.
pub trait Renderer {
    fn render(&mut self, figure: &Figure) -> Result<Vec<PathBuf>>;
}
