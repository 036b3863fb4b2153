use std::fs::{self, File};
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use super::{Annotation, Band, Figure, Marker, PlotSeries, Renderer, TickLabel};
use crate::error::{LumiError, Result};

/// Writes a figure as plot-ready data: one CSV per series and a JSON manifest
/// carrying titles, colours, bands and annotations.
#[derive(Debug, Clone)]
pub struct CsvExport {
    out_dir: PathBuf,
}

#[derive(Serialize)]
struct SeriesEntry<'a> {
    #[serde(flatten)]
    series: &'a PlotSeries,
    points: usize,
    file: String,
}

#[derive(Serialize)]
struct Manifest<'a> {
    stem: &'a str,
    x_title: &'a str,
    y_title: &'a str,
    x_range: Option<(f64, f64)>,
    series: Vec<SeriesEntry<'a>>,
    bands: &'a [Band],
    ticks: &'a [TickLabel],
    annotations: &'a [Annotation],
    markers: &'a [Marker],
    inset_x_title: Option<&'a str>,
    inset_y_title: Option<&'a str>,
    inset_y_range: Option<(f64, f64)>,
    provenance: &'a serde_json::Value,
}

impl CsvExport {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn series_path(&self, figure: &Figure, series: &PlotSeries) -> PathBuf {
        self.out_dir.join(format!(
            "{}_{}_{}.csv",
            figure.stem,
            series.label,
            series.role.as_str()
        ))
    }

    pub fn manifest_path(&self, figure: &Figure) -> PathBuf {
        self.out_dir.join(format!("{}.json", figure.stem))
    }

    fn write_series(path: &Path, series: &PlotSeries) -> Result<()> {
        let export_err = |source| LumiError::Export {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = csv::Writer::from_path(path).map_err(export_err)?;
        for point in &series.points {
            writer.serialize(point).map_err(export_err)?;
        }
        writer.flush().map_err(|source| LumiError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Renderer for CsvExport {
    fn render(&mut self, figure: &Figure) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.out_dir).map_err(|source| LumiError::Write {
            path: self.out_dir.clone(),
            source,
        })?;

        let mut written = Vec::new();
        let mut entries = Vec::new();
        for series in figure.series.iter().filter(|s| !s.points.is_empty()) {
            let path = self.series_path(figure, series);
            Self::write_series(&path, series)?;
            entries.push(SeriesEntry {
                series,
                points: series.points.len(),
                file: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            });
            written.push(path);
        }

        let manifest = Manifest {
            stem: &figure.stem,
            x_title: &figure.x_title,
            y_title: &figure.y_title,
            x_range: figure.x_range,
            series: entries,
            bands: &figure.bands,
            ticks: &figure.ticks,
            annotations: &figure.annotations,
            markers: &figure.markers,
            inset_x_title: figure.inset_x_title.as_deref(),
            inset_y_title: figure.inset_y_title.as_deref(),
            inset_y_range: figure.inset_y_range,
            provenance: &figure.provenance,
        };
        let path = self.manifest_path(figure);
        let file = File::create(&path).map_err(|source| LumiError::Write {
            path: path.clone(),
            source,
        })?;
        serde_json::to_writer_pretty(file, &manifest).map_err(|source| LumiError::Manifest {
            path: path.clone(),
            source,
        })?;
        written.push(path);

        info!("wrote {} files for {}", written.len(), figure.stem);
        Ok(written)
    }
}
