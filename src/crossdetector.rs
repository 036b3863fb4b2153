//! Integrated luminosity of the same period as measured by each normtag, and
//! how far each is from the average.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use log::info;
use serde::Serialize;

use crate::error::{LumiError, Result};

/// Summary block header written by `brilcalc lumi`.
const SUMMARY_HEADER: &str = "#nfill";
/// Column of the total in the line after the header.
const SUMMARY_TOTAL_FIELD: usize = 4;

#[derive(Debug, Clone, Serialize)]
pub struct CrossDetectorConfig {
    pub normtags: Vec<String>,
    /// Summary file name with a `{normtag}` placeholder.
    pub input_pattern: String,
}

impl CrossDetectorConfig {
    pub fn vdm_2018() -> Self {
        Self {
            normtags: ["hfoc18PAS", "hfet18PAS", "pcc18PAS", "bcm1f18PAS", "pltReproc18PAS"]
                .map(String::from)
                .to_vec(),
            input_pattern: "vdm2018_{normtag}.csv".into(),
        }
    }

    pub fn input_path(&self, data_dir: &Path, normtag: &str) -> PathBuf {
        data_dir.join(self.input_pattern.replace("{normtag}", normtag))
    }
}

/// Read the total from the `#nfill` block of a brilcalc summary export.
pub fn read_summary_total(path: &Path) -> Result<f64> {
    let file = File::open(path).map_err(|source| LumiError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(file);

    let mut records = reader.records();
    while let Some(record) = records.next() {
        let record = record.map_err(|source| LumiError::Read {
            origin: path.display().to_string(),
            source,
        })?;
        if !record.get(0).is_some_and(|f| f.starts_with(SUMMARY_HEADER)) {
            continue;
        }
        let totals_row = records.next().transpose().map_err(|source| LumiError::Read {
            origin: path.display().to_string(),
            source,
        })?;
        let total = totals_row
            .and_then(|r| r.get(SUMMARY_TOTAL_FIELD).and_then(|f| f.trim().parse::<f64>().ok()));
        return total.ok_or_else(|| LumiError::MissingSummary {
            path: path.to_path_buf(),
        });
    }
    Err(LumiError::MissingSummary {
        path: path.to_path_buf(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deviation {
    pub normtag: String,
    pub total: f64,
    /// Relative difference from the mean of all normtags, in percent.
    pub percent: f64,
}

impl fmt::Display for Deviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.3} {:+.1}%", self.normtag, self.total, self.percent)
    }
}

/// Deviations from the mean, ordered by normtag name.
pub fn compare(totals: &BTreeMap<String, f64>) -> Result<Vec<Deviation>> {
    if totals.is_empty() {
        return Err(LumiError::NoNormtags);
    }
    let mean = totals.values().sum::<f64>() / totals.len() as f64;
    Ok(totals
        .iter()
        .map(|(normtag, &total)| Deviation {
            normtag: normtag.clone(),
            total,
            percent: 100.0 * (total - mean) / mean,
        })
        .collect())
}

pub fn run_crossdetector(config: &CrossDetectorConfig, data_dir: &Path) -> Result<Vec<Deviation>> {
    let mut totals = BTreeMap::new();
    for normtag in &config.normtags {
        let total = read_summary_total(&config.input_path(data_dir, normtag))?;
        info!("{normtag}: total {total:.3}");
        totals.insert(normtag.clone(), total);
    }
    compare(&totals)
}
