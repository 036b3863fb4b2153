use std::fmt;

use csv::StringRecord;
use log::warn;
use serde::Serialize;

/// Number of comma-separated fields in a brilcalc `--byls` line.
pub const FIELD_COUNT: usize = 9;

/// Column positions inside a [`Record`].
pub mod column {
    pub const RUN_FILL: usize = 0;
    pub const LS_RANGE: usize = 1;
    pub const DELIVERED: usize = 5;
    pub const RECORDED: usize = 6;
    /// Aging exports put integrated luminosity in the second column and a
    /// value with its error in the last two.
    pub const AGING_X: usize = 1;
    pub const AGING_VALUE: usize = 7;
    pub const AGING_ERROR: usize = 8;
}

// ---------------------------------------------------------------------------
// IdentityKey – the (run:fill, LS range) pair shared by every luminometer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IdentityKey {
    pub run_fill: String,
    pub ls_range: String,
}

impl IdentityKey {
    pub fn new(run_fill: impl Into<String>, ls_range: impl Into<String>) -> Self {
        Self {
            run_fill: run_fill.into(),
            ls_range: ls_range.into(),
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.run_fill, self.ls_range)
    }
}

// ---------------------------------------------------------------------------
// Record – one accepted line of an input file
// ---------------------------------------------------------------------------

/// A single well-formed input line. Always holds exactly [`FIELD_COUNT`] fields.
#[derive(Debug, Clone)]
pub struct Record {
    /// Line number reported by the csv reader, for diagnostics only.
    pub line: u64,
    fields: StringRecord,
}

impl Record {
    /// Wrap a raw csv record. Returns `None` unless it has exactly
    /// [`FIELD_COUNT`] fields.
    pub fn from_fields(line: u64, fields: StringRecord) -> Option<Self> {
        (fields.len() == FIELD_COUNT).then_some(Self { line, fields })
    }

    pub fn key(&self) -> IdentityKey {
        IdentityKey::new(self.field(column::RUN_FILL), self.field(column::LS_RANGE))
    }

    pub fn field(&self, idx: usize) -> &str {
        self.fields.get(idx).unwrap_or("")
    }

    /// Parse a numeric field. Unparseable text reads as zero, which is what
    /// the brilcalc consumers downstream have always assumed.
    pub fn number(&self, idx: usize) -> f64 {
        let raw = self.field(idx).trim();
        match raw.parse::<f64>() {
            Ok(v) => v,
            Err(_) => {
                warn!(
                    "line {}: field {idx} '{raw}' is not a number, using 0",
                    self.line
                );
                0.0
            }
        }
    }

    pub fn delivered(&self) -> f64 {
        self.number(column::DELIVERED)
    }

}

// ---------------------------------------------------------------------------
// Series – ordered (position, value) points for one source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub position: usize,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series {
    pub points: Vec<Point>,
}

impl Series {
    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.points.iter().map(|p| p.position)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }
}

// ---------------------------------------------------------------------------
// AlignedSource – everything one luminometer contributes to a figure
// ---------------------------------------------------------------------------

/// Per-source bookkeeping, the only record of what was skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    /// Well-formed records read from the file.
    pub accepted: usize,
    /// Records whose key was found in the canonical index.
    pub aligned: usize,
    /// Records whose key was missing from the canonical index.
    pub unmatched: usize,
    /// Records removed by the cut window.
    pub cut: usize,
    /// Records outside both diversion bands.
    pub discarded: usize,
    /// Lines rejected by the reader.
    pub malformed: usize,
}

impl SourceStats {
    /// True when nothing was skipped for any reason.
    pub fn is_clean(&self) -> bool {
        self.unmatched == 0 && self.malformed == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlignedSource {
    pub name: String,
    pub series: Series,
    /// Present only for sources with a discontinuity diversion.
    pub diverted: Option<Series>,
    pub inset: Series,
    pub stats: SourceStats,
}

impl AlignedSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Main and diverted points together, main first.
    pub fn combined(&self) -> impl Iterator<Item = &Point> + '_ {
        self.series
            .points
            .iter()
            .chain(self.diverted.iter().flat_map(|s| s.points.iter()))
    }
}
