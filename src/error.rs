use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a figure run.
///
/// Malformed lines and unmatched keys are deliberately absent: those are
/// logged and counted in [`SourceStats`](crate::data::model::SourceStats).
#[derive(Debug, Error)]
pub enum LumiError {
    /// An input file could not be opened.
    #[error("cannot open csv file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The underlying reader failed part way through a file.
    #[error("failed reading {origin}: {source}")]
    Read {
        origin: String,
        #[source]
        source: csv::Error,
    },

    /// An output file or directory could not be created.
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a series file failed.
    #[error("cannot export series to {}: {source}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Writing the figure manifest failed.
    #[error("cannot write manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The scenario names a primary source that is not in its source list.
    #[error("scenario {scenario}: primary source {primary} is not configured")]
    UnknownPrimary { scenario: String, primary: String },

    /// A brilcalc summary file has no `#nfill` block.
    #[error("no #nfill summary found in {}", path.display())]
    MissingSummary { path: PathBuf },

    /// A cross-detector comparison was requested without any normtag.
    #[error("no normtags configured")]
    NoNormtags,
}

pub type Result<T> = std::result::Result<T, LumiError>;
