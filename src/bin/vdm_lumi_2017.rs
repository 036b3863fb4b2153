//! Luminosity of VdM fill 6016 for all five luminometers.
//!
//! Expects `6016_<luminometer>.csv` in the working directory, produced by e.g.
//! `brilcalc lumi -f 6016 --byls -u hz/ub -b "STABLE BEAMS" -o 6016_HFET.csv --normtag hfet17v8`.

use std::path::Path;

use anyhow::{Context, Result};
use lumi_figures::render::{CsvExport, Renderer};
use lumi_figures::scenario::{align_scenario, ScenarioConfig};

fn main() -> Result<()> {
    lumi_figures::init_logging();

    let config = ScenarioConfig::vdm_2017();
    let aligned = align_scenario(&config, Path::new(".")).context("aligning luminometers")?;
    CsvExport::new(".")
        .render(&aligned.figure(&config))
        .context("exporting figure data")?;
    Ok(())
}
