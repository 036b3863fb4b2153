//! Luminosity of VdM fill 6868, with the fire-alarm period cut out.
//!
//! Expects `6868_<luminometer>.csv` in the working directory (normtags
//! hfet18PAS, hfoc18PAS, pcc18PAS, bcm1f18PAS, pltReproc18PAS).

use std::path::Path;

use anyhow::{Context, Result};
use lumi_figures::render::{CsvExport, Renderer};
use lumi_figures::scenario::{align_scenario, ScenarioConfig};

fn main() -> Result<()> {
    lumi_figures::init_logging();

    let config = ScenarioConfig::vdm_2018();
    let aligned = align_scenario(&config, Path::new(".")).context("aligning luminometers")?;
    CsvExport::new(".")
        .render(&aligned.figure(&config))
        .context("exporting figure data")?;
    Ok(())
}
