//! HFOC efficiency versus integrated luminosity from emittance scans.

use std::path::Path;

use anyhow::{Context, Result};
use lumi_figures::aging::{run_aging, AgingConfig};
use lumi_figures::render::{CsvExport, Renderer};

fn main() -> Result<()> {
    lumi_figures::init_logging();

    let config = AgingConfig::hfoc_2018();
    let result = run_aging(&config, Path::new(".")).context("reading aging points")?;
    CsvExport::new(".")
        .render(&result.figure(&config))
        .context("exporting figure data")?;
    Ok(())
}
