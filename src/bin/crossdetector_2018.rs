//! Compare the 2018 VdM integrated luminosity across normtags.
//!
//! Expects one summary per normtag, e.g.
//! `brilcalc lumi -u /nb -i vdm2018.json --normtag hfoc18PAS -o vdm2018_hfoc18PAS.csv`.

use std::path::Path;

use anyhow::{Context, Result};
use lumi_figures::crossdetector::{run_crossdetector, CrossDetectorConfig};

fn main() -> Result<()> {
    lumi_figures::init_logging();

    let config = CrossDetectorConfig::vdm_2018();
    let deviations = run_crossdetector(&config, Path::new(".")).context("comparing normtags")?;
    for deviation in &deviations {
        println!("{deviation}");
    }
    Ok(())
}
