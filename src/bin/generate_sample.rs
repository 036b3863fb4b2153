use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use lumi_figures::aging::AgingConfig;
use lumi_figures::crossdetector::CrossDetectorConfig;
use lumi_figures::scenario::ScenarioConfig;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// A fill as a list of (run number, number of LS).
struct Fill {
    number: u32,
    runs: Vec<(u32, u32)>,
    peak: f64,
    lifetime_ls: f64,
    start_time: u64,
}

impl Fill {
    /// (position, run, ls) for every LS of the fill.
    fn sections(&self) -> Vec<(usize, u32, u32)> {
        let mut out = Vec::new();
        for &(run, nls) in &self.runs {
            for ls in 1..=nls {
                out.push((out.len(), run, ls));
            }
        }
        out
    }
}

/// Per-luminometer calibration offset and noise.
fn detector_response(name: &str) -> (f64, f64) {
    match name {
        "HFET" => (1.000, 0.004),
        "HFOC" => (0.995, 0.006),
        "PLT" => (1.004, 0.005),
        "BCM1F" => (0.992, 0.008),
        "PCC" => (1.002, 0.003),
        _ => (1.0, 0.005),
    }
}

fn write_byls(
    path: &Path,
    fill: &Fill,
    detector: &str,
    rng: &mut SimpleRng,
    keep: impl Fn(usize) -> bool,
) -> Result<usize> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    let (scale, noise) = detector_response(detector);

    writeln!(out, "#Data tag : v1 , Norm tag: {}", detector.to_lowercase())?;
    writeln!(
        out,
        "#run:fill,ls,time,beamstatus,E(GeV),delivered(hz/ub),recorded(hz/ub),avgpu,source"
    )?;
    let mut written = 0;
    for (position, run, ls) in fill.sections() {
        if !keep(position) {
            continue;
        }
        let decay = (-(position as f64) / fill.lifetime_ls).exp();
        let delivered = (fill.peak * scale * decay + rng.gauss(0.0, noise)).max(0.0);
        let recorded = delivered * 0.97;
        let time = fill.start_time + 23 * position as u64;
        writeln!(
            out,
            "{run}:{},{ls}:{ls},{time},STABLE BEAMS,6500,{delivered:.6},{recorded:.6},{:.2},{detector}",
            fill.number,
            delivered * 4.7
        )?;
        written += 1;
    }
    writeln!(out, "#Summary:")?;
    out.flush()?;
    Ok(written)
}

fn write_scenario(config: &ScenarioConfig, fill: &Fill, rng: &mut SimpleRng) -> Result<()> {
    for source in &config.sources {
        let path = config.input_path(Path::new("."), &source.name);
        let written = match source.diversion {
            // Leave a hole after the high threshold, as the real PCC data has.
            Some(d) => write_byls(&path, fill, &source.name, rng, |p| p < d.high + 5 || p > d.high + 60)?,
            None => write_byls(&path, fill, &source.name, rng, |_| true)?,
        };
        println!("Wrote {written} LS to {}", path.display());
    }
    Ok(())
}

fn write_aging(config: &AgingConfig, rng: &mut SimpleRng) -> Result<()> {
    let path = config.input_path(Path::new("."));
    let mut out = BufWriter::new(File::create(&path).with_context(|| format!("creating {}", path.display()))?);
    writeln!(out, "fill,intlumi,nls,ncms,delivered,recorded,avgpu,efficiency,error")?;
    for i in 0..35 {
        let x = 5.0 + 4.8 * i as f64;
        let eff = 1.0 - 0.0011 * x + rng.gauss(0.0, 0.004);
        writeln!(out, "{},{x:.3},0,0,0,0,0,{eff:.5},0.005", 6500 + i)?;
    }
    out.flush()?;
    println!("Wrote 35 aging points to {}", path.display());
    Ok(())
}

fn write_summaries(config: &CrossDetectorConfig, rng: &mut SimpleRng) -> Result<()> {
    for normtag in &config.normtags {
        let path = config.input_path(Path::new("."), normtag);
        let mut out = BufWriter::new(File::create(&path).with_context(|| format!("creating {}", path.display()))?);
        let total = 805.9 * (1.0 + rng.gauss(0.0, 0.005));
        writeln!(out, "#Data tag : v1 , Norm tag: {normtag}")?;
        writeln!(out, "#run:fill,time,nls,ncms,delivered(/nb),recorded(/nb)")?;
        writeln!(out, "318982:6868,07/01/18 05:04:57,1234,1230,{total:.3},{:.3}", total * 0.97)?;
        writeln!(out, "#Summary:")?;
        writeln!(out, "#nfill,nrun,nls,ncms,totdelivered(/nb),totrecorded(/nb)")?;
        writeln!(out, "#1,1,1234,1230,{total:.3},{:.3}", total * 0.97)?;
        out.flush()?;
        println!("Wrote summary for {normtag} to {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let fill_6016 = Fill {
        number: 6016,
        runs: vec![(300027, 600), (300043, 900), (300050, 1000)],
        peak: 3.2,
        lifetime_ls: 20_000.0,
        start_time: 1_501_000_000,
    };
    write_scenario(&ScenarioConfig::vdm_2017(), &fill_6016, &mut rng)?;

    let fill_6868 = Fill {
        number: 6868,
        runs: vec![(318982, 400), (318983, 400), (319018, 1000), (319019, 2200)],
        peak: 9.5,
        lifetime_ls: 30_000.0,
        start_time: 1_530_400_000,
    };
    write_scenario(&ScenarioConfig::vdm_2018(), &fill_6868, &mut rng)?;

    write_aging(&AgingConfig::hfoc_2018(), &mut rng)?;
    write_summaries(&CrossDetectorConfig::vdm_2018(), &mut rng)?;
    Ok(())
}
