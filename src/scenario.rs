//! VdM fill luminosity figures: which luminometers to read, how to clean
//! them, and how the result is presented.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;
use serde_json::json;

use crate::color::resolve_colors;
use crate::data::align::{align_primary, align_source};
use crate::data::index::CanonicalIndex;
use crate::data::loader::{open_records, LinePolicy};
use crate::data::model::{AlignedSource, IdentityKey, Series};
use crate::data::rules::{CleaningRules, CutWindow, Diversion, PositionWindow};
use crate::error::{LumiError, Result};
use crate::render::{Annotation, Band, Figure, PlotPoint, PlotSeries, SeriesRole, TickLabel};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SourceConfig {
    pub name: String,
    /// `#rrggbb` or a colour name; a palette colour is used when absent.
    pub color: Option<String>,
    pub diversion: Option<Diversion>,
}

impl SourceConfig {
    pub fn new(name: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            color: Some(color.to_string()),
            diversion: None,
        }
    }

    pub fn diverted(mut self, diversion: Diversion) -> Self {
        self.diversion = Some(diversion);
        self
    }
}

/// Shaded region between two LS, e.g. the periods used for a comparison.
#[derive(Debug, Clone, Serialize)]
pub struct Highlight {
    pub from: IdentityKey,
    pub to: IdentityKey,
}

impl Highlight {
    pub fn new(from: (&str, &str), to: (&str, &str)) -> Self {
        Self {
            from: IdentityKey::new(from.0, from.1),
            to: IdentityKey::new(to.0, to.1),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Cosmetics {
    pub x_title: String,
    pub y_title: String,
    pub inset_x_title: Option<String>,
    pub inset_y_title: Option<String>,
    pub label: Option<Annotation>,
    pub x_range: Option<(f64, f64)>,
    /// Relabel every `tick_step` display positions with the true LS number.
    pub tick_step: Option<usize>,
    pub inset_y_range: Option<(f64, f64)>,
}

/// One figure's worth of inputs, rules and presentation.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioConfig {
    pub name: String,
    /// Input file name with a `{source}` placeholder.
    pub input_pattern: String,
    /// Source that defines the canonical LS sequence. It must be complete.
    pub primary: String,
    pub sources: Vec<SourceConfig>,
    pub rules: CleaningRules,
    pub highlights: Vec<Highlight>,
    pub cosmetics: Cosmetics,
    pub output_stem: String,
}

const LUMINOMETERS: [&str; 5] = ["HFET", "HFOC", "PLT", "BCM1F", "PCC"];

fn vdm_cosmetics(label_y: f64, inset_y_range: (f64, f64)) -> Cosmetics {
    Cosmetics {
        x_title: "Luminosity section number since beginning of fill".into(),
        y_title: "Instantaneous luminosity (Hz/µb)".into(),
        inset_x_title: Some("LS number".into()),
        inset_y_title: Some("Inst. luminosity (Hz/µb)".into()),
        label: Some(Annotation {
            x: 40.0,
            y: label_y,
            text: "CMS Preliminary".into(),
        }),
        x_range: None,
        tick_step: None,
        inset_y_range: Some(inset_y_range),
    }
}

impl ScenarioConfig {
    /// Fill 6016 (2017). PCC lost a chunk in the middle of the fill: below
    /// LS 1000 it is unusable and above LS 1500 it is drawn separately.
    pub fn vdm_2017() -> Self {
        let colors = ["black", "magenta", "red", "blue", "#59d454"];
        let mut sources: Vec<SourceConfig> = LUMINOMETERS
            .iter()
            .zip(colors)
            .map(|(name, color)| SourceConfig::new(name, color))
            .collect();
        sources[4] = sources[4].clone().diverted(Diversion::new(1000, 1500));

        Self {
            name: "vdm-2017".into(),
            input_pattern: "6016_{source}.csv".into(),
            primary: "HFET".into(),
            sources,
            rules: CleaningRules {
                inset: Some(PositionWindow::new(1700, 1899)),
                ..Default::default()
            },
            highlights: vec![
                Highlight::new(("300027:6016", "1:1"), ("300027:6016", "112:112")),
                Highlight::new(("300043:6016", "1:1"), ("300043:6016", "334:334")),
            ],
            cosmetics: vdm_cosmetics(3.1, (2.70, 2.84)),
            output_stem: "VdMFillLumi".into(),
        }
    }

    /// Fill 6868 (2018). CMS was out during a fire alarm: LS 680-1700 are
    /// zeroed and LS 751-1650 are cut from the timeline.
    pub fn vdm_2018() -> Self {
        let colors = ["magenta", "black", "red", "blue", "#59d454"];
        let sources = LUMINOMETERS
            .iter()
            .zip(colors)
            .map(|(name, color)| SourceConfig::new(name, color))
            .collect();

        let mut cosmetics = vdm_cosmetics(10.0, (8.3, 8.9));
        cosmetics.x_range = Some((0.0, 2500.0));
        cosmetics.tick_step = Some(500);

        Self {
            name: "vdm-2018".into(),
            input_pattern: "6868_{source}.csv".into(),
            primary: "HFET".into(),
            sources,
            rules: CleaningRules {
                blackout: Some(PositionWindow::new(680, 1700)),
                cut: Some(CutWindow::new(750, 1650)),
                inset: Some(PositionWindow::new(3313, 3376)),
                ..Default::default()
            },
            highlights: vec![
                Highlight::new(("318982:6868", "7:7"), ("318983:6868", "44:44")),
                Highlight::new(("319018:6868", "1:1"), ("319018:6868", "48:48")),
                Highlight::new(("319019:6868", "1024:1024"), ("319019:6868", "1087:1087")),
            ],
            cosmetics,
            output_stem: "VdMFillLumi6868".into(),
        }
    }

    pub fn input_path(&self, data_dir: &Path, source: &str) -> PathBuf {
        data_dir.join(self.input_pattern.replace("{source}", source))
    }

    pub fn primary_source(&self) -> Result<&SourceConfig> {
        self.sources
            .iter()
            .find(|s| s.name == self.primary)
            .ok_or_else(|| LumiError::UnknownPrimary {
                scenario: self.name.clone(),
                primary: self.primary.clone(),
            })
    }

    fn rules_for(&self, source: &SourceConfig) -> CleaningRules {
        self.rules.with_diversion(source.diversion)
    }

    fn order_of(&self, name: &str) -> usize {
        self.sources
            .iter()
            .position(|s| s.name == name)
            .unwrap_or(usize::MAX)
    }
}

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

/// The aligned output of every source of a scenario.
#[derive(Debug, Clone)]
pub struct AlignedScenario {
    pub index: CanonicalIndex,
    /// In the scenario's declared source order.
    pub sources: Vec<AlignedSource>,
}

/// Read the primary source, build the canonical index from it, then align
/// every source against that index.
pub fn align_scenario(config: &ScenarioConfig, data_dir: &Path) -> Result<AlignedScenario> {
    let primary = config.primary_source()?;

    let mut reader = open_records(&config.input_path(data_dir, &primary.name), LinePolicy::SkipComments)?;
    let records = reader.by_ref().collect::<Result<Vec<_>>>()?;
    let malformed = reader.malformed();
    drop(reader);

    let index = CanonicalIndex::build(&records);
    if index.overwritten() > 0 {
        warn!(
            "{}: {} duplicate LS in primary source {}; the index keeps the later positions",
            config.name,
            index.overwritten(),
            primary.name
        );
    }

    let mut aligned = align_primary(&primary.name, &records, &config.rules_for(primary));
    aligned.stats.malformed = malformed;
    report(&aligned);
    let mut sources = vec![aligned];

    for source in config.sources.iter().filter(|s| s.name != primary.name) {
        let mut reader = open_records(&config.input_path(data_dir, &source.name), LinePolicy::SkipComments)?;
        let mut aligned = align_source(&index, &source.name, reader.by_ref(), &config.rules_for(source))?;
        aligned.stats.malformed = reader.malformed();
        report(&aligned);
        sources.push(aligned);
    }

    sources.sort_by_key(|s| config.order_of(&s.name));
    Ok(AlignedScenario { index, sources })
}

fn report(source: &AlignedSource) {
    let stats = &source.stats;
    info!("Processed {} LS for {}", stats.accepted, source.name);
    if !stats.is_clean() {
        warn!(
            "{}: skipped {} malformed lines and {} LS missing from the primary source",
            source.name, stats.malformed, stats.unmatched
        );
    }
}

// ---------------------------------------------------------------------------
// Figure
// ---------------------------------------------------------------------------

fn plot_points(series: &Series) -> Vec<PlotPoint> {
    series
        .points
        .iter()
        .map(|p| PlotPoint::new(p.position as f64, p.value))
        .collect()
}

impl AlignedScenario {
    pub fn source(&self, name: &str) -> Option<&AlignedSource> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Display range of a highlight, or `None` with a warning when either end
    /// is unknown or falls inside the cut.
    fn resolve_highlight(&self, config: &ScenarioConfig, highlight: &Highlight) -> Option<Band> {
        let display = |key: &IdentityKey| {
            let position = self.index.position(key);
            let shown = position.and_then(|p| config.rules.display_position(p));
            if shown.is_none() {
                warn!("{}: highlight boundary {key} is not shown on the plot", config.name);
            }
            shown
        };
        let from = display(&highlight.from)?;
        let to = display(&highlight.to)?;
        Some(Band {
            from: from as f64,
            to: to as f64,
        })
    }

    fn ticks(&self, config: &ScenarioConfig) -> Vec<TickLabel> {
        let Some(step) = config.cosmetics.tick_step.filter(|s| *s > 0) else {
            return Vec::new();
        };
        let Some(primary) = self.source(&config.primary) else {
            return Vec::new();
        };
        (0..primary.series.len())
            .step_by(step)
            .map(|display| {
                let canonical = match &config.rules.cut {
                    Some(cut) => cut.canonical_position(display),
                    None => display,
                };
                TickLabel {
                    at: display as f64,
                    text: canonical.to_string(),
                }
            })
            .collect()
    }

    /// Renderer input for this scenario.
    pub fn figure(&self, config: &ScenarioConfig) -> Figure {
        let specs: Vec<Option<&str>> = config.sources.iter().map(|s| s.color.as_deref()).collect();
        let colors = resolve_colors(&specs);
        let color_of = |name: &str| {
            colors
                .get(config.order_of(name))
                .cloned()
                .unwrap_or_else(|| "#808080".to_string())
        };

        let mut series = Vec::new();
        for source in &self.sources {
            let color = color_of(&source.name);
            let mut push = |role: SeriesRole, points: &Series| {
                series.push(PlotSeries {
                    label: source.name.clone(),
                    role,
                    color: color.clone(),
                    points: plot_points(points),
                });
            };
            push(SeriesRole::Main, &source.series);
            if let Some(diverted) = &source.diverted {
                push(SeriesRole::Diverted, diverted);
            }
            push(SeriesRole::Inset, &source.inset);
        }

        let stats: serde_json::Map<String, serde_json::Value> = self
            .sources
            .iter()
            .map(|s| (s.name.clone(), json!(s.stats)))
            .collect();

        let cosmetics = &config.cosmetics;
        Figure {
            stem: config.output_stem.clone(),
            x_title: cosmetics.x_title.clone(),
            y_title: cosmetics.y_title.clone(),
            x_range: cosmetics.x_range,
            series,
            bands: config
                .highlights
                .iter()
                .filter_map(|h| self.resolve_highlight(config, h))
                .collect(),
            ticks: self.ticks(config),
            annotations: cosmetics.label.iter().cloned().collect(),
            markers: Vec::new(),
            inset_x_title: cosmetics.inset_x_title.clone(),
            inset_y_title: cosmetics.inset_y_title.clone(),
            inset_y_range: cosmetics.inset_y_range,
            provenance: json!({
                "scenario": config,
                "primary_ls": self.index.accepted(),
                "duplicate_primary_ls": self.index.overwritten(),
                "stats": stats,
            }),
        }
    }
}
