use serde::Serialize;

use super::model::Point;

// ---------------------------------------------------------------------------
// Windows
// ---------------------------------------------------------------------------

/// Inclusive range of canonical positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PositionWindow {
    pub first: usize,
    pub last: usize,
}

impl PositionWindow {
    pub const fn new(first: usize, last: usize) -> Self {
        Self { first, last }
    }

    pub fn contains(&self, position: usize) -> bool {
        (self.first..=self.last).contains(&position)
    }
}

/// Excised span `(begin, end]`; later positions slide down to close the gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CutWindow {
    pub begin: usize,
    pub end: usize,
}

impl CutWindow {
    pub const fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }

    /// Number of positions removed from the timeline.
    pub fn width(&self) -> usize {
        self.end.saturating_sub(self.begin)
    }

    /// Display position of a canonical one, or `None` inside the cut.
    pub fn remap(&self, position: usize) -> Option<usize> {
        if position <= self.begin {
            Some(position)
        } else if position > self.end {
            Some(position - self.width())
        } else {
            None
        }
    }

    /// Inverse of [`remap`](Self::remap), used for axis labels.
    pub fn canonical_position(&self, display: usize) -> usize {
        if display <= self.begin {
            display
        } else {
            display + self.width()
        }
    }
}

/// Splits a detector with a structurally broken middle segment into two
/// series that must not be joined when drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Diversion {
    /// Positions at or below this are invalid.
    pub low: usize,
    /// Positions above this go to the diverted series.
    pub high: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Discard,
    Main,
    Diverted,
}

impl Diversion {
    pub const fn new(low: usize, high: usize) -> Self {
        Self { low, high }
    }

    /// `high` itself falls in neither band.
    pub fn classify(&self, position: usize) -> Band {
        if position > self.low && position < self.high {
            Band::Main
        } else if position > self.high {
            Band::Diverted
        } else {
            Band::Discard
        }
    }
}

/// Which x coordinate inset points carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsetCoordinates {
    /// The position in the primary source, ignoring any cut.
    #[default]
    Canonical,
    /// The remapped position; points removed by the cut are left out.
    Display,
}

// ---------------------------------------------------------------------------
// CleaningRules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Cut,
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Main(Point),
    Diverted(Point),
    Dropped(DropReason),
}

/// Where one aligned record ends up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    pub placement: Placement,
    pub inset: Option<Point>,
}

/// The rule set applied to one source. Every rule is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningRules {
    pub blackout: Option<PositionWindow>,
    pub cut: Option<CutWindow>,
    pub diversion: Option<Diversion>,
    pub inset: Option<PositionWindow>,
    pub inset_coordinates: InsetCoordinates,
}

impl CleaningRules {
    /// Copy of these rules with a per-source diversion attached.
    pub fn with_diversion(&self, diversion: Option<Diversion>) -> Self {
        Self {
            diversion,
            ..self.clone()
        }
    }

    /// Display position for a canonical one, honouring the cut if any.
    pub fn display_position(&self, position: usize) -> Option<usize> {
        match &self.cut {
            Some(cut) => cut.remap(position),
            None => Some(position),
        }
    }

    /// Evaluate blackout, cut, diversion and inset, in that order.
    pub fn apply(&self, position: usize, value: f64) -> Outcome {
        let value = match &self.blackout {
            Some(window) if window.contains(position) => 0.0,
            _ => value,
        };

        let display = self.display_position(position);

        let placement = match display {
            None => Placement::Dropped(DropReason::Cut),
            Some(display) => {
                let point = Point {
                    position: display,
                    value,
                };
                match self.diversion.map(|d| d.classify(position)) {
                    None | Some(Band::Main) => Placement::Main(point),
                    Some(Band::Diverted) => Placement::Diverted(point),
                    Some(Band::Discard) => Placement::Dropped(DropReason::Discarded),
                }
            }
        };

        let inset = match &self.inset {
            Some(window) if window.contains(position) => match self.inset_coordinates {
                InsetCoordinates::Canonical => Some(Point { position, value }),
                InsetCoordinates::Display => display.map(|position| Point { position, value }),
            },
            _ => None,
        };

        Outcome { placement, inset }
    }
}
