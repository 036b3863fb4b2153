/// Data layer: ingestion, canonical indexing, cleaning and alignment.
///
/// Architecture:
/// ```text
///  6868_HFET.csv   6868_HFOC.csv …
///        │               │
///        ▼               ▼
///   ┌──────────┐   ┌──────────┐
///   │  loader   │   │  loader   │  brilcalc lines → Record
///   └──────────┘   └──────────┘
///        │               │
///        ▼               │
///   ┌──────────────┐     │
///   │ CanonicalIndex│ ◄──┘  (run:fill, LS) → position, primary only
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  align    │  look up position, apply rules → AlignedSource
///   └──────────┘
/// ```

pub mod align;
pub mod index;
pub mod loader;
pub mod model;
pub mod rules;
