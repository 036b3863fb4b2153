//! Data preparation for CMS luminosity figures.
//!
//! Per-luminometer brilcalc exports are aligned on the LS sequence of a
//! primary luminometer, cleaned by a small per-figure rule set and handed to
//! a [`render::Renderer`].

pub mod aging;
pub mod color;
pub mod crossdetector;
pub mod data;
pub mod error;
pub mod render;
pub mod scenario;

pub use error::{LumiError, Result};

/// Install the `env_logger` backend, showing `info` and above unless
/// `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
