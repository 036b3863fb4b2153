use log::warn;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Srgb<u8>> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Srgb::new(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Colour specs: "#rrggbb" or an SVG colour name
// ---------------------------------------------------------------------------

pub fn parse_color(spec: &str) -> Option<Srgb<u8>> {
    let spec = spec.trim();
    if spec.starts_with('#') {
        spec.parse::<Srgb<u8>>().ok()
    } else {
        palette::named::from_str(&spec.to_ascii_lowercase())
    }
}

pub fn to_hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

/// Resolve one colour per source. Missing or unreadable specs fall back to
/// the generated palette entry for that slot.
pub fn resolve_colors(specs: &[Option<&str>]) -> Vec<String> {
    let fallback = generate_palette(specs.len());
    specs
        .iter()
        .zip(fallback)
        .map(|(spec, fallback)| match spec {
            Some(spec) => match parse_color(spec) {
                Some(color) => to_hex(color),
                None => {
                    warn!("unrecognised colour '{spec}', using generated palette");
                    to_hex(fallback)
                }
            },
            None => to_hex(fallback),
        })
        .collect()
}
