#![forbid(unsafe_code)]

//! Hex color decomposition for the engine payload.
//!
//! Color controls hand us CSS hex strings; the engine wants normalized RGB
//! components. Accepts `#rgb`, `#rrggbb`, and `#rrggbbaa` (alpha dropped);
//! anything else decomposes to [`FALLBACK`].

use serde::{Deserialize, Serialize};

/// Normalized RGB triple, each component in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// Decomposition result for unparsable color strings.
pub const FALLBACK: Rgb = Rgb {
    r: 1.0,
    g: 0.5,
    b: 0.2,
};

/// Decompose a hex color string into normalized components.
///
/// The `#` prefix is optional. Three-digit shorthand expands per CSS
/// (`#abc` → `#aabbcc`); eight-digit RGBA truncates to RGB. Any other
/// length, or a non-hex digit, yields [`FALLBACK`].
#[must_use]
pub fn parse_hex(hex: &str) -> Rgb {
    let clean = hex.strip_prefix('#').unwrap_or(hex);

    let expanded;
    let digits = match clean.len() {
        3 => {
            expanded = clean
                .chars()
                .flat_map(|c| [c, c])
                .collect::<String>();
            expanded.as_str()
        }
        6 => clean,
        8 => &clean[..6],
        _ => return FALLBACK,
    };

    let component = |range: std::ops::Range<usize>| -> Option<f64> {
        let byte = u8::from_str_radix(digits.get(range)?, 16).ok()?;
        Some(f64::from(byte) / 255.0)
    };

    match (component(0..2), component(2..4), component(4..6)) {
        (Some(r), Some(g), Some(b)) => Rgb { r, g, b },
        _ => FALLBACK,
    }
}
