//! ColorThemeDeriver: picks an accessible palette from a document's fill and
//! stroke colours.
//!
//! Steps: convert to RGB, deduplicate, drop near-grays, sort by luminance,
//! pick background/text from the luminance endpoints, pick accent roles from
//! the middle of the range, then enforce a 4.5:1 contrast ratio between
//! background and text.

use std::collections::HashSet;

use tracing::debug;

use super::Derivation;
use crate::models::theme::{ColorOp, ColorSpace, ColorTheme};

/// WCAG AA for body text.
pub const MIN_CONTRAST: f64 = 4.5;

/// Max distance (0–255) of each channel from the channel mean for a gray.
const GRAYSCALE_TOLERANCE: f64 = 15.0;

/// Role positions within the luminance-sorted mid-range, in percent.
const PRIMARY_PERCENTILE: usize = 25;
const SECONDARY_PERCENTILE: usize = 50;
const ACCENT_PERCENTILE: usize = 75;
const BORDER_PERCENTILE: usize = 33;

/// Synthetic role offsets along background → text.
const PRIMARY_OFFSET: f64 = 0.7;
const SECONDARY_OFFSET: f64 = 0.5;
const ACCENT_OFFSET: f64 = 0.3;
const BORDER_OFFSET: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// `0.2126 R + 0.7152 G + 0.0722 B` over channels normalised to `[0, 1]`.
    pub fn luminance(self) -> f64 {
        0.2126 * unit(self.r) + 0.7152 * unit(self.g) + 0.0722 * unit(self.b)
    }

    pub fn is_grayscale(self) -> bool {
        let channels = [self.r, self.g, self.b].map(f64::from);
        let mean = channels.iter().sum::<f64>() / 3.0;
        channels
            .iter()
            .all(|c| (c - mean).abs() <= GRAYSCALE_TOLERANCE)
    }

    /// Moves `t` of the way from `self` to `other`.
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| {
            let (a, b) = (f64::from(a), f64::from(b));
            (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
        };
        Rgb {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }
}

fn unit(channel: u8) -> f64 {
    f64::from(channel) / 255.0
}

fn to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// `(L_lighter + 0.05) / (L_darker + 0.05)`; always ≥ 1.
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let (la, lb) = (a.luminance(), b.luminance());
    let (lighter, darker) = if la >= lb { (la, lb) } else { (lb, la) };
    (lighter + 0.05) / (darker + 0.05)
}

/// Converts a drawing colour operation to RGB. Operations with the wrong
/// number of components for their colour space are ignored.
pub fn color_from_op(op: &ColorOp) -> Option<Rgb> {
    match (op.color_space, op.components.as_slice()) {
        (ColorSpace::Rgb, &[r, g, b]) => Some(Rgb {
            r: to_channel(r),
            g: to_channel(g),
            b: to_channel(b),
        }),
        (ColorSpace::Cmyk, &[c, m, y, k]) => Some(Rgb {
            r: to_channel(1.0 - (c + k).min(1.0)),
            g: to_channel(1.0 - (m + k).min(1.0)),
            b: to_channel(1.0 - (y + k).min(1.0)),
        }),
        (ColorSpace::Gray, &[gray]) => {
            let v = to_channel(gray);
            Some(Rgb { r: v, g: v, b: v })
        }
        _ => None,
    }
}

/// The theme used when a document offers no usable colours.
pub fn default_color_theme() -> ColorTheme {
    ColorTheme {
        primary: "#1e40af".to_string(),
        secondary: "#3b82f6".to_string(),
        accent: "#f59e0b".to_string(),
        background: "#ffffff".to_string(),
        text: "#1a1a1a".to_string(),
        border: "#e5e7eb".to_string(),
        is_dark: false,
        colors: Vec::new(),
    }
}

/// Black or white, whichever contrasts more with `background`. The better of
/// the two clears `MIN_CONTRAST` for every background.
fn accessible_text_for(background: Rgb) -> Rgb {
    if contrast_ratio(background, Rgb::BLACK) >= contrast_ratio(background, Rgb::WHITE) {
        Rgb::BLACK
    } else {
        Rgb::WHITE
    }
}

pub fn derive_color_theme(ops: &[ColorOp]) -> Derivation<ColorTheme> {
    let mut seen = HashSet::new();
    let palette: Vec<Rgb> = ops
        .iter()
        .filter_map(color_from_op)
        .filter(|c| seen.insert(*c))
        .filter(|c| !c.is_grayscale())
        .collect();

    if palette.is_empty() {
        debug!(ops = ops.len(), "No chromatic colours found, using default theme");
        return Derivation::defaulted(default_color_theme());
    }

    let mut sorted = palette.clone();
    sorted.sort_by(|a, b| a.luminance().total_cmp(&b.luminance()).then(a.cmp(b)));

    let light = sorted.iter().filter(|c| c.luminance() >= 0.5).count();
    let light_background = light >= sorted.len() - light;

    // Text candidates run from the endpoint opposite the background inward.
    let (background, text_candidates): (Rgb, Vec<Rgb>) = if light_background {
        (sorted[sorted.len() - 1], sorted.clone())
    } else {
        (sorted[0], sorted.iter().rev().copied().collect())
    };

    let text = text_candidates
        .into_iter()
        .filter(|c| *c != background)
        .find(|c| contrast_ratio(background, *c) >= MIN_CONTRAST)
        .unwrap_or_else(|| {
            debug!(
                background = %background.to_hex(),
                "No document colour meets contrast, using black/white text"
            );
            accessible_text_for(background)
        });

    let mid: Vec<Rgb> = sorted
        .iter()
        .copied()
        .filter(|c| *c != background && *c != text)
        .collect();
    let synthetic = |t: f64| background.lerp(text, t);

    let (primary, secondary, accent, border) = if mid.len() >= 3 {
        let at = |percentile: usize| mid[mid.len() * percentile / 100];
        let roles = [
            at(PRIMARY_PERCENTILE),
            at(SECONDARY_PERCENTILE),
            at(ACCENT_PERCENTILE),
        ];
        let border = at(BORDER_PERCENTILE);
        let border = if roles.contains(&border) {
            synthetic(BORDER_OFFSET)
        } else {
            border
        };
        (roles[0], roles[1], roles[2], border)
    } else {
        let primary = mid.first().copied().unwrap_or_else(|| synthetic(PRIMARY_OFFSET));
        let secondary = mid.get(1).copied().unwrap_or_else(|| synthetic(SECONDARY_OFFSET));
        (
            primary,
            secondary,
            synthetic(ACCENT_OFFSET),
            synthetic(BORDER_OFFSET),
        )
    };

    Derivation::derived(ColorTheme {
        primary: primary.to_hex(),
        secondary: secondary.to_hex(),
        accent: accent.to_hex(),
        background: background.to_hex(),
        text: text.to_hex(),
        border: border.to_hex(),
        is_dark: background.luminance() < 0.5,
        colors: palette.into_iter().map(Rgb::to_hex).collect(),
    })
}
