use serde::{Deserialize, Serialize};

/// Whether a colour operator sets the fill or the stroke colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaintOp {
    Fill,
    Stroke,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColorSpace {
    Rgb,
    Cmyk,
    Gray,
}

/// A colour operation recovered from a page's drawing instructions.
/// Components are in the PDF range `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorOp {
    pub op: PaintOp,
    pub color_space: ColorSpace,
    pub components: Vec<f32>,
}

impl ColorOp {
    pub fn fill_rgb(r: f32, g: f32, b: f32) -> Self {
        Self {
            op: PaintOp::Fill,
            color_space: ColorSpace::Rgb,
            components: vec![r, g, b],
        }
    }

    pub fn fill_cmyk(c: f32, m: f32, y: f32, k: f32) -> Self {
        Self {
            op: PaintOp::Fill,
            color_space: ColorSpace::Cmyk,
            components: vec![c, m, y, k],
        }
    }
}

/// Usage statistics for one embedded font, gathered from `Tf` selections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontUsage {
    pub name: String,
    /// Number of times the font was selected.
    pub occurrences: u32,
    /// Number of glyphs shown while the font was selected.
    pub glyphs: u64,
    /// Glyph-weighted average rendered size in points (0 when unknown).
    pub average_size: f32,
}

impl FontUsage {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            occurrences: 1,
            glyphs: 0,
            average_size: 0.0,
        }
    }
}

/// The `ColorTheme` artifact. All colours are `#rrggbb`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorTheme {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub text: String,
    pub border: String,
    pub is_dark: bool,
    /// Deduplicated, grayscale-filtered colours found in the document.
    pub colors: Vec<String>,
}

/// The `FontTheme` artifact. Each role is a CSS `font-family` stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontTheme {
    pub heading: String,
    pub body: String,
    pub mono: String,
}
