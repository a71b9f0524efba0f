//! Recovers colour operators and font selections from PDF page content
//! streams.

use std::collections::HashMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::theme::{ColorOp, ColorSpace, FontUsage, PaintOp};

/// Parent chain depth limit when looking up inherited page resources.
const MAX_PARENT_DEPTH: usize = 16;

/// Drawing information gathered from every page of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingSummary {
    pub color_ops: Vec<ColorOp>,
    /// One entry per `BaseFont`, in first-selected order.
    pub font_usages: Vec<FontUsage>,
}

/// Accumulates font statistics while walking content streams.
#[derive(Default)]
struct FontTally {
    order: Vec<String>,
    stats: HashMap<String, (u32, u64, f64)>,
}

impl FontTally {
    fn select(&mut self, font: &str) {
        let entry = self.stats.entry(font.to_string()).or_insert_with(|| {
            self.order.push(font.to_string());
            (0, 0, 0.0)
        });
        entry.0 += 1;
    }

    fn show(&mut self, font: &str, glyphs: u64, size: f64) {
        if let Some(entry) = self.stats.get_mut(font) {
            entry.1 += glyphs;
            entry.2 += glyphs as f64 * size;
        }
    }

    fn into_usages(self) -> Vec<FontUsage> {
        let mut stats = self.stats;
        self.order
            .into_iter()
            .filter_map(|name| {
                let (occurrences, glyphs, weighted) = stats.remove(&name)?;
                let average_size = if glyphs > 0 {
                    (weighted / glyphs as f64) as f32
                } else {
                    0.0
                };
                Some(FontUsage {
                    name,
                    occurrences,
                    glyphs,
                    average_size,
                })
            })
            .collect()
    }
}

/// Text state tracked across one page's operations.
struct TextState {
    font: Option<String>,
    font_size: f64,
    matrix_scale: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            font_size: 0.0,
            matrix_scale: 1.0,
        }
    }
}

/// Current fill and stroke colour spaces; `None` for spaces other than the
/// device ones (Lab, ICCBased, Pattern, ...).
#[derive(Clone, Copy)]
struct PaintSpaces {
    fill: Option<ColorSpace>,
    stroke: Option<ColorSpace>,
}

impl Default for PaintSpaces {
    fn default() -> Self {
        Self {
            fill: Some(ColorSpace::Gray),
            stroke: Some(ColorSpace::Gray),
        }
    }
}

impl PaintSpaces {
    fn slot(&mut self, op: PaintOp) -> &mut Option<ColorSpace> {
        match op {
            PaintOp::Fill => &mut self.fill,
            PaintOp::Stroke => &mut self.stroke,
        }
    }
}

/// Parses a PDF and walks every page's content stream. Pages that fail to
/// decode are skipped with a warning.
pub fn extract_drawing(bytes: &[u8]) -> Result<DrawingSummary, lopdf::Error> {
    let doc = Document::load_mem(bytes)?;
    let mut color_ops = Vec::new();
    let mut fonts = FontTally::default();

    for (page_number, page_id) in doc.get_pages() {
        let content = match doc
            .get_page_content(page_id)
            .and_then(|raw| Content::decode(&raw))
        {
            Ok(content) => content,
            Err(e) => {
                warn!(page = page_number, error = %e, "Skipping undecodable page content");
                continue;
            }
        };
        let font_names = page_font_names(&doc, page_id);
        walk_operations(&content.operations, &font_names, &mut color_ops, &mut fonts);
    }

    let summary = DrawingSummary {
        color_ops,
        font_usages: fonts.into_usages(),
    };
    debug!(
        color_ops = summary.color_ops.len(),
        fonts = summary.font_usages.len(),
        "Recovered drawing operations"
    );
    Ok(summary)
}

fn walk_operations(
    operations: &[Operation],
    font_names: &HashMap<Vec<u8>, String>,
    color_ops: &mut Vec<ColorOp>,
    fonts: &mut FontTally,
) {
    let mut text = TextState::default();
    let mut spaces = PaintSpaces::default();
    let mut saved = Vec::new();

    for operation in operations {
        let operands = &operation.operands;
        match operation.operator.as_str() {
            "q" => saved.push(spaces),
            "Q" => spaces = saved.pop().unwrap_or_default(),
            "cs" | "CS" => {
                let space = operands.first().and_then(name_bytes).and_then(|name| {
                    match name.as_slice() {
                        b"DeviceRGB" => Some(ColorSpace::Rgb),
                        b"DeviceCMYK" => Some(ColorSpace::Cmyk),
                        b"DeviceGray" => Some(ColorSpace::Gray),
                        _ => None,
                    }
                });
                *spaces.slot(paint_op(&operation.operator)) = space;
            }
            "rg" | "RG" | "k" | "K" | "g" | "G" | "sc" | "scn" | "SC" | "SCN" => {
                if let Some(op) = color_op(&operation.operator, operands, &mut spaces) {
                    color_ops.push(op);
                }
            }
            "BT" => text.matrix_scale = 1.0,
            "Tm" => {
                if let (Some(c), Some(d)) = (number_at(operands, 2), number_at(operands, 3)) {
                    let scale = c.hypot(d);
                    text.matrix_scale = if scale > 0.0 { scale } else { 1.0 };
                }
            }
            "Tf" => {
                let resource = operands.first().and_then(name_bytes);
                text.font = resource.map(|name| {
                    font_names
                        .get(name)
                        .cloned()
                        .unwrap_or_else(|| String::from_utf8_lossy(name).into_owned())
                });
                text.font_size = number_at(operands, 1).unwrap_or(0.0).abs();
                if let Some(font) = &text.font {
                    fonts.select(font);
                }
            }
            "Tj" | "'" | "TJ" | "\"" => {
                let glyphs = shown_glyphs(operands);
                if let Some(font) = &text.font {
                    fonts.show(font, glyphs, text.font_size * text.matrix_scale);
                }
            }
            _ => {}
        }
    }
}

/// Lowercase operators paint fills, uppercase ones strokes.
fn paint_op(operator: &str) -> PaintOp {
    if operator.chars().all(|c| c.is_ascii_lowercase()) {
        PaintOp::Fill
    } else {
        PaintOp::Stroke
    }
}

fn component_count(space: ColorSpace) -> usize {
    match space {
        ColorSpace::Rgb => 3,
        ColorSpace::Cmyk => 4,
        ColorSpace::Gray => 1,
    }
}

/// Device operators (`rg`, `k`, `g`) also switch the current space;
/// `sc`/`scn` take theirs from the last `cs`/`CS`.
fn color_op(operator: &str, operands: &[Object], spaces: &mut PaintSpaces) -> Option<ColorOp> {
    let op = paint_op(operator);
    let slot = spaces.slot(op);
    let color_space = match operator {
        "rg" | "RG" => *slot.insert(ColorSpace::Rgb),
        "k" | "K" => *slot.insert(ColorSpace::Cmyk),
        "g" | "G" => *slot.insert(ColorSpace::Gray),
        _ => (*slot)?,
    };
    let components: Vec<f32> = operands.iter().filter_map(number).map(|v| v as f32).collect();
    if components.len() != component_count(color_space) {
        return None;
    }
    Some(ColorOp {
        op,
        color_space,
        components,
    })
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn number_at(operands: &[Object], index: usize) -> Option<f64> {
    operands.get(index).and_then(number)
}

fn name_bytes(object: &Object) -> Option<&Vec<u8>> {
    match object {
        Object::Name(name) => Some(name),
        _ => None,
    }
}

/// Byte length of the strings shown by a text operator.
fn shown_glyphs(operands: &[Object]) -> u64 {
    operands
        .iter()
        .map(|operand| match operand {
            Object::String(bytes, _) => bytes.len() as u64,
            Object::Array(items) => shown_glyphs(items),
            _ => 0,
        })
        .sum()
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, object).and_then(|o| o.as_dict().ok())
}

/// Maps page font resource names (`/F1`) to `BaseFont` names, following
/// inherited `Resources` up the page tree.
fn page_font_names(doc: &Document, page_id: ObjectId) -> HashMap<Vec<u8>, String> {
    let mut names = HashMap::new();
    let mut node = doc.get_object(page_id).ok().and_then(|o| o.as_dict().ok());

    for _ in 0..MAX_PARENT_DEPTH {
        let Some(dict) = node else { break };

        let fonts = dict
            .get(b"Resources")
            .ok()
            .and_then(|r| resolve_dict(doc, r))
            .and_then(|resources| resources.get(b"Font").ok())
            .and_then(|f| resolve_dict(doc, f));

        if let Some(fonts) = fonts {
            for (resource, font) in fonts.iter() {
                if names.contains_key(resource) {
                    continue;
                }
                let base = resolve_dict(doc, font)
                    .and_then(|font| font.get(b"BaseFont").ok())
                    .and_then(name_bytes)
                    .map(|b| String::from_utf8_lossy(b).into_owned());
                if let Some(base) = base {
                    names.insert(resource.clone(), base);
                }
            }
        }

        node = dict
            .get(b"Parent")
            .ok()
            .and_then(|p| resolve_dict(doc, p));
    }

    names
}
