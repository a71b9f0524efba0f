//! FontThemeDeriver: assigns embedded font families to heading, body and
//! monospace roles. Always returns a complete theme.

use std::cmp::Reverse;

use super::Derivation;
use crate::models::theme::{FontTheme, FontUsage};

pub const SANS_STACK: &str = r#"system-ui, -apple-system, "Segoe UI", Helvetica, Arial, sans-serif"#;
pub const SERIF_STACK: &str = r#"Georgia, "Times New Roman", serif"#;
pub const MONO_STACK: &str = "ui-monospace, SFMono-Regular, Menlo, Consolas, monospace";

const MONO_MARKERS: &[&str] = &["mono", "courier", "consol", "code"];
const SERIF_MARKERS: &[&str] = &[
    "times",
    "georgia",
    "garamond",
    "roman",
    "minion",
    "palatino",
    "baskerville",
    "cambria",
    "caslon",
    "merriweather",
    "bodoni",
    "didot",
    "charter",
    "crimson",
];

/// PostScript name suffixes that carry no family information.
const POSTSCRIPT_SUFFIXES: &[&str] = &["PSMT", "MT", "PS"];
const STYLE_WORDS: &[&str] = &[
    "bold", "italic", "oblique", "regular", "light", "medium", "semibold", "black", "heavy",
    "thin", "condensed",
];

/// Reduces an embedded font name to a display family:
/// `ABCDEF+TimesNewRomanPS-BoldMT` → `Times New Roman`.
pub fn normalize_font_name(raw: &str) -> String {
    let mut name = raw.trim();

    if let Some((prefix, rest)) = name.split_once('+') {
        if prefix.len() == 6 && prefix.chars().all(|c| c.is_ascii_uppercase()) {
            name = rest;
        }
    }

    name = name.split(['-', ',']).next().unwrap_or(name);

    for suffix in POSTSCRIPT_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            if stripped.ends_with(|c: char| c.is_lowercase()) {
                name = stripped;
                break;
            }
        }
    }

    let spaced = split_camel_case(&name.replace('_', " "));
    let mut words: Vec<&str> = spaced.split_whitespace().collect();
    while words.len() > 1
        && words
            .last()
            .is_some_and(|w| STYLE_WORDS.contains(&w.to_lowercase().as_str()))
    {
        words.pop();
    }
    words.join(" ")
}

/// `IBMPlexMono` → `IBM Plex Mono`.
fn split_camel_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower)
            {
                out.push(' ');
            }
        }
        out.push(c);
    }
    out
}

pub fn is_monospace(family: &str) -> bool {
    let lower = family.to_lowercase();
    MONO_MARKERS.iter().any(|m| lower.contains(m))
}

fn is_serif(family: &str) -> bool {
    let lower = family.to_lowercase();
    if lower.contains("sans") {
        return false;
    }
    lower.contains("serif") || SERIF_MARKERS.iter().any(|m| lower.contains(m))
}

fn stack(family: &str, generic: &str) -> String {
    format!("\"{family}\", {generic}")
}

fn text_stack(family: &str) -> String {
    stack(family, if is_serif(family) { SERIF_STACK } else { SANS_STACK })
}

pub fn default_font_theme() -> FontTheme {
    FontTheme {
        heading: SANS_STACK.to_string(),
        body: SERIF_STACK.to_string(),
        mono: MONO_STACK.to_string(),
    }
}

/// Usage of one normalised family, merged across its embedded variants.
#[derive(Debug)]
struct FamilyStats {
    family: String,
    first_seen: usize,
    occurrences: u64,
    glyphs: u64,
    size_weight: f64,
    weighted_size: f64,
}

impl FamilyStats {
    fn average_size(&self) -> f64 {
        if self.size_weight > 0.0 {
            self.weighted_size / self.size_weight
        } else {
            0.0
        }
    }
}

fn merge_families(usages: &[FontUsage]) -> Vec<FamilyStats> {
    let mut families: Vec<FamilyStats> = Vec::new();
    for usage in usages {
        let family = normalize_font_name(&usage.name);
        if family.is_empty() {
            continue;
        }
        let index = match families.iter().position(|f| f.family == family) {
            Some(index) => index,
            None => {
                families.push(FamilyStats {
                    first_seen: families.len(),
                    family,
                    occurrences: 0,
                    glyphs: 0,
                    size_weight: 0.0,
                    weighted_size: 0.0,
                });
                families.len() - 1
            }
        };
        let stats = &mut families[index];
        stats.occurrences += u64::from(usage.occurrences);
        stats.glyphs += usage.glyphs;
        if usage.average_size > 0.0 {
            let weight = if usage.glyphs > 0 {
                usage.glyphs as f64
            } else {
                f64::from(usage.occurrences.max(1))
            };
            stats.size_weight += weight;
            stats.weighted_size += weight * f64::from(usage.average_size);
        }
    }
    families
}

/// Classifies font usages into roles: mono by name, heading by largest
/// average size, body by most glyphs (then selections). Ties go to the
/// family seen first.
pub fn derive_font_theme(usages: &[FontUsage]) -> Derivation<FontTheme> {
    let families = merge_families(usages);
    if families.is_empty() {
        return Derivation::defaulted(default_font_theme());
    }

    let mono = families.iter().find(|f| is_monospace(&f.family));
    let text: Vec<&FamilyStats> = families
        .iter()
        .filter(|f| !is_monospace(&f.family))
        .collect();

    let body = text
        .iter()
        .copied()
        .max_by_key(|f| (f.glyphs, f.occurrences, Reverse(f.first_seen)));

    let any_sized = text.iter().any(|f| f.average_size() > 0.0);
    let heading = if any_sized {
        text.iter().copied().max_by(|a, b| {
            a.average_size()
                .total_cmp(&b.average_size())
                .then(b.first_seen.cmp(&a.first_seen))
        })
    } else {
        text.iter()
            .copied()
            .find(|f| body.is_some_and(|b| b.first_seen != f.first_seen))
            .or(body)
    };

    let theme = FontTheme {
        heading: heading.map_or_else(|| SANS_STACK.to_string(), |f| text_stack(&f.family)),
        body: body.map_or_else(|| SERIF_STACK.to_string(), |f| text_stack(&f.family)),
        mono: mono.map_or_else(|| MONO_STACK.to_string(), |f| stack(&f.family, MONO_STACK)),
    };
    Derivation::derived(theme)
}

/// Derives a theme from bare font names, each counted as one selection.
pub fn derive_font_theme_from_names<S: AsRef<str>>(names: &[S]) -> Derivation<FontTheme> {
    let usages: Vec<FontUsage> = names
        .iter()
        .map(|name| FontUsage::named(name.as_ref()))
        .collect();
    derive_font_theme(&usages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(name: &str, occurrences: u32, glyphs: u64, size: f32) -> FontUsage {
        FontUsage {
            name: name.to_string(),
            occurrences,
            glyphs,
            average_size: size,
        }
    }

    #[test]
    fn test_normalize_font_names() {
        assert_eq!(normalize_font_name("ABCDEF+Helvetica-Bold"), "Helvetica");
        assert_eq!(normalize_font_name("TimesNewRomanPSMT"), "Times New Roman");
        assert_eq!(normalize_font_name("Arial,Bold"), "Arial");
        assert_eq!(normalize_font_name("CourierNewPS-BoldMT"), "Courier New");
        assert_eq!(normalize_font_name("IBMPlexMono-Regular"), "IBM Plex Mono");
        assert_eq!(normalize_font_name("SourceSansPro"), "Source Sans Pro");
        assert_eq!(normalize_font_name("HelveticaBold"), "Helvetica");
        assert_eq!(normalize_font_name("EBGaramond"), "EB Garamond");
        assert_eq!(normalize_font_name("Lato"), "Lato");
        assert_eq!(normalize_font_name("  "), "");
    }

    #[test]
    fn test_roles_from_usage() {
        let usages = [
            usage("ABCDEF+Helvetica-Bold", 4, 40, 18.0),
            usage("GHIJKL+EBGaramond-Regular", 30, 2000, 10.0),
            usage("Courier", 2, 100, 9.0),
            usage("Helvetica", 6, 300, 10.0),
        ];
        let derived = derive_font_theme(&usages);
        assert!(!derived.is_defaulted());
        let theme = derived.value;
        assert_eq!(theme.body, format!("\"EB Garamond\", {SERIF_STACK}"));
        assert_eq!(theme.mono, format!("\"Courier\", {MONO_STACK}"));
        // Helvetica variants merge: (40*18 + 300*10) / 340 ≈ 10.9 > 10.0.
        assert_eq!(theme.heading, format!("\"Helvetica\", {SANS_STACK}"));
    }

    #[test]
    fn test_empty_input_defaults() {
        let derived = derive_font_theme(&[]);
        assert!(derived.is_defaulted());
        assert_eq!(derived.value, default_font_theme());
        assert!(derived.value.body.ends_with("serif"));
        assert!(derived.value.mono.ends_with("monospace"));
    }

    #[test]
    fn test_names_only_roles() {
        let derived = derive_font_theme_from_names(&["Lato", "Lato-Bold", "Merriweather"]);
        let theme = derived.value;
        assert_eq!(theme.body, format!("\"Lato\", {SANS_STACK}"));
        assert_eq!(theme.heading, format!("\"Merriweather\", {SERIF_STACK}"));
        assert_eq!(theme.mono, MONO_STACK);
    }

    #[test]
    fn test_single_family_fills_heading_and_body() {
        let theme = derive_font_theme_from_names(&["Inter"]).value;
        assert_eq!(theme.heading, theme.body);
    }

    #[test]
    fn test_mono_only_document_keeps_text_defaults() {
        let derived = derive_font_theme_from_names(&["JetBrainsMono-Regular"]);
        assert!(!derived.is_defaulted());
        assert_eq!(derived.value.heading, SANS_STACK);
        assert_eq!(derived.value.body, SERIF_STACK);
        assert_eq!(derived.value.mono, format!("\"Jet Brains Mono\", {MONO_STACK}"));
    }

    #[test]
    fn test_heading_tie_goes_to_first_seen() {
        let usages = [
            usage("Alpha", 1, 10, 14.0),
            usage("Beta", 1, 10, 14.0),
        ];
        let theme = derive_font_theme(&usages).value;
        assert!(theme.heading.starts_with("\"Alpha\""));
        assert!(theme.body.starts_with("\"Alpha\""));
    }
}
