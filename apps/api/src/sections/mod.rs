//! Heuristic résumé structuring: line classification into sections, then
//! best-effort extraction of typed entries.

pub mod parser;
pub mod structure;

pub use parser::{parse_sections, text_to_lines};
pub use structure::structure_sections;

use crate::models::resume::{StructuredSections, StructuringSource};

/// Runs the full heuristic path over extracted text.
pub fn heuristic_structure(raw_text: &str) -> StructuredSections {
    let lines = text_to_lines(raw_text);
    let sections = parse_sections(&lines);
    let structured_content = structure_sections(&sections);
    StructuredSections {
        source: StructuringSource::Heuristic,
        sections,
        structured_content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::SectionKind;

    #[test]
    fn test_heuristic_structure_tags_source() {
        let result = heuristic_structure("Jane Doe\nSKILLS\nGo, Rust\n");
        assert_eq!(result.source, StructuringSource::Heuristic);
        assert_eq!(result.sections.lines(SectionKind::Skills), ["Go, Rust"]);
        assert_eq!(result.structured_content.skills.len(), 2);
    }

    #[test]
    fn test_heuristic_structure_empty_text() {
        let result = heuristic_structure("   \n\n");
        assert!(result.sections.sections.is_empty());
        assert_eq!(result.structured_content.name, "");
    }
}
