use std::fmt;

use serde::{Deserialize, Serialize};

/// The logical résumé sections recognised by the section parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Header,
    About,
    Contact,
    Skills,
    Experience,
    Education,
    Clients,
    Other,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Header => "header",
            SectionKind::About => "about",
            SectionKind::Contact => "contact",
            SectionKind::Skills => "skills",
            SectionKind::Experience => "experience",
            SectionKind::Education => "education",
            SectionKind::Clients => "clients",
            SectionKind::Other => "other",
        }
    }

    /// Maps a free-form label (as returned by the AI collaborator) to a section.
    /// Unknown labels land in `Other`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "header" | "name" => SectionKind::Header,
            "about" | "summary" | "profile" => SectionKind::About,
            "contact" | "contacts" => SectionKind::Contact,
            "skills" | "technologies" | "expertise" => SectionKind::Skills,
            "experience" | "work" | "employment" => SectionKind::Experience,
            "education" => SectionKind::Education,
            "clients" | "client" | "projects" => SectionKind::Clients,
            _ => SectionKind::Other,
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named bucket of raw text lines, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub lines: Vec<String>,
}

/// A line that was consumed as a pure section heading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    /// Zero-based index of the line in the parser input.
    pub line: usize,
    pub text: String,
    pub section: SectionKind,
}

/// Output of the section parser.
///
/// Sections appear in first-insertion order. Every input line is either in
/// exactly one section or recorded in `headings`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedSections {
    pub sections: Vec<Section>,
    pub headings: Vec<Heading>,
}

impl ParsedSections {
    pub fn lines(&self, kind: SectionKind) -> &[String] {
        self.sections
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.lines.as_slice())
            .unwrap_or(&[])
    }

    pub fn push_line(&mut self, kind: SectionKind, line: String) {
        match self.sections.iter_mut().find(|s| s.kind == kind) {
            Some(section) => section.lines.push(line),
            None => self.sections.push(Section {
                kind,
                lines: vec![line],
            }),
        }
    }

    /// Number of input lines accounted for (stored lines plus consumed headings).
    pub fn line_count(&self) -> usize {
        self.sections.iter().map(|s| s.lines.len()).sum::<usize>() + self.headings.len()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Structured entries
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceEntry {
    pub period: String,
    pub company: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationEntry {
    pub degree: String,
    pub institution: String,
    pub period: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientEntry {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillEntry {
    pub text: String,
}

/// Structured résumé content, produced either by the heuristic structurer or
/// by the AI collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredContent {
    pub name: String,
    pub summary: String,
    pub contact: Vec<String>,
    pub skills: Vec<SkillEntry>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub clients: Vec<ClientEntry>,
}

/// Which path produced a `StructuredSections` artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuringSource {
    Heuristic,
    Ai,
}

/// The `StructuredSections` artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredSections {
    pub source: StructuringSource,
    pub sections: ParsedSections,
    pub structured_content: StructuredContent,
}
