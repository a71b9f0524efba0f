//! Heuristic section parser: a single forward pass over résumé lines.
//!
//! The parser is a tagged-state automaton. The state is the section currently
//! being filled (initially `header`). Each line is classified by the first
//! matching trigger in this order:
//!
//! 1. **Heading**: a short line (≤ 4 words, no digits) made only of section
//!    keywords and filler words. Switches state; the line is recorded as a
//!    heading and not stored in any section. When a heading names several
//!    sections, the earliest in `HEADING_PRIORITY` wins.
//! 2. **Contact data**: an `@`, a URL fragment, a `ST 12345` state/zip or a
//!    phone number while in `header` or `about`. The line is stored in
//!    `contact`; the state does not change.
//! 3. **Dated entry**: a line starting with a four-digit year whose next line
//!    does not, while outside `experience` and `education`. Switches to
//!    `experience` and the line is stored there.
//! 4. **Continuation**: anything else is appended to the current section.
//!
//! Every input line ends up in exactly one section or in `headings`.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::resume::{Heading, ParsedSections, SectionKind};

const MAX_HEADING_WORDS: usize = 4;

/// Sections in the order they win when a heading names more than one.
const HEADING_PRIORITY: [SectionKind; 7] = [
    SectionKind::About,
    SectionKind::Contact,
    SectionKind::Skills,
    SectionKind::Experience,
    SectionKind::Education,
    SectionKind::Clients,
    SectionKind::Other,
];

/// Words allowed in a heading alongside a section keyword.
const FILLER_WORDS: &[&str] = &[
    "me", "my", "work", "professional", "technical", "core", "key", "selected", "relevant",
    "and", "of", "information", "info", "details", "personal", "tech", "notable", "recent",
    "additional", "other", "academic", "industry",
];

static YEAR_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}").expect("year prefix regex"));

static URL_FRAGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(https?://|www\.|\b[a-z0-9-]+\.(com|io|dev|net|org|me|co|ai|app)(/|\b))")
        .expect("url regex")
});

static STATE_ZIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{2}\s+\d{5}(-\d{4})?\b").expect("state zip regex"));

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}\b").expect("phone regex")
});

fn keywords(kind: SectionKind) -> &'static [&'static str] {
    match kind {
        SectionKind::About => &["about", "summary", "profile", "objective", "overview", "bio"],
        SectionKind::Contact => &["contact", "contacts"],
        SectionKind::Skills => &[
            "skills",
            "skill",
            "technologies",
            "expertise",
            "competencies",
            "tools",
            "stack",
        ],
        SectionKind::Experience => &["experience", "employment", "career", "history"],
        SectionKind::Education => &["education", "academics", "studies"],
        SectionKind::Clients => &["client", "clients", "project", "projects", "portfolio"],
        SectionKind::Other => &[
            "references",
            "certifications",
            "certificates",
            "awards",
            "languages",
            "interests",
            "publications",
        ],
        SectionKind::Header => &[],
    }
}

/// The decision taken for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Heading(SectionKind),
    ContactData,
    DatedEntry,
    Continuation,
}

/// Returns the section a pure heading line introduces, if the line is one.
pub fn heading_kind(line: &str) -> Option<SectionKind> {
    if line.contains('@') || line.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let normalized = line
        .trim()
        .trim_end_matches(':')
        .to_lowercase()
        .replace(['&', '/', ',', '|'], " ");
    let words: Vec<&str> = normalized.split_whitespace().collect();
    if words.is_empty() || words.len() > MAX_HEADING_WORDS {
        return None;
    }

    let mut matched: Vec<SectionKind> = Vec::new();
    for word in &words {
        match HEADING_PRIORITY
            .iter()
            .find(|kind| keywords(**kind).contains(word))
        {
            Some(kind) => matched.push(*kind),
            None if FILLER_WORDS.contains(word) => {}
            None => return None,
        }
    }

    HEADING_PRIORITY
        .iter()
        .find(|kind| matched.contains(*kind))
        .copied()
}

pub fn is_contact_data(line: &str) -> bool {
    line.contains('@')
        || URL_FRAGMENT.is_match(line)
        || STATE_ZIP.is_match(line)
        || PHONE.is_match(line)
}

pub fn is_year_prefixed(line: &str) -> bool {
    YEAR_PREFIX.is_match(line.trim_start())
}

fn classify(line: &str, next: Option<&str>, state: SectionKind) -> Trigger {
    if let Some(kind) = heading_kind(line) {
        return Trigger::Heading(kind);
    }
    if matches!(state, SectionKind::Header | SectionKind::About) && is_contact_data(line) {
        return Trigger::ContactData;
    }
    let dated_allowed = !matches!(state, SectionKind::Experience | SectionKind::Education);
    if dated_allowed && is_year_prefixed(line) && !next.is_some_and(is_year_prefixed) {
        return Trigger::DatedEntry;
    }
    Trigger::Continuation
}

/// Splits résumé lines into sections. Deterministic and total: the output
/// accounts for every input line exactly once.
pub fn parse_sections<S: AsRef<str>>(lines: &[S]) -> ParsedSections {
    let mut parsed = ParsedSections::default();
    let mut state = SectionKind::Header;

    for (index, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        let next: Option<&str> = lines.get(index + 1).map(AsRef::as_ref);

        match classify(line, next, state) {
            Trigger::Heading(kind) => {
                state = kind;
                parsed.headings.push(Heading {
                    line: index,
                    text: line.to_string(),
                    section: kind,
                });
            }
            Trigger::ContactData => parsed.push_line(SectionKind::Contact, line.to_string()),
            Trigger::DatedEntry => {
                state = SectionKind::Experience;
                parsed.push_line(state, line.to_string());
            }
            Trigger::Continuation => parsed.push_line(state, line.to_string()),
        }
    }

    parsed
}

/// Splits extracted text into trimmed, non-blank lines.
pub fn text_to_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(parsed: &ParsedSections, kind: SectionKind) -> Vec<&str> {
        parsed.lines(kind).iter().map(String::as_str).collect()
    }

    #[test]
    fn test_section_split_scenario() {
        let input = [
            "Jane Doe",
            "SKILLS",
            "Go",
            "Rust",
            "EXPERIENCE",
            "2020 Acme Corp Engineer",
        ];
        let parsed = parse_sections(&input);
        assert_eq!(lines(&parsed, SectionKind::Header), ["Jane Doe"]);
        assert_eq!(lines(&parsed, SectionKind::Skills), ["Go", "Rust"]);
        assert_eq!(
            lines(&parsed, SectionKind::Experience),
            ["2020 Acme Corp Engineer"]
        );
        assert_eq!(parsed.headings.len(), 2);
        assert_eq!(parsed.line_count(), input.len());
    }

    #[test]
    fn test_heading_detection() {
        assert_eq!(heading_kind("About Me"), Some(SectionKind::About));
        assert_eq!(heading_kind("Professional Summary:"), Some(SectionKind::About));
        assert_eq!(heading_kind("Work Experience"), Some(SectionKind::Experience));
        assert_eq!(heading_kind("Work History"), Some(SectionKind::Experience));
        assert_eq!(heading_kind("Skills & Expertise"), Some(SectionKind::Skills));
        assert_eq!(heading_kind("selected projects"), Some(SectionKind::Clients));
        assert_eq!(heading_kind("Certifications"), Some(SectionKind::Other));
        assert_eq!(heading_kind("Contact Information"), Some(SectionKind::Contact));
        // Priority: skills beats experience, education beats other.
        assert_eq!(heading_kind("Skills and Experience"), Some(SectionKind::Skills));
        assert_eq!(
            heading_kind("Education / Certifications"),
            Some(SectionKind::Education)
        );
    }

    #[test]
    fn test_data_lines_are_not_headings() {
        assert_eq!(heading_kind("Expertise in distributed systems"), None);
        assert_eq!(heading_kind("Experience 2019"), None);
        assert_eq!(heading_kind("Go"), None);
        assert_eq!(heading_kind(""), None);
        assert_eq!(
            heading_kind("skills skills skills skills skills"),
            None,
            "more than four words"
        );
    }

    #[test]
    fn test_contact_lines_are_diverted_from_header() {
        let input = [
            "Jane Doe",
            "jane@example.com",
            "Senior Engineer",
            "github.com/janedoe",
            "Austin, TX 78701",
            "(512) 555-0147",
        ];
        let parsed = parse_sections(&input);
        assert_eq!(lines(&parsed, SectionKind::Header), ["Jane Doe", "Senior Engineer"]);
        assert_eq!(
            lines(&parsed, SectionKind::Contact),
            [
                "jane@example.com",
                "github.com/janedoe",
                "Austin, TX 78701",
                "(512) 555-0147"
            ]
        );
        assert_eq!(parsed.line_count(), input.len());
    }

    #[test]
    fn test_contact_data_inside_other_sections_stays_put() {
        let input = ["EXPERIENCE", "Built APIs for example.com"];
        let parsed = parse_sections(&input);
        assert_eq!(
            lines(&parsed, SectionKind::Experience),
            ["Built APIs for example.com"]
        );
        assert!(parsed.lines(SectionKind::Contact).is_empty());
    }

    #[test]
    fn test_year_line_switches_to_experience() {
        let input = ["Jane Doe", "Skills", "Rust", "2019 Initech Developer", "Wrote code"];
        let parsed = parse_sections(&input);
        assert_eq!(lines(&parsed, SectionKind::Skills), ["Rust"]);
        assert_eq!(
            lines(&parsed, SectionKind::Experience),
            ["2019 Initech Developer", "Wrote code"]
        );
    }

    #[test]
    fn test_consecutive_year_lines_do_not_switch() {
        let input = ["Jane Doe", "2019", "2020 Acme"];
        let parsed = parse_sections(&input);
        // "2019" is followed by a year line; "2020 Acme" is the last line.
        assert_eq!(lines(&parsed, SectionKind::Header), ["Jane Doe", "2019"]);
        assert_eq!(lines(&parsed, SectionKind::Experience), ["2020 Acme"]);
    }

    #[test]
    fn test_education_years_stay_in_education() {
        let input = ["Education", "2012 BSc Computer Science", "MIT"];
        let parsed = parse_sections(&input);
        assert_eq!(
            lines(&parsed, SectionKind::Education),
            ["2012 BSc Computer Science", "MIT"]
        );
        assert!(parsed.lines(SectionKind::Experience).is_empty());
    }

    #[test]
    fn test_coverage_over_varied_inputs() {
        let corpus: Vec<Vec<&str>> = vec![
            vec![],
            vec!["only one line"],
            vec!["SKILLS", "SKILLS", "EDUCATION"],
            vec!["2001", "2002", "2003"],
            vec!["a@b.c", "x", "Summary", "y@z", "References", "Available on request"],
            vec!["Projects", "2021 Folio", "Clients", "Contact", "555 123 4567"],
        ];
        for input in corpus {
            let parsed = parse_sections(&input);
            assert_eq!(parsed.line_count(), input.len(), "input {input:?}");
        }
    }

    #[test]
    fn test_parse_is_deterministic() {
        let input = text_to_lines(
            "Jane Doe\n  jane@x.io \n\nABOUT\nBuilder.\nSkills\nRust, Go\n2020 Acme — Engineer\n",
        );
        assert_eq!(parse_sections(&input), parse_sections(&input));
    }

    #[test]
    fn test_text_to_lines_trims_and_drops_blanks() {
        assert_eq!(text_to_lines("  a \n\n\t\nb\r\n"), vec!["a", "b"]);
    }
}
