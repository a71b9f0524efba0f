//! Best-effort structuring of parsed sections into typed entries.
//!
//! Every function here accepts arbitrary lines and never fails; unrecognised
//! input produces partially-filled entries or is skipped.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::resume::{
    ClientEntry, EducationEntry, ExperienceEntry, ParsedSections, SectionKind, SkillEntry,
    StructuredContent,
};

const MONTH: &str = r"(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?\s+";

/// `2019 - 2021`, `Mar 2019 – Present`, `2020 to now`.
static DATE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:{MONTH})?\d{{4}}\s*(?:-|–|—|to)\s*(?:(?:{MONTH})?\d{{4}}|present|current|now)\b"
    ))
    .expect("date range regex")
});

static LEADING_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}\b").expect("leading year regex"));

static ANY_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("year regex"));

static SKILL_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,;•|·]").expect("skill separator regex"));

const EXPERIENCE_SEPARATORS: &[&str] = &[" | ", " — ", " – ", " - ", ", ", " at "];
const EDUCATION_SEPARATORS: &[&str] = &[", ", " | ", " — ", " – ", " - ", " at "];
const CLIENT_SEPARATORS: &[&str] = &[" — ", " – ", " - ", ": ", " | "];

const DEGREE_WORDS: &[&str] = &[
    "bachelor", "bachelors", "master", "masters", "bs", "bsc", "ba", "ms", "msc", "ma", "mba",
    "phd", "associate", "diploma", "degree", "doctorate", "beng", "meng", "btech", "mtech",
];
const INSTITUTION_WORDS: &[&str] = &[
    "university", "college", "institute", "school", "academy", "polytechnic",
];

/// Client lines longer than this continue the previous entry's description.
const CLIENT_CONTINUATION_WORDS: usize = 8;

/// Builds `StructuredContent` from parser output.
pub fn structure_sections(parsed: &ParsedSections) -> StructuredContent {
    StructuredContent {
        name: parsed
            .lines(SectionKind::Header)
            .first()
            .cloned()
            .unwrap_or_default(),
        summary: parsed.lines(SectionKind::About).join(" "),
        contact: parsed.lines(SectionKind::Contact).to_vec(),
        skills: structure_skills(parsed.lines(SectionKind::Skills)),
        experience: structure_experience(parsed.lines(SectionKind::Experience)),
        education: structure_education(parsed.lines(SectionKind::Education)),
        clients: structure_clients(parsed.lines(SectionKind::Clients)),
    }
}

pub fn structure_skills(lines: &[String]) -> Vec<SkillEntry> {
    let mut seen = HashSet::new();
    let mut skills = Vec::new();
    for line in lines {
        for piece in SKILL_SEPARATORS.split(line) {
            // "Languages: Rust" -> "Rust"
            let skill = piece.rsplit(':').next().unwrap_or(piece).trim();
            if skill.is_empty() || !seen.insert(skill.to_lowercase()) {
                continue;
            }
            skills.push(SkillEntry {
                text: skill.to_string(),
            });
        }
    }
    skills
}

pub fn structure_experience(lines: &[String]) -> Vec<ExperienceEntry> {
    let mut entries: Vec<ExperienceEntry> = Vec::new();

    for line in lines {
        let period = DATE_RANGE.find(line).or_else(|| LEADING_YEAR.find(line));

        if let Some(found) = period {
            let rest = clean(&format!("{} {}", &line[..found.start()], &line[found.end()..]));
            let mut entry = ExperienceEntry {
                period: found.as_str().trim().to_string(),
                ..Default::default()
            };
            match split_once_any(&rest, EXPERIENCE_SEPARATORS) {
                Some((title, " at ", company)) => {
                    entry.title = title;
                    entry.company = company;
                }
                Some((company, _, title)) => {
                    entry.company = company;
                    entry.title = title;
                }
                None => entry.company = rest,
            }
            entries.push(entry);
            continue;
        }

        match entries.last_mut() {
            Some(entry) if entry.company.is_empty() => entry.company = line.clone(),
            Some(entry) if entry.title.is_empty() => entry.title = line.clone(),
            Some(entry) => append_sentence(&mut entry.description, line),
            None => entries.push(ExperienceEntry {
                company: line.clone(),
                ..Default::default()
            }),
        }
    }

    entries
}

pub fn structure_education(lines: &[String]) -> Vec<EducationEntry> {
    let mut entries = Vec::new();
    let mut current = EducationEntry::default();

    for line in lines {
        let period = DATE_RANGE.find(line).or_else(|| ANY_YEAR.find(line));
        let rest = match period {
            Some(found) => {
                if !current.period.is_empty() {
                    flush_education(&mut entries, &mut current);
                }
                current.period = found.as_str().trim().to_string();
                clean(&format!("{} {}", &line[..found.start()], &line[found.end()..]))
            }
            None => clean(line),
        };

        for segment in split_all(&rest, EDUCATION_SEPARATORS) {
            if has_any_word(&segment, DEGREE_WORDS) {
                if !current.degree.is_empty() {
                    flush_education(&mut entries, &mut current);
                }
                current.degree = segment;
            } else if has_any_word(&segment, INSTITUTION_WORDS) {
                if !current.institution.is_empty() {
                    flush_education(&mut entries, &mut current);
                }
                current.institution = segment;
            } else if current.degree.is_empty() {
                current.degree = segment;
            } else if current.institution.is_empty() {
                current.institution = segment;
            }
        }
    }

    flush_education(&mut entries, &mut current);
    entries
}

pub fn structure_clients(lines: &[String]) -> Vec<ClientEntry> {
    let mut entries: Vec<ClientEntry> = Vec::new();

    for line in lines {
        if let Some((name, _, description)) = split_once_any(line, CLIENT_SEPARATORS) {
            entries.push(ClientEntry { name, description });
            continue;
        }
        let long = line.split_whitespace().count() > CLIENT_CONTINUATION_WORDS;
        match entries.last_mut() {
            Some(entry) if long => append_sentence(&mut entry.description, line),
            _ => entries.push(ClientEntry {
                name: line.trim().to_string(),
                description: String::new(),
            }),
        }
    }

    entries
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn flush_education(entries: &mut Vec<EducationEntry>, current: &mut EducationEntry) {
    let entry = std::mem::take(current);
    if !(entry.degree.is_empty() && entry.institution.is_empty() && entry.period.is_empty()) {
        entries.push(entry);
    }
}

fn append_sentence(target: &mut String, line: &str) {
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(line.trim());
}

/// Collapses whitespace and strips separator debris from both ends.
fn clean(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, '-' | '–' | '—' | '|' | ',' | ':' | '(' | ')')
        })
        .to_string()
}

/// Splits at the earliest occurrence of any separator, returning
/// `(left, separator, right)` with both halves cleaned. Empty halves yield `None`.
fn split_once_any<'s>(text: &str, separators: &[&'s str]) -> Option<(String, &'s str, String)> {
    let (index, separator) = separators
        .iter()
        .filter_map(|sep| text.find(sep).map(|i| (i, *sep)))
        .min_by_key(|(i, _)| *i)?;
    let left = clean(&text[..index]);
    let right = clean(&text[index + separator.len()..]);
    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some((left, separator, right))
}

fn split_all(text: &str, separators: &[&str]) -> Vec<String> {
    let mut segments = Vec::new();
    let mut rest = text.to_string();
    while let Some((left, _, right)) = split_once_any(&rest, separators) {
        segments.push(left);
        rest = right;
    }
    let rest = clean(&rest);
    if !rest.is_empty() {
        segments.push(rest);
    }
    segments
}

fn has_any_word(text: &str, words: &[&str]) -> bool {
    text.to_lowercase()
        .replace('.', "")
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| words.contains(&token))
}
