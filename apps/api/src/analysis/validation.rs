//! Shape validation and normalisation of AI structuring responses.
//!
//! The collaborator's output is untrusted. Anything that deviates from the
//! expected shape is rejected with a reason and the caller falls back to the
//! heuristic parser. Accepted output is trimmed, and entries whose fields are
//! all blank are dropped. Dates are not checked for plausibility.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::models::resume::{
    ClientEntry, EducationEntry, ExperienceEntry, ParsedSections, SectionKind, SkillEntry,
    StructuredContent, StructuredSections, StructuringSource,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AiStructuring {
    sections: Map<String, Value>,
    structured_content: AiContent,
}

#[derive(Debug, Deserialize)]
struct AiContent {
    name: String,
    summary: String,
    #[serde(default)]
    contact: Vec<String>,
    #[serde(default)]
    skills: Vec<AiSkill>,
    #[serde(default)]
    experience: Vec<ExperienceEntry>,
    #[serde(default)]
    education: Vec<EducationEntry>,
    #[serde(default)]
    clients: Vec<ClientEntry>,
}

/// Skills arrive either as bare strings or as `{ "text": ... }` objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AiSkill {
    Plain(String),
    Entry { text: String },
}

impl AiSkill {
    fn into_text(self) -> String {
        match self {
            AiSkill::Plain(text) | AiSkill::Entry { text } => text,
        }
    }
}

/// Validates an AI structuring response and converts it into the
/// `StructuredSections` artifact. The `Err` string names the deviation.
pub fn validate_structuring(value: Value) -> Result<StructuredSections, String> {
    if !value.is_object() {
        return Err("response is not a JSON object".to_string());
    }
    let response: AiStructuring =
        serde_json::from_value(value).map_err(|e| format!("unexpected response shape: {e}"))?;

    let sections = validate_sections(&response.sections)?;
    if sections.line_count() == 0 {
        return Err("response contains no section lines".to_string());
    }

    Ok(StructuredSections {
        source: StructuringSource::Ai,
        sections,
        structured_content: normalize_content(response.structured_content),
    })
}

/// Every section must be an array of strings. Labels map onto known sections
/// (unknown labels land in `other`); blank lines are dropped.
fn validate_sections(raw: &Map<String, Value>) -> Result<ParsedSections, String> {
    let mut parsed = ParsedSections::default();
    for (label, lines) in raw {
        let lines = lines
            .as_array()
            .ok_or_else(|| format!("section `{label}` is not an array"))?;
        let kind = SectionKind::from_label(label);
        for line in lines {
            let line = line
                .as_str()
                .ok_or_else(|| format!("section `{label}` contains a non-string line"))?;
            let line = line.trim();
            if !line.is_empty() {
                parsed.push_line(kind, line.to_string());
            }
        }
    }
    Ok(parsed)
}

// ────────────────────────────────────────────────────────────────────────────
// Normalisation
// ────────────────────────────────────────────────────────────────────────────

fn normalize_content(content: AiContent) -> StructuredContent {
    let mut skills: Vec<SkillEntry> = Vec::new();
    for skill in content.skills {
        let text = skill.into_text().trim().to_string();
        if text.is_empty()
            || skills
                .iter()
                .any(|s| s.text.eq_ignore_ascii_case(&text))
        {
            continue;
        }
        skills.push(SkillEntry { text });
    }

    StructuredContent {
        name: content.name.trim().to_string(),
        summary: content.summary.trim().to_string(),
        contact: content
            .contact
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        skills,
        experience: content
            .experience
            .into_iter()
            .filter_map(|mut e| {
                let keep = trim_fields(&mut [
                    &mut e.period,
                    &mut e.company,
                    &mut e.title,
                    &mut e.description,
                ]);
                keep.then_some(e)
            })
            .collect(),
        education: content
            .education
            .into_iter()
            .filter_map(|mut e| {
                let keep = trim_fields(&mut [&mut e.degree, &mut e.institution, &mut e.period]);
                keep.then_some(e)
            })
            .collect(),
        clients: content
            .clients
            .into_iter()
            .filter_map(|mut c| {
                let keep = trim_fields(&mut [&mut c.name, &mut c.description]);
                keep.then_some(c)
            })
            .collect(),
    }
}

/// Trims every field in place. Returns `false` when all of them are blank.
fn trim_fields(fields: &mut [&mut String]) -> bool {
    let mut any = false;
    for field in fields.iter_mut() {
        let trimmed = field.trim();
        if trimmed.len() != field.len() {
            **field = trimmed.to_string();
        }
        any |= !field.is_empty();
    }
    any
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_response() -> Value {
        json!({
            "sections": {
                "header": ["  Jane Doe  "],
                "summary": ["Backend engineer."],
                "contact": ["jane@example.com", ""],
                "experience": ["2019 - 2023 | Acme | Engineer"],
                "hobbies": ["Climbing"]
            },
            "structuredContent": {
                "name": " Jane Doe ",
                "summary": "Backend engineer.",
                "contact": ["jane@example.com", "   "],
                "skills": ["Rust", {"text": " Go "}, "rust", ""],
                "experience": [
                    {"period": "2019 - 2023", "company": "Acme", "title": "Engineer", "description": ""},
                    {"period": " ", "company": "", "title": "", "description": ""}
                ],
                "education": [
                    {"degree": "BSc", "institution": "State University"}
                ],
                "clients": [{"name": "", "description": ""}]
            }
        })
    }

    #[test]
    fn test_valid_response_is_accepted_and_normalised() {
        let structured = validate_structuring(valid_response()).unwrap();
        assert_eq!(structured.source, StructuringSource::Ai);

        let kinds: Vec<SectionKind> = structured.sections.sections.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Header,
                SectionKind::About,
                SectionKind::Contact,
                SectionKind::Experience,
                SectionKind::Other,
            ]
        );
        assert_eq!(structured.sections.lines(SectionKind::Header), ["Jane Doe"]);
        assert_eq!(structured.sections.lines(SectionKind::Contact).len(), 1);

        let content = structured.structured_content;
        assert_eq!(content.name, "Jane Doe");
        assert_eq!(content.contact, vec!["jane@example.com"]);
        let skills: Vec<&str> = content.skills.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(skills, vec!["Rust", "Go"]);
        assert_eq!(content.experience.len(), 1);
        assert_eq!(content.education[0].period, "");
        assert!(content.clients.is_empty());
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = validate_structuring(json!(["not", "an", "object"])).unwrap_err();
        assert!(err.contains("not a JSON object"));
    }

    #[test]
    fn test_missing_structured_content_is_rejected() {
        let err = validate_structuring(json!({ "sections": { "header": ["Jane"] } })).unwrap_err();
        assert!(err.contains("structuredContent"), "{err}");
    }

    #[test]
    fn test_section_must_be_string_array() {
        let mut response = valid_response();
        response["sections"]["skills"] = json!("Rust, Go");
        let err = validate_structuring(response).unwrap_err();
        assert!(err.contains("`skills` is not an array"), "{err}");

        let mut response = valid_response();
        response["sections"]["skills"] = json!(["Rust", 42]);
        let err = validate_structuring(response).unwrap_err();
        assert!(err.contains("non-string"), "{err}");
    }

    #[test]
    fn test_name_must_be_string() {
        let mut response = valid_response();
        response["structuredContent"]["name"] = json!(null);
        assert!(validate_structuring(response).is_err());
    }

    #[test]
    fn test_empty_sections_are_rejected() {
        let mut response = valid_response();
        response["sections"] = json!({ "header": ["   "] });
        let err = validate_structuring(response).unwrap_err();
        assert!(err.contains("no section lines"));
    }
}
