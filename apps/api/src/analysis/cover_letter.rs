//! Cover letters built from structured résumé content.
//!
//! The AI path renders `COVER_LETTER_PROMPT_TEMPLATE`; the template path is a
//! deterministic letter assembled from the same content, used when no client
//! is configured or the client fails.

use crate::analysis::prompts::COVER_LETTER_PROMPT_TEMPLATE;
use crate::llm_client::prompts::{clip_document, GROUNDING_INSTRUCTION};
use crate::models::resume::StructuredContent;

const MAX_ROLE_CHARS: usize = 80;
const MAX_CITED_ROLES: usize = 2;
const MAX_CITED_SKILLS: usize = 5;
const MAX_CITED_CLIENTS: usize = 3;

pub fn build_cover_letter_prompt(
    content: &StructuredContent,
    job_description: &str,
) -> Result<String, serde_json::Error> {
    let profile = serde_json::to_string_pretty(content)?;
    Ok(COVER_LETTER_PROMPT_TEMPLATE
        .replace("{grounding}", GROUNDING_INSTRUCTION)
        .replace("{profile}", &profile)
        .replace("{job_description}", clip_document(job_description.trim())))
}

/// First non-blank line of the job description, clipped, used as the role name.
fn role_line(job_description: &str) -> Option<String> {
    let line = job_description
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())?;
    let role: String = line.chars().take(MAX_ROLE_CHARS).collect();
    Some(role.trim_end_matches(['.', ':', ',', ' ']).to_string())
}

/// "A", "A and B", "A, B and C".
fn join_natural(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [one] => one.to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

/// Deterministic letter assembled from structured content only.
pub fn template_cover_letter(content: &StructuredContent, job_description: &str) -> String {
    let mut paragraphs: Vec<String> = Vec::new();

    let mut opening = match role_line(job_description) {
        Some(role) => format!("I am writing to apply for the {role} position."),
        None => "I am writing to apply for the position you advertised.".to_string(),
    };
    if !content.summary.is_empty() {
        opening.push(' ');
        opening.push_str(&content.summary);
        if !content.summary.ends_with(['.', '!', '?']) {
            opening.push('.');
        }
    }
    paragraphs.push(opening);

    let roles: Vec<String> = content
        .experience
        .iter()
        .take(MAX_CITED_ROLES)
        .filter_map(|e| match (e.title.is_empty(), e.company.is_empty()) {
            (false, false) => Some(format!("{} at {}", e.title, e.company)),
            (false, true) => Some(e.title.clone()),
            (true, false) => Some(format!("a role at {}", e.company)),
            (true, true) => None,
        })
        .collect();
    if !roles.is_empty() {
        let roles: Vec<&str> = roles.iter().map(String::as_str).collect();
        paragraphs.push(format!(
            "My recent experience includes {}.",
            join_natural(&roles)
        ));
    }

    let clients: Vec<&str> = content
        .clients
        .iter()
        .take(MAX_CITED_CLIENTS)
        .map(|c| c.name.as_str())
        .filter(|n| !n.is_empty())
        .collect();
    if !clients.is_empty() {
        paragraphs.push(format!(
            "I have delivered work for clients including {}.",
            join_natural(&clients)
        ));
    }

    let skills: Vec<&str> = content
        .skills
        .iter()
        .take(MAX_CITED_SKILLS)
        .map(|s| s.text.as_str())
        .collect();
    if !skills.is_empty() {
        paragraphs.push(format!(
            "I would bring strengths in {} to your team.",
            join_natural(&skills)
        ));
    }

    paragraphs.push("Thank you for your time and consideration.".to_string());

    let name = if content.name.is_empty() {
        "The applicant"
    } else {
        content.name.as_str()
    };

    format!(
        "Dear Hiring Manager,\n\n{}\n\nSincerely,\n{name}\n",
        paragraphs.join("\n\n")
    )
}
