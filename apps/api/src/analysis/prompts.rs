// Prompt constants for résumé structuring and cover letters.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for résumé structuring. Enforces JSON-only output.
pub const STRUCTURE_SYSTEM: &str = "You are an expert résumé analyst. \
    Split a résumé into sections and extract its structured content. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Structuring prompt template. Replace `{grounding}` and `{resume_text}` before sending.
pub const STRUCTURE_PROMPT_TEMPLATE: &str = r#"Split the following résumé text into sections and extract structured content.

Return a JSON object with this EXACT schema (no extra fields):
{
  "sections": {
    "header": ["Jane Doe"],
    "about": ["Backend engineer focused on reliable systems."],
    "contact": ["jane@example.com", "+1 555 123 4567"],
    "skills": ["Rust, Go, PostgreSQL"],
    "experience": ["2019 - 2023 | Acme Corp | Senior Engineer"],
    "education": ["BSc Computer Science, State University, 2015"],
    "clients": []
  },
  "structuredContent": {
    "name": "Jane Doe",
    "summary": "Backend engineer focused on reliable systems.",
    "contact": ["jane@example.com", "+1 555 123 4567"],
    "skills": [{"text": "Rust"}, {"text": "Go"}],
    "experience": [
      {"period": "2019 - 2023", "company": "Acme Corp", "title": "Senior Engineer", "description": ""}
    ],
    "education": [
      {"degree": "BSc Computer Science", "institution": "State University", "period": "2015"}
    ],
    "clients": [
      {"name": "Globex", "description": "Payments platform migration"}
    ]
  }
}

Rules:
- Section labels are limited to: header, about, contact, skills, experience, education, clients, other.
- Every line of the résumé belongs to exactly one section, copied verbatim.
- Omit empty sections or leave them as empty arrays.
- Dates are copied as written; do not normalise them.

{grounding}

RÉSUMÉ TEXT:
{resume_text}"#;

/// System prompt for cover letters. Plain prose output.
pub const COVER_LETTER_SYSTEM: &str = "You are an experienced career writer. \
    Write concise, specific cover letters in plain text. \
    Do NOT use markdown. \
    Do NOT include placeholders such as [Company Name].";

/// Cover letter prompt template. Replace `{grounding}`, `{profile}` and
/// `{job_description}` before sending.
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"Write a cover letter for the candidate below, addressed to the role described in the job description.

Requirements:
- Three to five short paragraphs, under 350 words in total.
- Open with the role and one concrete reason the candidate fits it.
- Cite specific experience, clients or skills from the profile that match the job description.
- Close with a one-line sign-off using the candidate's name.

{grounding}

CANDIDATE PROFILE (JSON):
{profile}

JOB DESCRIPTION:
{job_description}"#;
