// Prompt fragments shared by every AI call that reads résumé text.
// Call-specific templates live next to their callers in analysis/prompts.rs.

/// Appended to prompts that work from résumé text.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Use only information present in the provided résumé text. \
    Do NOT infer, interpolate, or invent employers, dates, degrees or skills. \
    If the text does not contain a field, leave it as an empty string or empty array.";

/// Upper bound on document characters sent to the model.
pub const MAX_DOCUMENT_CHARS: usize = 24_000;

/// Truncates `text` to `MAX_DOCUMENT_CHARS` on a character boundary.
pub fn clip_document(text: &str) -> &str {
    match text.char_indices().nth(MAX_DOCUMENT_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
