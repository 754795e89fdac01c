//! Response parsing for LLM outputs.
//!
//! Completion services routinely wrap SQL in markdown fences even when told
//! not to, so every synthesized statement goes through [`normalize_sql`].

use regex::Regex;
use std::sync::OnceLock;

fn leading_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^```\w*\n?").expect("leading fence pattern is valid"))
}

fn trailing_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n?```$").expect("trailing fence pattern is valid"))
}

fn trailing_terminator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r";\s*$").expect("terminator pattern is valid"))
}

/// Normalizes a raw completion into a single SQL statement.
///
/// Strips a leading fence marker (with optional language tag), a trailing
/// fence marker, surrounding whitespace and one trailing `;`. When the model
/// wrapped a fenced block in prose, the first `sql` (or untagged) block is
/// used instead. Returns `None` when nothing is left.
pub fn normalize_sql(raw: &str) -> Option<String> {
    let trimmed = raw.trim();

    let unfenced = leading_fence().replace(trimmed, "");
    let unfenced = trailing_fence().replace(&unfenced, "");
    let mut sql = unfenced.trim().to_string();

    if sql.contains("```") {
        if let Some(block) =
            extract_code_block(trimmed, "sql").or_else(|| extract_code_block(trimmed, ""))
        {
            sql = block.trim().to_string();
        }
    }

    let sql = trailing_terminator().replace(&sql, "").trim_end().to_string();

    if sql.is_empty() {
        None
    } else {
        Some(sql)
    }
}

/// Extracts content from a markdown code block with the specified language.
///
/// Pass an empty string for `lang` to match blocks without a language specifier.
fn extract_code_block(text: &str, lang: &str) -> Option<String> {
    let start_pattern = format!("```{}", lang);

    let start_idx = text.find(&start_pattern)?;

    let content_start = text[start_idx + start_pattern.len()..]
        .find('\n')
        .map(|i| start_idx + start_pattern.len() + i + 1)?;

    // Text between the fence and the newline is a language tag.
    if lang.is_empty() {
        let after_fence = &text[start_idx + 3..content_start - 1];
        if !after_fence.trim().is_empty() {
            return None;
        }
    }

    let end_idx = text[content_start..].find("```")?;

    Some(text[content_start..content_start + end_idx].to_string())
}
