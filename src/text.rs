//! Text Utilities
//!
//! Shared text normalization and prompt-assembly helpers. All slicing here
//! counts Unicode scalar values so multi-byte characters are never split.

use regex::Regex;
use std::sync::LazyLock;

static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("static regex"));
static MULTI_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("static regex"));

/// Prompt-injection markers scrubbed before clause text reaches a prompt
static INJECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\[SYSTEM[^\]]*\]",
        r"(?i)\[INSTRUCTION[^\]]*\]",
        r"(?i)IGNORE\s+PREVIOUS",
        r"(?i)DISREGARD\s+(?:ALL|PREVIOUS)",
        r"(?i)AI\s+REVIEWER:",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

/// Normalize extracted text.
///
/// Strips NUL and zero-width spaces, collapses runs of spaces to one and
/// runs of 3+ newlines to two, blanks whitespace-only lines, and trims.
/// Idempotent: `clean_text(clean_text(x)) == clean_text(x)`.
pub fn clean_text(text: &str) -> String {
    let text = text.replace('\x00', "").replace('\u{200b}', "");
    let text = MULTI_SPACE.replace_all(&text, " ");

    // Blank whitespace-only lines before collapsing newline runs, so the
    // blanking cannot reintroduce a run of three or more newlines
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| if line.trim().is_empty() { "" } else { line })
        .collect();
    let text = lines.join("\n");

    MULTI_NEWLINE.replace_all(&text, "\n\n").trim().to_string()
}

/// Redact prompt-injection markers from untrusted clause text
pub fn sanitize_for_llm(text: &str) -> String {
    let mut sanitized = text.to_string();
    for pattern in INJECTION_PATTERNS.iter() {
        sanitized = pattern.replace_all(&sanitized, "[REDACTED]").into_owned();
    }
    sanitized
}

/// Cap text at `max_tokens * 4` characters for prompt assembly.
///
/// Prefers cutting at the last sentence boundary when it falls beyond 80%
/// of the cap; appends `"..."` whenever truncation occurred.
pub fn truncate_for_context(text: &str, max_tokens: usize) -> String {
    let max_chars = max_tokens * 4;
    if char_count(text) <= max_chars {
        return text.to_string();
    }

    let truncated = take_chars(text, max_chars);
    match truncated.rfind('.') {
        Some(byte_idx) => {
            let period_pos = char_count(&truncated[..byte_idx]);
            if period_pos as f64 > max_chars as f64 * 0.8 {
                format!("{}...", &truncated[..=byte_idx])
            } else {
                format!("{truncated}...")
            }
        }
        None => format!("{truncated}..."),
    }
}

/// Number of Unicode scalar values in `text`
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// First `n` characters of `text`
pub fn take_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

/// Characters in the half-open range `[start, end)` of `text`
pub fn slice_chars(text: &str, start: usize, end: usize) -> String {
    text.chars().skip(start).take(end.saturating_sub(start)).collect()
}

/// Truncate to `n` characters, appending `"..."` when anything was cut
pub fn snippet(text: &str, n: usize) -> String {
    if char_count(text) <= n {
        text.to_string()
    } else {
        format!("{}...", take_chars(text, n))
    }
}
