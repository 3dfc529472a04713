//! Post-processing: deterministic cleanup of model output.
//!
//! Even with "return only the text" in the prompt, models sometimes wrap
//! their answer in a code fence, emit `\r\n`, pad lines with spaces or sprinkle
//! zero-width characters copied from the source. These rules fix that without
//! touching content.
//!
//! ## Rule Order
//!
//! Fences are stripped first so the remaining rules see the real text;
//! line endings are normalised before any per-line rule runs.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clean raw extraction output.
///
/// Rules (applied in order):
/// 1. Strip an outer code fence (any language tag)
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive newlines down to one blank line
/// 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 6. Trim leading/trailing blank space of the whole text
pub fn clean_extracted_text(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

/// Clean a card-generation answer before parsing: fence, line endings and
/// invisible characters only. The parser skips blank lines itself.
pub fn clean_generation_output(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    remove_invisible_chars(&s)
}

// ── Rule 1: Strip outer fences ───────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*\r?\n(.*?)\r?\n```\s*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCE.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 5: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}
