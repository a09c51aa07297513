use once_cell::sync::Lazy;
use regex::Regex;

static FORM_CONTROLS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x1f\x0b\x0c]").expect("valid regex"));
static CONTROL_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x00-\x08\x0e-\x1f\x7f]").expect("valid regex"));
static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^가-힣a-zA-Z0-9\s\.,\-\(\)\[\]%~'"·]"#).expect("valid regex"));
static SPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r" +").expect("valid regex"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Normalize extracted text: control characters and anything outside the
/// Hangul/ASCII/punctuation allow-list become spaces, space runs collapse to
/// one, three or more newlines collapse to two, and the result is trimmed.
pub fn normalize_text(text: &str) -> String {
    let text = FORM_CONTROLS.replace_all(text, " ");
    let text = CONTROL_CHARS.replace_all(&text, " ");
    let text = DISALLOWED.replace_all(&text, " ");
    let text = SPACE_RUNS.replace_all(&text, " ");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}
