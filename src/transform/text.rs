use std::{borrow::Cow, sync::OnceLock};

use regex::{NoExpand, Regex};

/// Placeholder written into blank categorical fields.
pub const UNKNOWN: &str = "UNKNOWN";

/// Raw sentinel some sources use instead of [`UNKNOWN`].
pub const UNKNOWN_NA: &str = "UNKNOWN/NA";

/// Organizational suffixes stripped from manufacturer and model names.
pub const STOP_WORDS: &[&str] = &[
    "INC", "LTD", "CORP", "LLC", "CO", "CA", "DIV", "MFD", "MFG", "BY", "SALES", "FOR", "LOFT",
    "TX",
];

fn parenthetical_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(.*").expect("valid parenthetical regex"))
}

fn alternatives_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[,;&]+").expect("valid alternatives regex"))
}

fn stop_words_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(r"(?i)\b(?:{})\b\.?(\s|,|$)", STOP_WORDS.join("|"));
        Regex::new(&pattern).expect("valid stop-word regex")
    })
}

fn quotes_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"["']"#).expect("valid quotes regex"))
}

fn separators_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[,;]").expect("valid separators regex"))
}

fn trimmed(value: Cow<'_, str>) -> Cow<'_, str> {
    match value {
        Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
        Cow::Owned(s) => {
            let trimmed = s.trim();
            if trimmed.len() == s.len() {
                Cow::Owned(s)
            } else {
                Cow::Owned(trimmed.to_string())
            }
        }
    }
}

/// Applies a regex replacement while avoiding allocation when there are no matches.
fn regex_replace<'a>(value: &'a str, regex: &Regex, replacement: &str) -> Cow<'a, str> {
    if regex.is_match(value) {
        Cow::Owned(regex.replace_all(value, NoExpand(replacement)).into_owned())
    } else {
        Cow::Borrowed(value)
    }
}

/// Drops everything from the first `(` onward.
pub fn strip_parenthetical(input: &str) -> Cow<'_, str> {
    trimmed(regex_replace(input, parenthetical_regex(), ""))
}

/// Keeps only the text before the first comma, semicolon, or ampersand.
pub fn truncate_at_alternatives(input: &str) -> Cow<'_, str> {
    let head = alternatives_regex()
        .splitn(input, 2)
        .next()
        .unwrap_or_default();
    Cow::Borrowed(head.trim())
}

/// Removes organizational suffixes such as `INC` or `MFG.` on word boundaries.
pub fn strip_stop_words(input: &str) -> Cow<'_, str> {
    trimmed(regex_replace(input, stop_words_regex(), ""))
}

pub fn strip_quotes(input: &str) -> Cow<'_, str> {
    trimmed(regex_replace(input, quotes_regex(), ""))
}

/// Replaces commas and semicolons with `separator`.
pub fn replace_separators<'a>(input: &'a str, separator: &str) -> Cow<'a, str> {
    trimmed(regex_replace(input, separators_regex(), separator))
}

pub fn strip_separators(input: &str) -> Cow<'_, str> {
    replace_separators(input, "")
}

/// Maps the `UNKNOWN/NA` sentinel onto [`UNKNOWN`].
pub fn normalize_sentinel(input: &str) -> Cow<'_, str> {
    if input == UNKNOWN_NA {
        Cow::Borrowed(UNKNOWN)
    } else {
        Cow::Borrowed(input)
    }
}

/// Returns [`UNKNOWN`] when nothing but whitespace is left.
pub fn unknown_if_blank(input: &str) -> Cow<'_, str> {
    if input.trim().is_empty() {
        Cow::Borrowed(UNKNOWN)
    } else {
        Cow::Borrowed(input)
    }
}

/// Full manufacturer/model cleanup chain.
pub fn clean_make_model(input: &str) -> String {
    let value = strip_parenthetical(input);
    let value = truncate_at_alternatives(&value).into_owned();
    let value = strip_stop_words(&value).into_owned();
    let value = strip_quotes(&value).into_owned();
    unknown_if_blank(&value).into_owned()
}
