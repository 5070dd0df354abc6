//! Cleanup passes applied to already-converted markdown.
//!
//! `html2md` occasionally leaves whitespace inside bold markers (`** text **`)
//! when the source HTML had padding inside a `<strong>` tag. This module
//! collapses that padding without touching emphasis that's already correct.

use regex::Regex;
use std::sync::LazyLock;

static BOLD_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("SAFETY: hardcoded regex is statically valid"));

static SPACE_BEFORE_PUNCT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*\s+([.,;:!?])").expect("SAFETY: hardcoded regex is statically valid")
});

/// Strip leading/trailing whitespace inside `**bold**` markers, and the space
/// markdown converters sometimes leave between a closing marker and trailing
/// punctuation (`**text** :` -> `**text**:`).
#[must_use]
pub fn fix_bold_internal_spacing(input: &str) -> String {
    let trimmed = BOLD_SPAN.replace_all(input, |caps: &regex::Captures| {
        format!("**{}**", caps[1].trim())
    });
    SPACE_BEFORE_PUNCT.replace_all(&trimmed, "**$1").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_padding_on_both_sides() {
        assert_eq!(fix_bold_internal_spacing("** text **"), "**text**");
    }

    #[test]
    fn collapses_space_before_trailing_colon() {
        assert_eq!(fix_bold_internal_spacing("**text** :"), "**text**:");
    }

    #[test]
    fn leaves_correct_formatting_untouched() {
        assert_eq!(fix_bold_internal_spacing("This is **correct** formatting."), "This is **correct** formatting.");
    }
}
