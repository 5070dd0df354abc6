//! Splitting a Markdown body into blocks and picking which are eligible
//! for LLM annotation.

use std::sync::LazyLock;

use regex::Regex;

static BLANK_LINE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n+").expect("static regex is valid"));

/// Split `body` into blocks on one-or-more blank lines. Every block,
/// eligible or not, is retained in order.
#[must_use]
pub fn split_blocks(body: &str) -> Vec<String> {
    BLANK_LINE_SPLIT.split(body.trim_end()).map(str::to_string).collect()
}

/// Rejoin blocks with a blank line between each, the inverse of
/// [`split_blocks`].
#[must_use]
pub fn join_blocks(blocks: &[String]) -> String {
    blocks.join("\n\n")
}

/// Whether `block` qualifies for LLM annotation: non-empty after trimming,
/// not a header, not a fenced or indented code block, at least
/// `min_block_chars` long, and not a bare image.
#[must_use]
pub fn is_eligible(block: &str, min_block_chars: usize) -> bool {
    let trimmed = block.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.starts_with('#') {
        return false;
    }
    if trimmed.starts_with("```") {
        return false;
    }
    if block.lines().next().is_some_and(|line| line.starts_with("    ")) {
        return false;
    }
    if trimmed.chars().count() < min_block_chars {
        return false;
    }
    if trimmed.starts_with("![") {
        return false;
    }
    true
}

/// Indices into `blocks` of the eligible ones, in order.
#[must_use]
pub fn eligible_indices(blocks: &[String], min_block_chars: usize) -> Vec<usize> {
    blocks
        .iter()
        .enumerate()
        .filter(|(_, block)| is_eligible(block, min_block_chars))
        .map(|(index, _)| index)
        .collect()
}
