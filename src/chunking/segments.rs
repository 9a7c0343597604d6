//! Character-budget splitting for languages whose G2P works on whole text spans
//! rather than word tokens.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Sentence terminators kept attached to the sentence they end.
pub const SENTENCE_PATTERN: &str = r"[.!?]+";

/// Sub-chunk size handed to character-budget G2P, in chars.
pub const SEGMENT_CHAR_BUDGET: usize = 400;

static SENTENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SENTENCE_PATTERN).expect("sentence pattern is valid"));

/// Splits raw input into top-level segments.
///
/// With a pattern, the trimmed text is split on every match; blank pieces are kept
/// so segment indices line up with the caller's paragraphs.
pub fn split_input(text: &str, pattern: Option<&Regex>) -> Vec<String> {
    match pattern {
        Some(re) => re.split(text.trim()).map(str::to_string).collect(),
        None => vec![text.to_string()],
    }
}

/// (sentence body + its terminator) pairs, and whether any terminator was found.
fn sentence_pairs(text: &str) -> (Vec<&str>, bool) {
    let mut pairs = Vec::new();
    let mut last = 0;
    let mut found = false;
    for m in SENTENCE_REGEX.find_iter(text) {
        found = true;
        pairs.push(&text[last..m.end()]);
        last = m.end();
    }
    pairs.push(&text[last..]);
    (pairs, found)
}

fn fixed_slices(text: &str, budget: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(budget.max(1))
        .map(|piece| piece.iter().collect::<String>().trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// Packs whole sentences into sub-chunks of at most `budget` chars.
///
/// A single sentence longer than the budget becomes its own sub-chunk. Text without
/// any sentence terminator that exceeds the budget is sliced every `budget` chars
/// instead. Sub-chunks are trimmed and blank ones dropped.
pub fn split_segment(text: &str, budget: usize) -> Vec<String> {
    let (pairs, found_terminator) = sentence_pairs(text);

    if !found_terminator && text.chars().count() > budget {
        tracing::debug!(
            chars = text.chars().count(),
            budget,
            "segments: no sentence boundaries, slicing at fixed size"
        );
        return fixed_slices(text, budget);
    }

    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for pair in pairs {
        let pair_len = pair.chars().count();
        if current_len + pair_len <= budget {
            current.push_str(pair);
            current_len += pair_len;
        } else {
            if !current.is_empty() {
                out.push(current.trim().to_string());
            }
            current = pair.to_string();
            current_len = pair_len;
        }
    }
    if !current.is_empty() {
        out.push(current.trim().to_string());
    }

    out.retain(|s| !s.is_empty());
    out
}

/// Hard cap on a G2P result for one sub-chunk, in chars.
pub fn truncate_phonemes<'a>(phonemes: &'a str, limit: usize, source_text: &str) -> Cow<'a, str> {
    match phonemes.char_indices().nth(limit) {
        Some((byte_idx, _)) => {
            tracing::warn!(
                phoneme_chars = phonemes.chars().count(),
                limit,
                text_head = %source_text.chars().take(30).collect::<String>(),
                "truncating long phoneme string"
            );
            Cow::Borrowed(&phonemes[..byte_idx])
        }
        None => Cow::Borrowed(phonemes),
    }
}
