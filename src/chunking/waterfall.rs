use crate::types::Token;

/// Boundary classes, strongest first: sentence end, clause, then comma-like.
pub const WATERFALL: [&str; 3] = ["!.?…", ":;", ",—"];

/// Closing marks that stay attached to the clause they close.
pub const BUMPS: [&str; 2] = [")", "”"];

fn is_single_of(phonemes: &str, class: &str) -> bool {
    let mut it = phonemes.chars();
    match (it.next(), it.next()) {
        (Some(c), None) => class.contains(c),
        _ => false,
    }
}

/// Picks how many of `tokens` to emit when adding one more token would bring the
/// phoneme count to `next_count`.
///
/// Walks the boundary classes in order. For each, the cut goes right after the last
/// token that is exactly one punctuation mark of that class (plus a closing bracket or
/// quote that follows it). The cut is taken only if what stays behind still fits in
/// `budget`. Falls back to `tokens.len()` when no class gives an acceptable cut.
pub fn find_cut(tokens: &[Token], next_count: usize, budget: usize) -> usize {
    for class in WATERFALL {
        let Some(last) = tokens
            .iter()
            .rposition(|t| is_single_of(&t.phonemes, class))
        else {
            continue;
        };

        let mut z = last + 1;
        if tokens
            .get(z)
            .is_some_and(|t| BUMPS.contains(&t.phonemes.as_str()))
        {
            z += 1;
        }

        let kept = join_phonemes(&tokens[..z]).chars().count();
        if next_count.saturating_sub(kept) <= budget {
            return z;
        }
    }
    tokens.len()
}

/// Phonemes of each token, followed by a space where the token had trailing
/// whitespace, trimmed as a whole.
pub fn join_phonemes(tokens: &[Token]) -> String {
    let mut out = String::new();
    for t in tokens {
        out.push_str(&t.phonemes);
        if t.has_trailing_space() {
            out.push(' ');
        }
    }
    out.trim().to_string()
}

/// Surface text with the original separators, trimmed as a whole.
pub fn join_text(tokens: &[Token]) -> String {
    let mut out = String::new();
    for t in tokens {
        out.push_str(&t.text);
        out.push_str(&t.whitespace);
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(p: &str) -> Token {
        Token::new(p, p, true)
    }

    fn punct(p: &str) -> Token {
        Token::new(p, p, false)
    }

    #[test]
    fn single_char_match_only() {
        assert!(is_single_of(".", WATERFALL[0]));
        assert!(is_single_of("…", WATERFALL[0]));
        assert!(!is_single_of("..", WATERFALL[0]));
        assert!(!is_single_of("", WATERFALL[0]));
        assert!(!is_single_of("a.", WATERFALL[0]));
    }

    #[test]
    fn cuts_after_last_sentence_end() {
        let tokens = vec![word("ab"), punct("."), word("cd"), punct("."), word("ef")];
        assert_eq!(find_cut(&tokens, 20, 510), 4);
    }

    #[test]
    fn closing_quote_stays_with_clause() {
        let tokens = vec![word("ab"), punct("."), punct("”"), word("cd")];
        assert_eq!(find_cut(&tokens, 20, 510), 3);
    }

    #[test]
    fn closing_paren_stays_with_clause() {
        let tokens = vec![word("ab"), punct("!"), punct(")"), word("cd")];
        assert_eq!(find_cut(&tokens, 20, 510), 3);
    }

    #[test]
    fn falls_through_to_weaker_class_when_overflow_too_large() {
        // Cutting at the period keeps only "ab ." (4 chars); the comma keeps 12 chars.
        let tokens = vec![
            word("ab"),
            punct("."),
            word("cdefgh"),
            punct(","),
            word("ij"),
        ];
        // next_count 20: period leaves 16 > 10, comma leaves 20 - 12 = 8 <= 10.
        assert_eq!(join_phonemes(&tokens[..4]).chars().count(), 12);
        assert_eq!(find_cut(&tokens, 20, 10), 4);
    }

    #[test]
    fn colon_preferred_over_comma() {
        let tokens = vec![word("ab"), punct(","), word("cd"), punct(";"), word("ef")];
        assert_eq!(find_cut(&tokens, 20, 510), 4);
    }

    #[test]
    fn hard_cut_without_boundaries() {
        let tokens = vec![word("ab"), word("cd"), word("ef")];
        assert_eq!(find_cut(&tokens, 20, 510), 3);
    }

    #[test]
    fn hard_cut_when_no_class_fits() {
        let tokens = vec![word("ab"), punct("."), word("cdefghijkl")];
        assert_eq!(find_cut(&tokens, 100, 10), 3);
    }

    #[test]
    fn empty_buffer_cuts_at_zero() {
        assert_eq!(find_cut(&[], 600, 510), 0);
    }

    #[test]
    fn join_rules() {
        let tokens = vec![
            Token::new("Hello", "hɛˈloʊ", true),
            Token::new("world", "wˈɚld", false),
            Token::new("!", "!", true),
        ];
        assert_eq!(join_phonemes(&tokens), "hɛˈloʊ wˈɚld!");
        assert_eq!(join_text(&tokens), "Hello world!");
    }
}
