use crate::types::Token;

/// Converts the model's duration units to seconds. Tied to the synthesis model's
/// frame rate.
pub const DURATION_DIVISOR: f64 = 80.0;

/// Duration units of leading silence that are not attributed to the first word.
pub const LEADING_SILENCE_OFFSET: u32 = 3;

/// Assigns `start_ts`/`end_ts` to `tokens` from the per-position durations the model
/// predicted for the chunk they were synthesized from.
///
/// `pred_dur[0]` is leading silence and the last entry is trailing silence; every
/// phoneme char in between owns one entry, followed by one more for the pause after a
/// token with trailing whitespace. Tokens without phonemes consume nothing and get no
/// timestamps. Alignment stops early, leaving later tokens untouched, when the array
/// runs out.
///
/// Returns the number of tokens that received timestamps.
pub fn join_timestamps(tokens: &mut [Token], pred_dur: &[u32]) -> usize {
    if tokens.is_empty() || pred_dur.len() < 3 {
        return 0;
    }

    // Entries are counted on both sides of a frame boundary, hence the doubling.
    let mut left = 2 * u64::from(pred_dur[0].saturating_sub(LEADING_SILENCE_OFFSET));
    let mut right = left;
    let last = pred_dur.len() - 1;
    let mut i = 1usize;
    let mut aligned = 0usize;

    for token in tokens.iter_mut() {
        if i >= last {
            break;
        }
        if token.phonemes.is_empty() {
            continue;
        }

        let n = token.phoneme_len();
        if i + n > last {
            tracing::warn!(
                token = token.text.as_str(),
                needed = n,
                available = last - i,
                "timestamps: not enough durations for token; stopping"
            );
            break;
        }

        token.start_ts = Some(left as f64 / DURATION_DIVISOR);
        let token_dur: u64 = pred_dur[i..i + n].iter().map(|&d| u64::from(d)).sum();

        let mut space_dur = 0u64;
        if token.has_trailing_space() {
            if i + n < last {
                space_dur = u64::from(pred_dur[i + n]);
            } else {
                tracing::warn!(
                    token = token.text.as_str(),
                    "timestamps: no duration for the pause after token"
                );
            }
        }

        left = right + 2 * token_dur + space_dur;
        token.end_ts = Some(left as f64 / DURATION_DIVISOR);
        right = left + space_dur;

        i += n + usize::from(token.has_trailing_space());
        aligned += 1;
    }

    aligned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn single_token_consumes_its_phoneme_entries() {
        let mut tokens = vec![Token::new("abc", "abc", false)];
        let aligned = join_timestamps(&mut tokens, &[5, 2, 2, 2, 5]);
        assert_eq!(aligned, 1);
        // left = 2 * (5 - 3) = 4; end = 4 + 2 * 6 = 16
        assert!(close(tokens[0].start_ts, 4.0 / 80.0));
        assert!(close(tokens[0].end_ts, 16.0 / 80.0));
    }

    #[test]
    fn too_few_entries_do_nothing() {
        let mut tokens = vec![Token::new("a", "a", false)];
        assert_eq!(join_timestamps(&mut tokens, &[5, 5]), 0);
        assert!(tokens[0].start_ts.is_none());
        assert_eq!(join_timestamps(&mut [], &[1, 2, 3, 4]), 0);
    }

    #[test]
    fn short_leading_silence_clamps_to_zero() {
        let mut tokens = vec![Token::new("a", "a", false)];
        join_timestamps(&mut tokens, &[1, 4, 0]);
        assert!(close(tokens[0].start_ts, 0.0));
        assert!(close(tokens[0].end_ts, 8.0 / 80.0));
    }

    #[test]
    fn pause_after_word_separates_tokens() {
        let mut tokens = vec![
            Token::new("ab", "ab", true),
            Token::new("c", "c", false),
        ];
        // [lead, a, b, space, c, trail]
        let aligned = join_timestamps(&mut tokens, &[3, 1, 1, 4, 2, 9]);
        assert_eq!(aligned, 2);
        // word 1: left = 0 + 2*2 + 4 = 8, right = 12
        assert!(close(tokens[0].start_ts, 0.0));
        assert!(close(tokens[0].end_ts, 8.0 / 80.0));
        // word 2 starts at left (8), ends at right + 2*2 = 16
        assert!(close(tokens[1].start_ts, 8.0 / 80.0));
        assert!(close(tokens[1].end_ts, 16.0 / 80.0));
    }

    #[test]
    fn empty_phoneme_tokens_are_skipped() {
        let mut tokens = vec![
            Token::new("“", "", false),
            Token::new("a", "a", false),
        ];
        assert_eq!(join_timestamps(&mut tokens, &[3, 2, 3]), 1);
        assert!(tokens[0].start_ts.is_none());
        assert!(close(tokens[1].end_ts, 4.0 / 80.0));
    }

    #[test]
    fn stops_when_durations_run_out() {
        let mut tokens = vec![
            Token::new("ab", "ab", true),
            Token::new("cde", "cde", false),
        ];
        let aligned = join_timestamps(&mut tokens, &[3, 1, 1, 1, 1, 3]);
        assert_eq!(aligned, 1);
        assert!(tokens[0].end_ts.is_some());
        assert!(tokens[1].start_ts.is_none());
        assert!(tokens[1].end_ts.is_none());
    }

    #[test]
    fn missing_space_entry_counts_as_zero() {
        let mut tokens = vec![Token::new("ab", "ab", true)];
        assert_eq!(join_timestamps(&mut tokens, &[3, 1, 1, 7]), 1);
        assert!(close(tokens[0].end_ts, 4.0 / 80.0));
    }

    #[test]
    fn timestamps_are_monotonic() {
        let mut tokens: Vec<Token> = ["ðə", "kwɪk", "bɹaʊn", "fɑks"]
            .iter()
            .map(|p| Token::new(*p, *p, true))
            .collect();
        let total: usize = tokens.iter().map(|t| t.phoneme_len() + 1).sum();
        let pred_dur: Vec<u32> = (0..total + 2).map(|k| (k % 5) as u32).collect();
        assert_eq!(join_timestamps(&mut tokens, &pred_dur), 4);
        let mut prev_end = 0.0;
        for t in &tokens {
            let (start, end) = (t.start_ts.unwrap(), t.end_ts.unwrap());
            assert!(start <= end);
            assert!(start >= prev_end - 1e-12);
            prev_end = end;
        }
    }
}
