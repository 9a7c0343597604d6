use std::collections::HashMap;

use crate::types::{EncodedSequence, BOS_ID, EOS_ID};

/// Immutable phoneme symbol → model id table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    ids: HashMap<char, u32>,
}

impl Vocabulary {
    /// Builds the table from a config `vocab` object. Keys that are not exactly one
    /// char cannot be produced by per-char lookup and are ignored.
    pub fn from_raw(raw: HashMap<String, u32>) -> Self {
        let ids = raw
            .into_iter()
            .filter_map(|(k, v)| {
                let mut it = k.chars();
                let c = it.next()?;
                if it.next().is_some() {
                    return None;
                }
                Some((c, v))
            })
            .collect();
        Self { ids }
    }

    pub fn get(&self, symbol: char) -> Option<u32> {
        self.ids.get(&symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Maps a phoneme string to `[BOS, ids.., EOS]`, never longer than `context_length`.
    ///
    /// Symbols missing from the table are dropped. When more than
    /// `context_length - 2` ids remain the tail is cut off and a warning is logged.
    /// Returns `None` for an empty phoneme string, or when `context_length` cannot hold
    /// the two markers.
    pub fn encode(&self, phonemes: &str, context_length: usize) -> Option<EncodedSequence> {
        if phonemes.is_empty() || context_length < 2 {
            return None;
        }

        let mut mapped: Vec<u32> = phonemes.chars().filter_map(|c| self.get(c)).collect();

        let max_tokens = context_length.saturating_sub(2);
        let mut truncated_from = None;
        if mapped.len() > max_tokens {
            let head: String = phonemes.chars().take(30).collect();
            tracing::warn!(
                phonemes_head = %head,
                token_count = mapped.len(),
                max_tokens,
                context_length,
                "phoneme string exceeds the model context; truncating tokens"
            );
            truncated_from = Some(mapped.len());
            mapped.truncate(max_tokens);
        }

        let mut ids = Vec::with_capacity(mapped.len() + 2);
        ids.push(BOS_ID);
        ids.extend(mapped);
        ids.push(EOS_ID);
        Some(EncodedSequence {
            ids,
            truncated_from,
        })
    }
}
