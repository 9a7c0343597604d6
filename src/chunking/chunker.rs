use super::waterfall::{find_cut, join_phonemes, join_text};
use super::SOFT_PHONEME_BUDGET;
use crate::types::{Chunk, Token};

/// Single-pass accumulator turning a token stream into budget-sized chunks.
///
/// Iterating is lazy: each `next` pulls tokens only until one chunk is ready.
/// Chunks whose phoneme string comes out empty are swallowed.
pub struct Chunker<I> {
    source: I,
    pending: Vec<Token>,
    pending_count: usize,
    segment_index: Option<usize>,
    budget: usize,
}

impl<I> Chunker<I>
where
    I: Iterator<Item = Token>,
{
    pub fn new(tokens: impl IntoIterator<IntoIter = I>, segment_index: Option<usize>) -> Self {
        Self::with_budget(tokens, segment_index, SOFT_PHONEME_BUDGET)
    }

    pub fn with_budget(
        tokens: impl IntoIterator<IntoIter = I>,
        segment_index: Option<usize>,
        budget: usize,
    ) -> Self {
        Self {
            source: tokens.into_iter(),
            pending: Vec::new(),
            pending_count: 0,
            segment_index,
            budget,
        }
    }

    /// Adds `token` to the pending buffer, first cutting off a chunk if the token
    /// would push the buffer past the budget.
    fn push(&mut self, token: Token) -> Option<Chunk> {
        let mut piece = token.phonemes.clone();
        if token.has_trailing_space() {
            piece.push(' ');
        }
        let next_count = self.pending_count + piece.trim_end().chars().count();
        let mut piece_len = piece.chars().count();

        let mut emitted = None;
        if next_count > self.budget {
            let z = find_cut(&self.pending, next_count, self.budget);
            let rest = self.pending.split_off(z);
            let head = std::mem::replace(&mut self.pending, rest);
            let chunk = self.make_chunk(head);
            tracing::debug!(
                cut = z,
                next_count,
                text_head = %chunk.text.chars().take(30).collect::<String>(),
                "chunker: cutting chunk"
            );
            emitted = Some(chunk);

            self.pending_count = join_phonemes(&self.pending).chars().count();
            if self.pending.is_empty() {
                piece_len = piece.trim_start().chars().count();
            }
        }

        self.pending.push(token);
        self.pending_count += piece_len;
        emitted
    }

    fn make_chunk(&self, tokens: Vec<Token>) -> Chunk {
        Chunk {
            text: join_text(&tokens),
            phonemes: join_phonemes(&tokens),
            tokens,
            segment_index: self.segment_index,
        }
    }
}

impl<I> Iterator for Chunker<I>
where
    I: Iterator<Item = Token>,
{
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        loop {
            match self.source.next() {
                Some(token) => {
                    if let Some(chunk) = self.push(token) {
                        if !chunk.phonemes.is_empty() {
                            return Some(chunk);
                        }
                    }
                }
                None => {
                    if self.pending.is_empty() {
                        return None;
                    }
                    let tokens = std::mem::take(&mut self.pending);
                    self.pending_count = 0;
                    let chunk = self.make_chunk(tokens);
                    if chunk.phonemes.is_empty() {
                        return None;
                    }
                    return Some(chunk);
                }
            }
        }
    }
}
