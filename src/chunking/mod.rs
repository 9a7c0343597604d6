//! Cutting token streams and raw text into model-sized pieces.

pub mod chunker;
pub mod segments;
pub mod waterfall;

pub use chunker::Chunker;
pub use segments::{split_input, split_segment, truncate_phonemes};
pub use waterfall::{find_cut, join_phonemes, join_text};

/// Soft limit on a chunk's phoneme string, in chars.
///
/// This is a proxy for the model's id budget; the encoder still enforces the hard limit.
pub const SOFT_PHONEME_BUDGET: usize = 510;
