use crate::error::PipelineError;
use crate::pipeline::voices::VoicePack;
use crate::types::{SynthesisOutput, Token};

/// G2P for word-token languages: raw text → (normalized text, ordered tokens).
pub trait WordPhonemizer: Send + Sync {
    fn phonemize(&self, text: &str) -> Result<(String, Vec<Token>), PipelineError>;
}

/// G2P for languages handled by character budget: text span → phoneme string.
pub trait TextPhonemizer: Send + Sync {
    fn phonemize(&self, text: &str) -> Result<String, PipelineError>;
}

/// The acoustic model: phonemes plus one style row → audio and optional durations.
pub trait Synthesizer: Send + Sync {
    fn infer(
        &self,
        phonemes: &str,
        style: &[f32],
        speed: f32,
    ) -> Result<SynthesisOutput, PipelineError>;
}

/// Loads a single named voice embedding.
pub trait VoiceStore: Send + Sync {
    fn load(&self, name: &str) -> Result<VoicePack, PipelineError>;
}

/// Fills token timestamps from predicted durations; returns how many were aligned.
pub trait TimestampAligner: Send + Sync {
    fn align(&self, tokens: &mut [Token], pred_dur: &[u32]) -> usize;
}

/// G2P flavour a pipeline runs with; must match the language.
pub enum Phonemizer {
    Words(Box<dyn WordPhonemizer>),
    Text(Box<dyn TextPhonemizer>),
}

impl Phonemizer {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Words(_) => "word",
            Self::Text(_) => "text",
        }
    }
}
