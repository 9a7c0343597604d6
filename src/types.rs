use serde::{Deserialize, Deserializer, Serialize};

/// One word-like unit produced by an external G2P step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    /// Phonemic transcription. Empty for out-of-vocabulary or non-speech tokens.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phonemes: String,
    /// Separator that followed the token in the original text, empty when none.
    #[serde(default, deserialize_with = "flag_or_string")]
    pub whitespace: String,
    /// Start time in seconds, filled by timestamp alignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_ts: Option<f64>,
    /// End time in seconds, filled by timestamp alignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_ts: Option<f64>,
}

impl Token {
    pub fn new(text: impl Into<String>, phonemes: impl Into<String>, whitespace: bool) -> Self {
        Self {
            text: text.into(),
            phonemes: phonemes.into(),
            whitespace: if whitespace { " ".to_string() } else { String::new() },
            start_ts: None,
            end_ts: None,
        }
    }

    pub fn has_trailing_space(&self) -> bool {
        !self.whitespace.is_empty()
    }

    /// Phoneme length in chars, which is what every budget in this crate counts.
    pub fn phoneme_len(&self) -> usize {
        self.phonemes.chars().count()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn flag_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Whitespace {
        Flag(bool),
        Text(String),
    }

    Ok(match Option::<Whitespace>::deserialize(deserializer)? {
        Some(Whitespace::Flag(true)) => " ".to_string(),
        Some(Whitespace::Flag(false)) | None => String::new(),
        Some(Whitespace::Text(s)) => s,
    })
}

/// A budget-respecting contiguous run of tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub phonemes: String,
    pub tokens: Vec<Token>,
    /// Index of the top-level text segment the tokens came from, if known.
    pub segment_index: Option<usize>,
}

pub const BOS_ID: u32 = 0;
pub const EOS_ID: u32 = 0;

/// Model input ids: `[BOS_ID, id_1, .., id_k, EOS_ID]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedSequence {
    pub ids: Vec<u32>,
    /// Number of mapped ids before truncation, set only when truncation happened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated_from: Option<usize>,
}

impl EncodedSequence {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated_from.is_some()
    }
}

/// What an external synthesis model hands back for one phoneme string.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SynthesisOutput {
    pub audio: Vec<f32>,
    /// Per-position predicted durations, when the model exposes them.
    pub pred_dur: Option<Vec<u32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultOutput {
    Encoded(EncodedSequence),
    Synthesized(SynthesisOutput),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    /// Index of the originating text segment; `None` for pre-tokenized or raw phoneme input.
    pub text_index: Option<usize>,
    pub graphemes: String,
    pub phonemes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<Token>>,
    pub output: ResultOutput,
}

impl PipelineResult {
    pub fn input_ids(&self) -> Option<&[u32]> {
        match &self.output {
            ResultOutput::Encoded(seq) => Some(&seq.ids),
            ResultOutput::Synthesized(_) => None,
        }
    }

    pub fn audio(&self) -> Option<&[f32]> {
        match &self.output {
            ResultOutput::Synthesized(out) => Some(&out.audio),
            ResultOutput::Encoded(_) => None,
        }
    }

    pub fn pred_dur(&self) -> Option<&[u32]> {
        match &self.output {
            ResultOutput::Synthesized(out) => out.pred_dur.as_deref(),
            ResultOutput::Encoded(_) => None,
        }
    }
}
