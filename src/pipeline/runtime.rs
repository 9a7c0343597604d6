use std::fmt;
use std::sync::Arc;
use std::vec;

use regex::Regex;

use crate::chunking::segments::SEGMENT_CHAR_BUDGET;
use crate::chunking::{
    split_input, split_segment, truncate_phonemes, Chunker, SOFT_PHONEME_BUDGET,
};
use crate::error::PipelineError;
use crate::language::Language;
use crate::pipeline::traits::{Phonemizer, Synthesizer, TimestampAligner};
use crate::pipeline::voices::{VoiceCache, VoicePack};
use crate::types::{Chunk, EncodedSequence, PipelineResult, ResultOutput, Token};
use crate::vocab::Vocabulary;

/// Raw phoneme strings longer than this many context lengths get a warning.
const RAW_PHONEME_WARN_FACTOR: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Results carry model input ids.
    EncodeOnly,
    /// Results carry audio, and tokens get timestamps when durations come back.
    Synthesize,
}

/// Speaking rate, either fixed or chosen per chunk from its phoneme length.
#[derive(Clone)]
pub enum Speed {
    Fixed(f32),
    ByLength(Arc<dyn Fn(usize) -> f32 + Send + Sync>),
}

impl Speed {
    pub fn resolve(&self, phoneme_len: usize) -> f32 {
        match self {
            Self::Fixed(speed) => *speed,
            Self::ByLength(f) => f(phoneme_len),
        }
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self::Fixed(1.0)
    }
}

impl fmt::Debug for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(speed) => f.debug_tuple("Fixed").field(speed).finish(),
            Self::ByLength(_) => f.write_str("ByLength(..)"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Voice name, or comma-separated names to blend. Required when synthesizing.
    pub voice: Option<String>,
    pub speed: Speed,
}

impl GenerateOptions {
    pub fn with_voice(voice: impl Into<String>) -> Self {
        Self {
            voice: Some(voice.into()),
            ..Self::default()
        }
    }
}

/// Either one text to split into segments, or segments given up front.
#[derive(Debug, Clone, PartialEq)]
pub enum TextInput {
    Text(String),
    Segments(Vec<String>),
}

impl From<&str> for TextInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for TextInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<String>> for TextInput {
    fn from(segments: Vec<String>) -> Self {
        Self::Segments(segments)
    }
}

pub(crate) struct SynthesisStage {
    pub synthesizer: Box<dyn Synthesizer>,
    pub voices: VoiceCache,
}

pub struct Pipeline {
    language: Language,
    vocab: Vocabulary,
    context_length: usize,
    split_pattern: Option<Regex>,
    phonemizer: Option<Phonemizer>,
    synthesis: Option<SynthesisStage>,
    timestamp_aligner: Box<dyn TimestampAligner>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("language", &self.language)
            .field("context_length", &self.context_length)
            .field("vocab_size", &self.vocab.len())
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

pub(crate) struct PipelineParts {
    pub language: Language,
    pub vocab: Vocabulary,
    pub context_length: usize,
    pub split_pattern: Option<Regex>,
    pub phonemizer: Option<Phonemizer>,
    pub synthesis: Option<SynthesisStage>,
    pub timestamp_aligner: Box<dyn TimestampAligner>,
}

impl Pipeline {
    pub(crate) fn from_parts(parts: PipelineParts) -> Self {
        Self {
            language: parts.language,
            vocab: parts.vocab,
            context_length: parts.context_length,
            split_pattern: parts.split_pattern,
            phonemizer: parts.phonemizer,
            synthesis: parts.synthesis,
            timestamp_aligner: parts.timestamp_aligner,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn context_length(&self) -> usize {
        self.context_length
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn mode(&self) -> OutputMode {
        if self.synthesis.is_some() {
            OutputMode::Synthesize
        } else {
            OutputMode::EncodeOnly
        }
    }

    pub fn encode(&self, phonemes: &str) -> Option<EncodedSequence> {
        self.vocab.encode(phonemes, self.context_length)
    }

    /// Runs raw text through G2P, chunking and encoding or synthesis.
    ///
    /// The returned stream is lazy; each item is one chunk. A failing G2P call or
    /// synthesis call yields an `Err` for that unit and the stream carries on.
    pub fn process(
        &self,
        input: impl Into<TextInput>,
        options: &GenerateOptions,
    ) -> Result<ResultStream<'_>, PipelineError> {
        if self.phonemizer.is_none() {
            return Err(PipelineError::invalid_input(
                "no phonemizer configured; use generate_from_tokens or generate_from_phonemes",
            ));
        }
        let voice = self.resolve_voice(options)?;
        let segments = match input.into() {
            TextInput::Text(text) => split_input(&text, self.split_pattern.as_ref()),
            TextInput::Segments(segments) => segments,
        };
        Ok(ResultStream {
            pipeline: self,
            voice,
            speed: options.speed.clone(),
            segments: segments.into_iter().enumerate(),
            current: None,
        })
    }

    /// Chunks an already phonemized token stream and finishes each chunk.
    pub fn generate_from_tokens(
        &self,
        tokens: Vec<Token>,
        options: &GenerateOptions,
    ) -> Result<ResultStream<'_>, PipelineError> {
        let voice = self.resolve_voice(options)?;
        Ok(ResultStream {
            pipeline: self,
            voice,
            speed: options.speed.clone(),
            segments: Vec::new().into_iter().enumerate(),
            current: Some(SegmentWork::Words(Chunker::new(tokens, None))),
        })
    }

    /// Finishes a raw phoneme string as a single unit, without chunking.
    ///
    /// Returns `Ok(None)` when there is nothing to produce.
    pub fn generate_from_phonemes(
        &self,
        phonemes: &str,
        options: &GenerateOptions,
    ) -> Result<Option<PipelineResult>, PipelineError> {
        let voice = self.resolve_voice(options)?;
        if self.synthesis.is_some()
            && phonemes.chars().count() > self.context_length * RAW_PHONEME_WARN_FACTOR
        {
            tracing::warn!(
                phoneme_chars = phonemes.chars().count(),
                context_length = self.context_length,
                "phoneme string is very long and may exceed the model context"
            );
        }
        self.finish(
            None,
            String::new(),
            phonemes.to_string(),
            None,
            voice.as_deref(),
            &options.speed,
        )
        .transpose()
    }

    fn resolve_voice(
        &self,
        options: &GenerateOptions,
    ) -> Result<Option<Arc<VoicePack>>, PipelineError> {
        let Some(stage) = &self.synthesis else {
            return Ok(None);
        };
        let name = options.voice.as_deref().ok_or_else(|| {
            PipelineError::invalid_input("a voice is required when synthesizing audio")
        })?;
        stage.voices.load(name).map(Some)
    }

    /// Encodes or synthesizes one unit. `None` means the unit produced nothing.
    fn finish(
        &self,
        text_index: Option<usize>,
        graphemes: String,
        phonemes: String,
        mut tokens: Option<Vec<Token>>,
        voice: Option<&VoicePack>,
        speed: &Speed,
    ) -> Option<Result<PipelineResult, PipelineError>> {
        if phonemes.is_empty() {
            return None;
        }

        let output = match (&self.synthesis, voice) {
            (Some(stage), Some(voice)) => {
                let phoneme_len = phonemes.chars().count();
                let Some(style) = voice.style_for(phoneme_len) else {
                    return Some(Err(PipelineError::invalid_input(
                        "voice pack has no style rows",
                    )));
                };
                let output = match stage.synthesizer.infer(
                    &phonemes,
                    style,
                    speed.resolve(phoneme_len),
                ) {
                    Ok(output) => output,
                    Err(err) => return Some(Err(err)),
                };
                if let (Some(tokens), Some(pred_dur)) =
                    (tokens.as_mut(), output.pred_dur.as_deref())
                {
                    let aligned = self.timestamp_aligner.align(tokens, pred_dur);
                    tracing::debug!(aligned, tokens = tokens.len(), "aligned chunk timestamps");
                }
                ResultOutput::Synthesized(output)
            }
            (Some(_), None) => {
                return Some(Err(PipelineError::invalid_input(
                    "a voice is required when synthesizing audio",
                )))
            }
            (None, _) => ResultOutput::Encoded(self.encode(&phonemes)?),
        };

        Some(Ok(PipelineResult {
            text_index,
            graphemes,
            phonemes,
            tokens,
            output,
        }))
    }
}

enum SegmentWork {
    Words(Chunker<vec::IntoIter<Token>>),
    Spans {
        index: usize,
        spans: vec::IntoIter<String>,
    },
}

/// Lazy sequence of per-chunk results.
pub struct ResultStream<'p> {
    pipeline: &'p Pipeline,
    voice: Option<Arc<VoicePack>>,
    speed: Speed,
    segments: std::iter::Enumerate<vec::IntoIter<String>>,
    current: Option<SegmentWork>,
}

impl ResultStream<'_> {
    /// Starts work on the next non-blank segment. Returns an error item when its G2P fails.
    fn open_segment(&mut self) -> Option<Option<PipelineError>> {
        let (index, text) = self.segments.next()?;
        if text.trim().is_empty() {
            return Some(None);
        }
        let head: String = text.chars().take(50).collect();
        match self.pipeline.phonemizer.as_ref() {
            Some(Phonemizer::Words(g2p)) => {
                tracing::debug!(index, text_head = %head, "processing word-token segment");
                match g2p.phonemize(&text) {
                    Ok((_, tokens)) => {
                        self.current =
                            Some(SegmentWork::Words(Chunker::new(tokens, Some(index))));
                        Some(None)
                    }
                    Err(err) => Some(Some(err)),
                }
            }
            Some(Phonemizer::Text(_)) => {
                tracing::debug!(index, text_head = %head, "processing character-budget segment");
                let spans = split_segment(&text, SEGMENT_CHAR_BUDGET);
                self.current = Some(SegmentWork::Spans {
                    index,
                    spans: spans.into_iter(),
                });
                Some(None)
            }
            None => Some(Some(PipelineError::invalid_input("no phonemizer configured"))),
        }
    }

    fn next_from_current(&mut self) -> Option<Result<PipelineResult, PipelineError>> {
        let pipeline = self.pipeline;
        let voice = self.voice.as_deref();
        loop {
            match self.current.as_mut()? {
                SegmentWork::Words(chunker) => {
                    let Chunk {
                        text,
                        phonemes,
                        tokens,
                        segment_index,
                    } = chunker.next()?;
                    if let Some(result) = pipeline.finish(
                        segment_index,
                        text,
                        phonemes,
                        Some(tokens),
                        voice,
                        &self.speed,
                    ) {
                        return Some(result);
                    }
                }
                SegmentWork::Spans { index, spans } => {
                    let index = *index;
                    let span = spans.next()?;
                    let Some(Phonemizer::Text(g2p)) = pipeline.phonemizer.as_ref() else {
                        return None;
                    };
                    let phonemes = match g2p.phonemize(&span) {
                        Ok(ps) => ps,
                        Err(err) => return Some(Err(err)),
                    };
                    let phonemes =
                        truncate_phonemes(&phonemes, SOFT_PHONEME_BUDGET, &span).into_owned();
                    if let Some(result) =
                        pipeline.finish(Some(index), span, phonemes, None, voice, &self.speed)
                    {
                        return Some(result);
                    }
                }
            }
        }
    }
}

impl Iterator for ResultStream<'_> {
    type Item = Result<PipelineResult, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_some() {
                if let Some(item) = self.next_from_current() {
                    return Some(item);
                }
                self.current = None;
            }
            match self.open_segment()? {
                Some(err) => return Some(Err(err)),
                None => continue,
            }
        }
    }
}
