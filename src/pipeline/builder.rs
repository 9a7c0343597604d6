use regex::Regex;

use crate::config::{ModelConfig, PipelineConfig};
use crate::error::PipelineError;
use crate::language::Language;
use crate::pipeline::defaults::DurationTimestampAligner;
use crate::pipeline::runtime::{Pipeline, PipelineParts, SynthesisStage};
use crate::pipeline::traits::{
    Phonemizer, Synthesizer, TextPhonemizer, TimestampAligner, VoiceStore, WordPhonemizer,
};
use crate::pipeline::voices::VoiceCache;
use crate::vocab::Vocabulary;

pub struct PipelineBuilder {
    config: PipelineConfig,
    model_config: Option<ModelConfig>,
    phonemizer: Option<Phonemizer>,
    synthesizer: Option<Box<dyn Synthesizer>>,
    voice_store: Option<Box<dyn VoiceStore>>,
    timestamp_aligner: Option<Box<dyn TimestampAligner>>,
}

impl PipelineBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            model_config: None,
            phonemizer: None,
            synthesizer: None,
            voice_store: None,
            timestamp_aligner: None,
        }
    }

    /// Uses an already parsed model config instead of reading one from disk.
    pub fn with_model_config(mut self, model_config: ModelConfig) -> Self {
        self.model_config = Some(model_config);
        self
    }

    pub fn with_word_phonemizer(mut self, phonemizer: Box<dyn WordPhonemizer>) -> Self {
        self.phonemizer = Some(Phonemizer::Words(phonemizer));
        self
    }

    pub fn with_text_phonemizer(mut self, phonemizer: Box<dyn TextPhonemizer>) -> Self {
        self.phonemizer = Some(Phonemizer::Text(phonemizer));
        self
    }

    /// Switches the pipeline to audio output. Requires a voice store as well.
    pub fn with_synthesizer(mut self, synthesizer: Box<dyn Synthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn with_voice_store(mut self, voice_store: Box<dyn VoiceStore>) -> Self {
        self.voice_store = Some(voice_store);
        self
    }

    pub fn with_timestamp_aligner(mut self, timestamp_aligner: Box<dyn TimestampAligner>) -> Self {
        self.timestamp_aligner = Some(timestamp_aligner);
        self
    }

    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let language = Language::parse(&self.config.lang_code)?;

        let model_config = match self.model_config {
            Some(model_config) => model_config,
            None => {
                let path = self.config.resolved_config_path();
                tracing::info!(path = %path.display(), "loading bundled model config");
                ModelConfig::load(&path)?
            }
        };
        let context_length = model_config.context_length().ok_or_else(|| {
            PipelineError::config(format!(
                "context length (plbert.max_position_embeddings) not found for '{}'",
                self.config.repo_id
            ))
        })?;
        if context_length <= 2 {
            return Err(PipelineError::config(format!(
                "context length {context_length} leaves no room between BOS and EOS"
            )));
        }
        let vocab = model_config
            .vocab
            .map(Vocabulary::from_raw)
            .ok_or_else(|| {
                PipelineError::config(format!("vocabulary not found for '{}'", self.config.repo_id))
            })?;

        let split_pattern = self
            .config
            .split_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| PipelineError::config(format!("invalid split pattern: {e}")))?;

        if let Some(phonemizer) = &self.phonemizer {
            let expected = if language.uses_word_tokens() { "word" } else { "text" };
            if phonemizer.kind() != expected {
                return Err(PipelineError::config(format!(
                    "language '{}' needs a {expected} phonemizer, got a {} phonemizer",
                    language.name(),
                    phonemizer.kind()
                )));
            }
        }

        let synthesis = match (self.synthesizer, self.voice_store) {
            (Some(synthesizer), Some(store)) => Some(SynthesisStage {
                synthesizer,
                voices: VoiceCache::new(store, language),
            }),
            (Some(_), None) => {
                return Err(PipelineError::config(
                    "a synthesizer was configured without a voice store",
                ))
            }
            (None, _) => None,
        };

        tracing::info!(
            lang = %language.code(),
            repo_id = self.config.repo_id.as_str(),
            context_length,
            vocab_size = vocab.len(),
            synthesize = synthesis.is_some(),
            "pipeline initialized"
        );

        Ok(Pipeline::from_parts(PipelineParts {
            language,
            vocab,
            context_length,
            split_pattern,
            phonemizer: self.phonemizer,
            synthesis,
            timestamp_aligner: self
                .timestamp_aligner
                .unwrap_or_else(|| Box::new(DurationTimestampAligner)),
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::pipeline::runtime::OutputMode;
    use crate::pipeline::voices::VoicePack;
    use crate::types::{SynthesisOutput, Token};

    struct NullSynth;

    impl Synthesizer for NullSynth {
        fn infer(&self, _: &str, _: &[f32], _: f32) -> Result<SynthesisOutput, PipelineError> {
            Ok(SynthesisOutput::default())
        }
    }

    struct NullVoices;

    impl VoiceStore for NullVoices {
        fn load(&self, _: &str) -> Result<VoicePack, PipelineError> {
            Ok(VoicePack::new(vec![vec![0.0]]))
        }
    }

    struct NullWords;

    impl WordPhonemizer for NullWords {
        fn phonemize(&self, text: &str) -> Result<(String, Vec<Token>), PipelineError> {
            Ok((text.to_string(), Vec::new()))
        }
    }

    struct NullText;

    impl TextPhonemizer for NullText {
        fn phonemize(&self, _: &str) -> Result<String, PipelineError> {
            Ok(String::new())
        }
    }

    const MINIMAL_CONFIG_JSON: &str = r#"{
        "plbert": {"max_position_embeddings": 512},
        "vocab": {"a": 43, "b": 44, " ": 16, "ab": 99}
    }"#;

    fn model_config() -> ModelConfig {
        ModelConfig::from_json(MINIMAL_CONFIG_JSON).expect("valid config")
    }

    #[test]
    fn builds_encode_only_pipeline_from_model_config() {
        let pipeline = PipelineBuilder::new(PipelineConfig::default())
            .with_model_config(model_config())
            .build()
            .expect("build should succeed");
        assert_eq!(pipeline.mode(), OutputMode::EncodeOnly);
        assert_eq!(pipeline.context_length(), 512);
        assert_eq!(pipeline.vocabulary().len(), 3);
        assert_eq!(pipeline.language(), Language::AmericanEnglish);
    }

    #[test]
    fn build_reads_bundled_config_from_disk() {
        let dir = std::env::temp_dir().join("kokoro_prep_builder_bundled");
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("hexgrad_Kokoro_82M_config.json");
        std::fs::write(&path, MINIMAL_CONFIG_JSON).expect("write config");

        let config = PipelineConfig {
            config_dir: dir.clone(),
            ..PipelineConfig::default()
        };
        let pipeline = PipelineBuilder::new(config).build().expect("build should succeed");
        assert_eq!(pipeline.context_length(), 512);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn build_fails_on_missing_config_file() {
        let config = PipelineConfig {
            config_path: Some(PathBuf::from("/nonexistent/config.json")),
            ..PipelineConfig::default()
        };
        let err = PipelineBuilder::new(config).build().unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }

    #[test]
    fn build_fails_on_malformed_config_file() {
        let path = std::env::temp_dir().join("kokoro_prep_builder_malformed.json");
        std::fs::write(&path, "{ not json").expect("write config");
        let config = PipelineConfig {
            config_path: Some(path.clone()),
            ..PipelineConfig::default()
        };
        let err = PipelineBuilder::new(config).build().unwrap_err();
        assert!(matches!(err, PipelineError::Json { .. }));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn build_fails_without_vocab_or_context_length() {
        let no_vocab = ModelConfig::from_json(r#"{"plbert": {"max_position_embeddings": 512}}"#)
            .expect("valid json");
        let err = PipelineBuilder::new(PipelineConfig::default())
            .with_model_config(no_vocab)
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));

        let no_context = ModelConfig::from_json(r#"{"vocab": {"a": 1}}"#).expect("valid json");
        let err = PipelineBuilder::new(PipelineConfig::default())
            .with_model_config(no_context)
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));
    }

    #[test]
    fn build_rejects_tiny_context_length() {
        let tiny = ModelConfig::from_json(
            r#"{"vocab": {"a": 1}, "plbert": {"max_position_embeddings": 2}}"#,
        )
        .expect("valid json");
        let err = PipelineBuilder::new(PipelineConfig::default())
            .with_model_config(tiny)
            .build()
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn build_rejects_unknown_language() {
        let err = PipelineBuilder::new(PipelineConfig::new("kl"))
            .with_model_config(model_config())
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedLanguage { .. }));
    }

    #[test]
    fn build_rejects_invalid_split_pattern() {
        let config = PipelineConfig {
            split_pattern: Some("(".to_string()),
            ..PipelineConfig::default()
        };
        let err = PipelineBuilder::new(config)
            .with_model_config(model_config())
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));
    }

    #[test]
    fn build_checks_phonemizer_kind_against_language() {
        let err = PipelineBuilder::new(PipelineConfig::new("en-us"))
            .with_model_config(model_config())
            .with_text_phonemizer(Box::new(NullText))
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));

        let err = PipelineBuilder::new(PipelineConfig::new("ja"))
            .with_model_config(model_config())
            .with_word_phonemizer(Box::new(NullWords))
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));

        assert!(PipelineBuilder::new(PipelineConfig::new("ja"))
            .with_model_config(model_config())
            .with_text_phonemizer(Box::new(NullText))
            .build()
            .is_ok());
    }

    #[test]
    fn synthesizer_requires_voice_store() {
        let err = PipelineBuilder::new(PipelineConfig::default())
            .with_model_config(model_config())
            .with_synthesizer(Box::new(NullSynth))
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));

        let pipeline = PipelineBuilder::new(PipelineConfig::default())
            .with_model_config(model_config())
            .with_synthesizer(Box::new(NullSynth))
            .with_voice_store(Box::new(NullVoices))
            .build()
            .expect("build should succeed");
        assert_eq!(pipeline.mode(), OutputMode::Synthesize);
    }
}
